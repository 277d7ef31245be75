// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! End-to-end scenarios driving the `Resolver` facade through
//! `TypeHandle`s (the only "types" an integration test can name without a
//! generated codec): fast-path integers, name transmission, meta-share,
//! duplicate registration and the blacklist gate.

use glyph_core::{
    BlackList, ClassDef, Error, Mode, NullJitContext, Reader, Registry, Resolver, ResolverConfig,
    TableLoader, TypeHandle, TypeTraits, Writer,
};
use std::sync::Arc;

struct Account;
struct Order;

fn resolver(config: ResolverConfig, loader: TableLoader) -> Resolver {
    Resolver::new(config, Arc::new(TypeTraits::new()), BlackList::new(), Box::new(loader))
}

#[test]
fn registered_boxed_integer_takes_the_three_byte_fast_path() {
    let resolver = resolver(ResolverConfig::new(), TableLoader::new());

    let mut w = Writer::default();
    resolver
        .write_class_and_update(&mut w, TypeHandle::of::<i32>(), "java.lang.Integer", None, || {
            unreachable!("boxed numerics never need a structural def")
        })
        .unwrap();

    assert_eq!(w.len(), 3);

    let bytes = w.dump();
    let mut r = Reader::new(&bytes);
    assert_eq!(r.read_u8().unwrap(), 0x01);
}

#[test]
fn unregistered_type_round_trips_by_name() {
    let loader = TableLoader::new();
    loader.insert("app.Order", TypeHandle::of::<Order>());
    let resolver = resolver(ResolverConfig::new(), loader);

    let mut w = Writer::default();
    resolver
        .write_class_and_update(&mut w, TypeHandle::of::<Order>(), "app.Order", None, || {
            unreachable!()
        })
        .unwrap();

    let bytes = w.dump();
    let mut r = Reader::new(&bytes);
    let info = resolver.read_class_info(&mut r, None).unwrap();
    assert_eq!(info.type_handle, TypeHandle::of::<Order>());
    assert_eq!(resolver.current_read_class(), Some(TypeHandle::of::<Order>()));
}

#[test]
fn duplicate_id_registration_is_refused() {
    let resolver = resolver(ResolverConfig::new(), TableLoader::new());
    resolver
        .register_with_id(TypeHandle::of::<Account>(), "app.Account", 500)
        .unwrap();
    let err = resolver
        .register_with_id(TypeHandle::of::<Order>(), "app.Order", 500)
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateRegistration(_)));
}

#[test]
fn blacklisted_class_is_refused_unless_explicitly_registered() {
    let mut blacklist = BlackList::empty();
    blacklist.add("java.lang.Runtime");
    let resolver = Resolver::new(
        ResolverConfig::new(),
        Arc::new(TypeTraits::new()),
        blacklist,
        Box::new(TableLoader::new()),
    );

    let mut w = Writer::default();
    let err = resolver
        .write_class_and_update(&mut w, TypeHandle::of::<Account>(), "java.lang.Runtime", None, || {
            unreachable!()
        })
        .unwrap_err();
    assert!(matches!(err, Error::Insecure(_)));

    resolver
        .register_with_id(TypeHandle::of::<Account>(), "java.lang.Runtime", 600)
        .unwrap();

    let mut w2 = Writer::default();
    resolver
        .write_class_and_update(&mut w2, TypeHandle::of::<Account>(), "java.lang.Runtime", None, || {
            unreachable!()
        })
        .unwrap();
    assert_eq!(w2.len(), 3);
}

#[test]
fn meta_share_round_trip_reconstructs_the_type_from_its_class_def() {
    let loader = TableLoader::new();
    loader.insert("app.Order", TypeHandle::of::<Order>());
    let resolver = resolver(ResolverConfig::new().share_meta(true).mode(Mode::Compatible), loader);

    let mut body = Writer::default();
    let mut write_ctx = glyph_core::MetaContext::new();
    resolver
        .write_class_and_update(
            &mut body,
            TypeHandle::of::<Order>(),
            "app.Order",
            Some(&mut write_ctx),
            || ClassDef::new("app.Order", vec![], glyph_core::ExtMeta::new()),
        )
        .unwrap();

    // The defs section lives at its own offset in the envelope, separate
    // from the body that references it by session id.
    let mut defs = Writer::default();
    resolver.flush_meta_defs(&mut defs, &mut write_ctx);

    let mut read_ctx = glyph_core::MetaContext::new();
    let mut defs_reader = Reader::new(&defs.dump());
    resolver.read_meta_defs(&mut defs_reader, &mut read_ctx).unwrap();

    let mut body_reader = Reader::new(&body.dump());
    let info = resolver
        .read_class_info(&mut body_reader, Some(&mut read_ctx))
        .unwrap();
    assert_eq!(info.type_handle, TypeHandle::of::<Order>());
}

#[test]
fn codegen_enabled_with_no_jit_backend_still_falls_back_to_a_usable_codec() {
    let resolver = resolver(ResolverConfig::new().codegen_enabled(true), TableLoader::new());
    resolver.set_jit_context(Arc::new(NullJitContext));

    let mut w = Writer::default();
    resolver
        .write_class_and_update(&mut w, TypeHandle::of::<Account>(), "app.Account", None, || {
            unreachable!()
        })
        .unwrap();
    assert!(!w.is_empty());
}

#[test]
fn cross_language_tag_round_trips_without_the_native_id_table() {
    let resolver = resolver(ResolverConfig::new(), TableLoader::new());
    resolver
        .register_with_tag(TypeHandle::of::<Account>(), "app.Account", 800, "xlang.Account")
        .unwrap();

    let mut w = Writer::default();
    resolver
        .cross_language_write_type_tag(&mut w, TypeHandle::of::<Account>())
        .unwrap();

    let bytes = w.dump();
    let mut r = Reader::new(&bytes);
    let info = resolver.cross_language_read_type_tag(&mut r).unwrap();
    assert_eq!(info.type_handle, TypeHandle::of::<Account>());
}

#[test]
fn cross_language_class_name_round_trips_the_full_dotted_name() {
    let loader = TableLoader::new();
    loader.insert("app.Order", TypeHandle::of::<Order>());
    let resolver = resolver(ResolverConfig::new(), loader);

    let mut w = Writer::default();
    resolver.cross_language_write_class(&mut w, "app.Order");

    let bytes = w.dump();
    let mut r = Reader::new(&bytes);
    let info = resolver.cross_language_read_class(&mut r).unwrap();
    assert_eq!(info.type_handle, TypeHandle::of::<Order>());
}

#[test]
fn registry_assigns_smallest_free_id_above_the_reserved_block() {
    let mut registry = Registry::new();
    registry.freeze_builtins();
    let info = registry.register(TypeHandle::of::<Account>());
    assert!(info.class_id() >= glyph_core::INNER_END_CLASS_ID);
}
