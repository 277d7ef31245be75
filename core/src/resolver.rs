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

//! `Resolver`: the facade that composes the registry, codec selector, name
//! codec and meta-sharing channel into the hot-path `writeClass`/
//! `readClass` entry points. Owned by one primary thread for the lifetime
//! of a serialize/deserialize session; registration must complete before
//! any of the hot-path methods run concurrently with it.

use crate::blacklist::BlackList;
use crate::class_def::ClassDef;
use crate::class_info::{ClassInfo, ClassInfoCache, ClassNameCache};
use crate::codec::{static_codec, CodecKind};
use crate::codec_selector::{CodecSelector, SelectionRequest};
use crate::config::ResolverConfig;
use crate::error::Error;
use crate::jit::JitContext;
use crate::meta_share::{MetaContext, MetaShare};
use crate::name_codec::{unexisted_skip_handle, ClassNameCodec};
use crate::registry::Registry;
use crate::buffer::{Reader, Writer};
use crate::stringtable::{StringTableReader, StringTableWriter};
use crate::type_traits::{TypeHandle, TypeLoader, TypeTraits};
use crate::types::{
    ClassTag, BOXED_DOUBLE_CLASS_ID, BOXED_INTEGER_CLASS_ID, BOXED_LONG_CLASS_ID,
};
use std::sync::{Arc, Mutex, RwLock};

fn boxed_numeric_class_id(type_handle: TypeHandle) -> Option<u16> {
    if type_handle == TypeHandle::of::<i64>() {
        Some(BOXED_LONG_CLASS_ID)
    } else if type_handle == TypeHandle::of::<i32>() {
        Some(BOXED_INTEGER_CLASS_ID)
    } else if type_handle == TypeHandle::of::<f64>() {
        Some(BOXED_DOUBLE_CLASS_ID)
    } else {
        None
    }
}

fn split_qualified_name(qualified_name: &str) -> (&str, &str) {
    match qualified_name.rsplit_once('.') {
        Some((package, simple_name)) => (package, simple_name),
        None => ("", qualified_name),
    }
}

pub struct Resolver {
    registry: Mutex<Registry>,
    class_info_cache: ClassInfoCache,
    class_name_cache: ClassNameCache,
    name_codec: Mutex<ClassNameCodec>,
    string_writer: Mutex<StringTableWriter>,
    string_reader: Mutex<StringTableReader>,
    codec_selector: CodecSelector,
    meta_share: MetaShare,
    type_loader: Box<dyn TypeLoader>,
    config: ResolverConfig,
    current_read_class: RwLock<Option<TypeHandle>>,
}

impl Resolver {
    pub fn new(
        config: ResolverConfig,
        traits: Arc<TypeTraits>,
        blacklist: BlackList,
        type_loader: Box<dyn TypeLoader>,
    ) -> Resolver {
        Resolver {
            registry: Mutex::new(Registry::new()),
            class_info_cache: ClassInfoCache::new(),
            class_name_cache: ClassNameCache::new(),
            name_codec: Mutex::new(ClassNameCodec::new()),
            string_writer: Mutex::new(StringTableWriter::new()),
            string_reader: Mutex::new(StringTableReader::new()),
            codec_selector: CodecSelector::new(traits, blacklist),
            meta_share: MetaShare::new(),
            type_loader,
            config,
            current_read_class: RwLock::new(None),
        }
    }

    pub fn set_jit_context(&self, jit: Arc<dyn JitContext>) {
        self.codec_selector.set_jit_context(jit);
    }

    pub fn register(&self, type_handle: TypeHandle) -> Arc<ClassInfo> {
        self.registry.lock().unwrap().register(type_handle)
    }

    pub fn register_with_id(
        &self,
        type_handle: TypeHandle,
        qualified_name: &str,
        id: u16,
    ) -> Result<Arc<ClassInfo>, Error> {
        self.registry
            .lock()
            .unwrap()
            .register_with_id(type_handle, qualified_name, id)
    }

    pub fn register_with_check(
        &self,
        type_handle: TypeHandle,
        qualified_name: &str,
        id: u16,
    ) -> Result<Arc<ClassInfo>, Error> {
        self.registry
            .lock()
            .unwrap()
            .register_with_check(type_handle, qualified_name, id)
    }

    /// Registers `type` for cross-language use under both an internal id
    /// and an opaque `tag` a non-native peer can address it by. The
    /// source left this path declared but unimplemented; here it is a
    /// real, narrow round trip rather than a stub.
    pub fn register_with_tag(
        &self,
        type_handle: TypeHandle,
        qualified_name: &str,
        id: u16,
        tag: &str,
    ) -> Result<Arc<ClassInfo>, Error> {
        self.registry
            .lock()
            .unwrap()
            .register_with_tag(type_handle, qualified_name, id, tag)
    }

    /// Emits the type's full dotted name as a single interned byte string,
    /// for a peer that has no shared id table to consult.
    pub fn cross_language_write_class(&self, writer: &mut Writer, qualified_name: &str) {
        self.string_writer
            .lock()
            .unwrap()
            .write_string(writer, qualified_name);
    }

    pub fn cross_language_read_class(&self, reader: &mut Reader) -> Result<Arc<ClassInfo>, Error> {
        let name = self.string_reader.lock().unwrap().read_string(reader)?;
        let info = self.resolve_named_class_info(&name.value)?;
        *self.current_read_class.write().unwrap() = Some(info.type_handle);
        Ok(info)
    }

    /// Emits the cross-language tag `register_with_tag` bound to
    /// `type_handle`, instead of the internal id or dotted name.
    pub fn cross_language_write_type_tag(
        &self,
        writer: &mut Writer,
        type_handle: TypeHandle,
    ) -> Result<(), Error> {
        let tag = self
            .registry
            .lock()
            .unwrap()
            .tag_for_type(type_handle)
            .ok_or_else(|| Error::class_not_found("type has no registered cross-language tag"))?;
        self.string_writer.lock().unwrap().write_string(writer, &tag);
        Ok(())
    }

    pub fn cross_language_read_type_tag(
        &self,
        reader: &mut Reader,
    ) -> Result<Arc<ClassInfo>, Error> {
        let tag = self.string_reader.lock().unwrap().read_string(reader)?;
        let type_handle = self
            .registry
            .lock()
            .unwrap()
            .type_for_tag(&tag.value)
            .ok_or_else(|| Error::class_not_found(format!("no type registered for tag {}", tag.value)))?;
        let info = self
            .registry
            .lock()
            .unwrap()
            .get_or_create_class_info(type_handle);
        *self.current_read_class.write().unwrap() = Some(type_handle);
        Ok(info)
    }

    pub fn freeze_builtins(&self) {
        self.registry.lock().unwrap().freeze_builtins()
    }

    pub fn registered_id(&self, type_handle: TypeHandle) -> Option<u16> {
        self.registry.lock().unwrap().registered_id(type_handle)
    }

    pub fn registered_type(&self, id: u16) -> Option<TypeHandle> {
        self.registry.lock().unwrap().registered_type(id)
    }

    pub fn current_read_class(&self) -> Option<TypeHandle> {
        *self.current_read_class.read().unwrap()
    }

    /// The sole codec-materialization entry point: single-slot cache, then
    /// the process-wide identity map, invoking `CodecSelector` whenever the
    /// entry is new or still carries no bound codec.
    pub fn get_or_create_class_info(
        &self,
        type_handle: TypeHandle,
        qualified_name: &str,
    ) -> Result<Arc<ClassInfo>, Error> {
        if let Some(info) = self.class_info_cache.get(type_handle) {
            if info.codec().is_some() {
                return Ok(info);
            }
        }

        let info = self
            .registry
            .lock()
            .unwrap()
            .get_or_create_class_info(type_handle);

        if info.codec().is_none() {
            let req = SelectionRequest {
                type_handle,
                qualified_name,
                mode: self.config.get_mode(),
                codegen_enabled: self.config.is_codegen_enabled(),
                share_meta: self.config.is_share_meta(),
                require_registration: self.config.is_require_registration(),
                registered: info.is_registered(),
            };
            let codec = self.codec_selector.select_codec(req, &info)?;
            info.set_codec(codec);
        }

        self.class_info_cache.update(type_handle, info.clone());
        Ok(info)
    }

    /// Inline fast path for the three most common boxed numerics: a 3-byte
    /// `USE_ID` record written directly, bypassing the cache entirely.
    /// Everything else delegates to `write_class`.
    pub fn write_class_and_update(
        &self,
        writer: &mut Writer,
        type_handle: TypeHandle,
        qualified_name: &str,
        ctx: Option<&mut MetaContext>,
        full_def: impl FnOnce() -> ClassDef,
    ) -> Result<(), Error> {
        if let Some(id) = boxed_numeric_class_id(type_handle) {
            write_use_id(writer, id);
            return Ok(());
        }
        let info = self.get_or_create_class_info(type_handle, qualified_name)?;
        self.write_class(writer, &info, qualified_name, ctx, full_def)
    }

    pub fn write_class(
        &self,
        writer: &mut Writer,
        info: &ClassInfo,
        qualified_name: &str,
        ctx: Option<&mut MetaContext>,
        full_def: impl FnOnce() -> ClassDef,
    ) -> Result<(), Error> {
        let class_id = info.class_id();
        // A replace/resolve codec rewrites the object on the way out, so the
        // id registered for the original type no longer names what actually
        // gets written; fall through to the name/meta path as if the type
        // carried no id at all, without touching the registered id itself.
        let replace_resolve_bound = matches!(
            info.codec().map(|c| c.kind()),
            Some(CodecKind::ReplaceResolve)
        );
        if class_id != crate::types::NO_CLASS_ID && !replace_resolve_bound {
            write_use_id(writer, class_id);
            return Ok(());
        }

        if self.config.is_share_meta() {
            let ctx = ctx.ok_or(Error::MissingMetaContext)?;
            writer.write_u8(ClassTag::UseClassValue as u8);
            self.meta_share.write_class(
                writer,
                ctx,
                info.type_handle,
                qualified_name,
                self.config.get_mode(),
                full_def,
            );
            return Ok(());
        }

        writer.write_u8(ClassTag::UseClassValue as u8);
        let (package, simple_name) = split_qualified_name(qualified_name);
        self.name_codec.lock().unwrap().encode(
            writer,
            &mut self.string_writer.lock().unwrap(),
            package,
            simple_name,
        );
        Ok(())
    }

    /// Writes the queued `ClassDef`s at the envelope's defs offset. The
    /// caller places this call after the body that referenced them via
    /// `write_class`/`write_class_and_update`.
    pub fn flush_meta_defs(&self, writer: &mut Writer, ctx: &mut MetaContext) {
        self.meta_share.flush_class_defs(writer, ctx);
    }

    /// Reads the defs section written by `flush_meta_defs`, populating
    /// `ctx` so the matching `read_class_info` calls over the body can
    /// resolve each session id to a `ClassInfo`.
    pub fn read_meta_defs(&self, reader: &mut Reader, ctx: &mut MetaContext) -> Result<(), Error> {
        self.meta_share.read_class_defs(reader, ctx)
    }

    pub fn read_class_info(
        &self,
        reader: &mut Reader,
        ctx: Option<&mut MetaContext>,
    ) -> Result<Arc<ClassInfo>, Error> {
        let tag_byte = reader.read_u8()?;
        let tag = ClassTag::from_byte(tag_byte)
            .ok_or_else(|| Error::invalid_data(format!("unknown class tag byte {tag_byte}")))?;

        let info = match tag {
            ClassTag::UseId => {
                let id = reader.read_u16()?;
                self.registry
                    .lock()
                    .unwrap()
                    .class_info_for_id(id)
                    .ok_or_else(|| Error::invalid_data(format!("no class registered at id {id}")))?
            }
            ClassTag::UseClassValue => {
                if self.config.is_share_meta() {
                    let ctx = ctx.ok_or(Error::MissingMetaContext)?;
                    self.meta_share.read_class_info(
                        reader,
                        ctx,
                        |name| self.resolve_named_class_info(name),
                        |def| self.build_shared_class_info(def),
                    )?
                } else {
                    self.name_codec.lock().unwrap().decode(
                        reader,
                        &mut self.string_reader.lock().unwrap(),
                        &self.class_name_cache,
                        self.type_loader.as_ref(),
                        self.config.is_tolerant_unknown_class(),
                        |type_handle| {
                            self.registry.lock().unwrap().get_or_create_class_info(type_handle)
                        },
                    )?
                }
            }
        };

        *self.current_read_class.write().unwrap() = Some(info.type_handle);
        Ok(info)
    }

    fn resolve_named_class_info(&self, qualified_name: &str) -> Result<Arc<ClassInfo>, Error> {
        let type_handle = match self.type_loader.try_load(qualified_name) {
            Some(t) => t,
            None if self.config.is_tolerant_unknown_class() => unexisted_skip_handle(),
            None => return Err(Error::class_not_found(qualified_name.to_string())),
        };
        Ok(self
            .registry
            .lock()
            .unwrap()
            .get_or_create_class_info(type_handle))
    }

    fn build_shared_class_info(&self, def: &ClassDef) -> Result<Arc<ClassInfo>, Error> {
        let info = self.resolve_named_class_info(&def.qualified_name)?;
        info.set_structural_def(Arc::new(def.clone()));
        if info.codec().is_none() {
            info.set_codec(static_codec(CodecKind::CompatibleObject));
        }
        Ok(info)
    }
}

fn write_use_id(writer: &mut Writer, class_id: u16) {
    let offset = writer.reserve_bytes(3);
    writer.set_bytes(offset, &[ClassTag::UseId as u8]);
    writer.set_bytes(offset + 1, &class_id.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_traits::TableLoader;

    struct Foo;
    struct Bar;

    fn resolver_with(config: ResolverConfig, loader: TableLoader) -> Resolver {
        Resolver::new(config, Arc::new(TypeTraits::new()), BlackList::empty(), Box::new(loader))
    }

    #[test]
    fn registered_type_round_trips_through_the_three_byte_fast_path() {
        let loader = TableLoader::new();
        let resolver = resolver_with(ResolverConfig::new(), loader);
        resolver.register_with_id(TypeHandle::of::<Foo>(), "user.Foo", 100).unwrap();

        let mut w = Writer::default();
        resolver
            .write_class_and_update(&mut w, TypeHandle::of::<Foo>(), "user.Foo", None, || {
                unreachable!()
            })
            .unwrap();
        assert_eq!(w.dump(), vec![0x01, 100, 0]);

        let bytes = w.dump();
        let mut r = Reader::new(&bytes);
        let info = resolver.read_class_info(&mut r, None).unwrap();
        assert_eq!(info.type_handle, TypeHandle::of::<Foo>());
        assert_eq!(resolver.current_read_class(), Some(TypeHandle::of::<Foo>()));
    }

    #[test]
    fn unregistered_type_round_trips_through_the_name_bytes_path() {
        let loader = TableLoader::new();
        loader.insert("user.Bar", TypeHandle::of::<Bar>());
        let resolver = resolver_with(ResolverConfig::new(), loader);

        let mut w = Writer::default();
        resolver
            .write_class_and_update(&mut w, TypeHandle::of::<Bar>(), "user.Bar", None, || {
                unreachable!()
            })
            .unwrap();

        let bytes = w.dump();
        let mut r = Reader::new(&bytes);
        let info = resolver.read_class_info(&mut r, None).unwrap();
        assert_eq!(info.type_handle, TypeHandle::of::<Bar>());
    }

    #[test]
    fn meta_share_round_trip_through_the_facade() {
        let loader = TableLoader::new();
        loader.insert("user.Bar", TypeHandle::of::<Bar>());
        let resolver = resolver_with(ResolverConfig::new().share_meta(true), loader);

        let mut w = Writer::default();
        let mut write_ctx = MetaContext::new();
        resolver
            .write_class_and_update(
                &mut w,
                TypeHandle::of::<Bar>(),
                "user.Bar",
                Some(&mut write_ctx),
                || ClassDef::without_fields("user.Bar"),
            )
            .unwrap();
        resolver.flush_meta_defs(&mut w, &mut write_ctx);

        let bytes = w.dump();
        let mut r = Reader::new(&bytes);
        let mut read_ctx = MetaContext::new();
        let info = resolver.read_class_info(&mut r, Some(&mut read_ctx)).unwrap();
        assert_eq!(info.type_handle, TypeHandle::of::<Bar>());
    }

    #[test]
    fn boxed_numeric_fast_path_never_touches_the_cache() {
        let loader = TableLoader::new();
        let resolver = resolver_with(ResolverConfig::new(), loader);
        let mut w = Writer::default();
        resolver
            .write_class_and_update(&mut w, TypeHandle::of::<i64>(), "java.lang.Long", None, || {
                unreachable!()
            })
            .unwrap();
        assert_eq!(w.len(), 3);
        assert!(resolver.class_info_cache.get(TypeHandle::of::<i64>()).is_none());
    }

    #[test]
    fn replace_resolve_codec_bypasses_the_id_fast_path() {
        let loader = TableLoader::new();
        let resolver = resolver_with(ResolverConfig::new(), loader);
        let info = resolver.register_with_id(TypeHandle::of::<Foo>(), "user.Foo", 101).unwrap();
        info.set_codec(static_codec(CodecKind::ReplaceResolve));

        let mut w = Writer::default();
        resolver
            .write_class(&mut w, &info, "user.Foo", None, || unreachable!())
            .unwrap();

        // Registered id is untouched; the write itself took the name path.
        assert_eq!(info.class_id(), 101);
        assert_ne!(w.dump()[0], ClassTag::UseId as u8);
    }

    #[test]
    fn a_codec_other_than_replace_resolve_still_takes_the_fast_path() {
        let loader = TableLoader::new();
        let resolver = resolver_with(ResolverConfig::new(), loader);
        let info = resolver.register_with_id(TypeHandle::of::<Foo>(), "user.Foo", 102).unwrap();
        info.set_codec(static_codec(CodecKind::Object));

        let mut w = Writer::default();
        resolver
            .write_class(&mut w, &info, "user.Foo", None, || unreachable!())
            .unwrap();
        assert_eq!(w.dump()[0], ClassTag::UseId as u8);
    }

    #[test]
    fn cross_language_class_name_round_trips() {
        let loader = TableLoader::new();
        loader.insert("user.Bar", TypeHandle::of::<Bar>());
        let resolver = resolver_with(ResolverConfig::new(), loader);

        let mut w = Writer::default();
        resolver.cross_language_write_class(&mut w, "user.Bar");

        let bytes = w.dump();
        let mut r = Reader::new(&bytes);
        let info = resolver.cross_language_read_class(&mut r).unwrap();
        assert_eq!(info.type_handle, TypeHandle::of::<Bar>());
        assert_eq!(resolver.current_read_class(), Some(TypeHandle::of::<Bar>()));
    }

    #[test]
    fn cross_language_type_tag_round_trips() {
        let loader = TableLoader::new();
        let resolver = resolver_with(ResolverConfig::new(), loader);
        resolver
            .register_with_tag(TypeHandle::of::<Foo>(), "user.Foo", 103, "xlang.Foo")
            .unwrap();

        let mut w = Writer::default();
        resolver
            .cross_language_write_type_tag(&mut w, TypeHandle::of::<Foo>())
            .unwrap();

        let bytes = w.dump();
        let mut r = Reader::new(&bytes);
        let info = resolver.cross_language_read_type_tag(&mut r).unwrap();
        assert_eq!(info.type_handle, TypeHandle::of::<Foo>());
        assert_eq!(resolver.current_read_class(), Some(TypeHandle::of::<Foo>()));
    }

    #[test]
    fn cross_language_write_type_tag_fails_for_an_untagged_type() {
        let loader = TableLoader::new();
        let resolver = resolver_with(ResolverConfig::new(), loader);
        resolver.register_with_id(TypeHandle::of::<Foo>(), "user.Foo", 104).unwrap();

        let mut w = Writer::default();
        let err = resolver
            .cross_language_write_type_tag(&mut w, TypeHandle::of::<Foo>())
            .unwrap_err();
        assert!(matches!(err, Error::ClassNotFound(_)));
    }

    #[test]
    fn cross_language_read_type_tag_fails_for_an_unknown_tag() {
        let loader = TableLoader::new();
        let resolver = resolver_with(ResolverConfig::new(), loader);

        let mut w = Writer::default();
        resolver.cross_language_write_class(&mut w, "xlang.unknown");
        let bytes = w.dump();
        let mut r = Reader::new(&bytes);
        let err = resolver.cross_language_read_type_tag(&mut r).unwrap_err();
        assert!(matches!(err, Error::ClassNotFound(_)));
    }

    #[test]
    fn unregistered_blacklisted_type_is_refused() {
        let loader = TableLoader::new();
        let config = ResolverConfig::new();
        let mut blacklist = BlackList::empty();
        blacklist.add("java.lang.Runtime");
        let resolver = Resolver::new(config, Arc::new(TypeTraits::new()), blacklist, Box::new(loader));

        let mut w = Writer::default();
        let err = resolver
            .write_class_and_update(&mut w, TypeHandle::of::<Foo>(), "java.lang.Runtime", None, || {
                unreachable!()
            })
            .unwrap_err();
        assert!(matches!(err, Error::Insecure(_)));
    }
}
