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

//! `MetaContext` and `MetaShare`: session-scoped schema transmission.
//! Instead of writing a `ClassDef` on every occurrence of a type, the
//! writer assigns each type a small per-session id the first time it is
//! seen and enqueues the def once; later occurrences write only the id.

use crate::buffer::{Reader, Writer};
use crate::class_def::ClassDef;
use crate::class_info::ClassInfo;
use crate::error::Error;
use crate::name_codec::unexisted_skip_handle;
use crate::type_traits::TypeHandle;
use crate::types::Mode;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Per-stream state the caller owns and passes into every `writeClass`/
/// `readClassInfoWithMetaShare` call for the duration of one serialize or
/// deserialize operation. Never shared across independent streams: ids
/// are only meaningful within the session that assigned them.
#[derive(Default)]
pub struct MetaContext {
    write_class_map: HashMap<TypeHandle, u32>,
    writing_class_defs: Vec<Arc<ClassDef>>,
    read_class_defs: Vec<Option<Arc<ClassDef>>>,
    read_class_infos: Vec<Option<Arc<ClassInfo>>>,
}

impl MetaContext {
    pub fn new() -> MetaContext {
        MetaContext::default()
    }

    pub fn writing_class_defs(&self) -> &[Arc<ClassDef>] {
        &self.writing_class_defs
    }

    pub fn read_class_infos(&self) -> &[Option<Arc<ClassInfo>>] {
        &self.read_class_infos
    }
}

/// The placeholder substituted when a shared def arrives for a type the
/// local side resolved to [`crate::name_codec::UnexistedSkip`]: decoding
/// must still progress through the payload even though nothing local
/// will hold the value.
pub struct UnexistedMetaShared;

pub fn unexisted_meta_shared_handle() -> TypeHandle {
    TypeHandle::of::<UnexistedMetaShared>()
}

/// Builds and dedupes `ClassDef`s by content id across every `MetaContext`
/// a resolver ever sees, so the same structure is never held twice.
#[derive(Default)]
pub struct MetaShare {
    class_id_to_def: RwLock<HashMap<u64, Arc<ClassDef>>>,
}

impl MetaShare {
    pub fn new() -> MetaShare {
        MetaShare::default()
    }

    fn share(&self, def: ClassDef) -> Arc<ClassDef> {
        let mut table = self.class_id_to_def.write().unwrap();
        table
            .entry(def.id)
            .or_insert_with(|| Arc::new(def))
            .clone()
    }

    /// Writes the per-session id for `type_handle`, building (or reusing,
    /// if already enqueued this session) the matching `ClassDef` on first
    /// sight. `full_def` supplies a field-bearing structural def; it is
    /// only consulted in `Compatible` mode.
    pub fn write_class(
        &self,
        writer: &mut Writer,
        ctx: &mut MetaContext,
        type_handle: TypeHandle,
        qualified_name: &str,
        mode: Mode,
        full_def: impl FnOnce() -> ClassDef,
    ) {
        let new_id = ctx.write_class_map.len() as u32;
        let id = *ctx
            .write_class_map
            .entry(type_handle)
            .or_insert(new_id);
        writer.write_varuint32(id);
        if id != new_id {
            return;
        }

        let def = match mode {
            Mode::Compatible => full_def(),
            Mode::SchemaConsistent => ClassDef::without_fields(qualified_name),
        };
        let shared = self.share(def);
        ctx.writing_class_defs.push(shared);
    }

    /// Writes the queued defs' bodies after the count, then clears the
    /// queue. The caller places this at the envelope's defs offset.
    pub fn flush_class_defs(&self, writer: &mut Writer, ctx: &mut MetaContext) {
        writer.write_varuint32(ctx.writing_class_defs.len() as u32);
        for def in &ctx.writing_class_defs {
            let bytes = def.to_bytes();
            writer.write_varuint32(bytes.len() as u32);
            writer.write_bytes(&bytes);
        }
        ctx.writing_class_defs.clear();
    }

    /// Reads the defs section at the caller-restored cursor, deduping
    /// each def by content id against every session this `MetaShare` has
    /// ever seen, and appends a matching `None` placeholder to
    /// `read_class_infos` for each newly-read def.
    pub fn read_class_defs(&self, reader: &mut Reader, ctx: &mut MetaContext) -> Result<(), Error> {
        let count = reader.read_varuint32()? as usize;
        for _ in 0..count {
            let len = reader.read_varuint32()? as usize;
            let bytes = reader.read_bytes(len)?;
            let def = ClassDef::from_bytes(bytes)?;
            let shared = self.share(def);
            ctx.read_class_defs.push(Some(shared));
            ctx.read_class_infos.push(None);
        }
        Ok(())
    }

    /// Resolves the `ClassInfo` for a per-session id read from the
    /// stream, caching it in `ctx.read_class_infos` for the rest of the
    /// session. `resolve_named` loads a type by qualified name (the
    /// `shareFieldsInfo == "false"` path); `build_shared` builds the
    /// structural `MetaShare` codec path for a field-bearing def.
    pub fn read_class_info(
        &self,
        reader: &mut Reader,
        ctx: &mut MetaContext,
        resolve_named: impl FnOnce(&str) -> Result<Arc<ClassInfo>, Error>,
        build_shared: impl FnOnce(&ClassDef) -> Result<Arc<ClassInfo>, Error>,
    ) -> Result<Arc<ClassInfo>, Error> {
        let id = reader.read_varuint32()? as usize;

        if let Some(Some(info)) = ctx.read_class_infos.get(id) {
            return Ok(info.clone());
        }

        let def = ctx
            .read_class_defs
            .get(id)
            .and_then(|o| o.clone())
            .ok_or_else(|| Error::invalid_data("meta-share id has no matching class def"))?;

        let info = if !def.shares_fields_info() {
            resolve_named(&def.qualified_name)?
        } else {
            build_shared(&def)?
        };

        let info = if info.type_handle == unexisted_skip_handle() {
            ClassInfo::new(unexisted_meta_shared_handle())
        } else {
            info
        };

        if id >= ctx.read_class_infos.len() {
            ctx.read_class_infos.resize(id + 1, None);
        }
        ctx.read_class_infos[id] = Some(info.clone());
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct X;
    struct Y;

    fn full_def_for(name: &str) -> ClassDef {
        ClassDef::new(name, vec![], crate::class_def::ExtMeta::new())
    }

    #[test]
    fn repeat_write_of_same_type_reuses_its_session_id() {
        let share = MetaShare::new();
        let mut ctx = MetaContext::new();
        let mut w = Writer::default();

        share.write_class(&mut w, &mut ctx, TypeHandle::of::<X>(), "user.X", Mode::SchemaConsistent, || full_def_for("user.X"));
        share.write_class(&mut w, &mut ctx, TypeHandle::of::<Y>(), "user.Y", Mode::SchemaConsistent, || full_def_for("user.Y"));
        share.write_class(&mut w, &mut ctx, TypeHandle::of::<X>(), "user.X", Mode::SchemaConsistent, || full_def_for("user.X"));

        let mut r = Reader::new(&w.dump());
        assert_eq!(r.read_varuint32().unwrap(), 0);
        assert_eq!(r.read_varuint32().unwrap(), 1);
        assert_eq!(r.read_varuint32().unwrap(), 0);
        assert_eq!(ctx.writing_class_defs().len(), 2);
    }

    #[test]
    fn meta_share_round_trip_reconstructs_types_in_first_use_order() {
        let writer_share = MetaShare::new();
        let mut write_ctx = MetaContext::new();
        let mut body = Writer::default();

        writer_share.write_class(&mut body, &mut write_ctx, TypeHandle::of::<X>(), "user.X", Mode::SchemaConsistent, || full_def_for("user.X"));
        writer_share.write_class(&mut body, &mut write_ctx, TypeHandle::of::<Y>(), "user.Y", Mode::SchemaConsistent, || full_def_for("user.Y"));
        writer_share.write_class(&mut body, &mut write_ctx, TypeHandle::of::<X>(), "user.X", Mode::SchemaConsistent, || full_def_for("user.X"));

        let mut defs = Writer::default();
        writer_share.flush_class_defs(&mut defs, &mut write_ctx);
        assert!(write_ctx.writing_class_defs().is_empty());

        let reader_share = MetaShare::new();
        let mut read_ctx = MetaContext::new();
        let mut defs_reader = Reader::new(&defs.dump());
        reader_share.read_class_defs(&mut defs_reader, &mut read_ctx).unwrap();

        let mut body_reader = Reader::new(&body.dump());
        let resolve_named = |name: &str| -> Result<Arc<ClassInfo>, Error> {
            let t = if name == "user.X" {
                TypeHandle::of::<X>()
            } else {
                TypeHandle::of::<Y>()
            };
            Ok(ClassInfo::new(t))
        };

        let first = reader_share
            .read_class_info(&mut body_reader, &mut read_ctx, resolve_named, |_| unreachable!())
            .unwrap();
        let second = reader_share
            .read_class_info(&mut body_reader, &mut read_ctx, resolve_named, |_| unreachable!())
            .unwrap();
        let third = reader_share
            .read_class_info(&mut body_reader, &mut read_ctx, resolve_named, |_| unreachable!())
            .unwrap();

        assert_eq!(first.type_handle, TypeHandle::of::<X>());
        assert_eq!(second.type_handle, TypeHandle::of::<Y>());
        assert_eq!(third.type_handle, TypeHandle::of::<X>());
        assert!(Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn class_defs_are_deduped_by_content_id_across_contexts() {
        let share = MetaShare::new();
        let def = full_def_for("user.X");
        let a = share.share(def.clone());
        let b = share.share(def);
        assert!(Arc::ptr_eq(&a, &b));
    }
}
