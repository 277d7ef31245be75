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

//! `ClassNameCodec`: encodes/decodes a fully-qualified type name as two
//! interned byte strings (package, simple name) and maintains the
//! hash-keyed cache that turns repeat sightings of the same name into a
//! cache hit instead of a fresh type-loader call.

use crate::buffer::{Reader, Writer};
use crate::class_info::{ClassInfo, ClassNameBytes, ClassNameCache};
use crate::error::Error;
use crate::stringtable::{StringTableReader, StringTableWriter};
use crate::type_traits::{TypeHandle, TypeLoader};
use std::collections::HashMap;
use std::sync::Arc;

/// Placeholder type substituted for a class that cannot be loaded, when
/// the caller has configured tolerant decoding. A single fixed marker
/// type, not a dynamically manufactured one: Rust has no runtime facility
/// for minting a fresh type identity per failed lookup.
pub struct UnexistedSkip;

pub fn unexisted_skip_handle() -> TypeHandle {
    TypeHandle::of::<UnexistedSkip>()
}

pub struct ClassNameCodec {
    /// `ClassNameBytes -> ClassInfo`, deduplicating reconstructed types
    /// across every read regardless of the fast single-slot cache.
    composite_cache: HashMap<ClassNameBytes, Arc<ClassInfo>>,
}

impl Default for ClassNameCodec {
    fn default() -> ClassNameCodec {
        ClassNameCodec {
            composite_cache: HashMap::new(),
        }
    }
}

impl ClassNameCodec {
    pub fn new() -> ClassNameCodec {
        ClassNameCodec::default()
    }

    pub fn encode(
        &self,
        writer: &mut Writer,
        strings: &mut StringTableWriter,
        package: &str,
        simple_name: &str,
    ) {
        strings.write_string(writer, package);
        strings.write_string(writer, simple_name);
    }

    /// Decodes the two interned byte strings, resolves the type (via the
    /// fast single-slot cache, then the composite cache, then the loader
    /// chain on a genuine miss), and returns its `ClassInfo`.
    #[allow(clippy::too_many_arguments)]
    pub fn decode(
        &mut self,
        reader: &mut Reader,
        strings: &mut StringTableReader,
        fast_cache: &ClassNameCache,
        loader: &dyn TypeLoader,
        tolerant: bool,
        make_class_info: impl FnOnce(TypeHandle) -> Arc<ClassInfo>,
    ) -> Result<Arc<ClassInfo>, Error> {
        let package = strings.read_string(reader)?;
        let simple_name = strings.read_string(reader)?;
        let key = ClassNameBytes::new(package.hash, simple_name.hash);

        if let Some(info) = fast_cache.get(key) {
            return Ok(info);
        }
        if let Some(info) = self.composite_cache.get(&key) {
            fast_cache.update(key, info.clone());
            return Ok(info.clone());
        }

        let qualified_name = if package.value.is_empty() {
            simple_name.value.to_string()
        } else {
            format!("{}.{}", package.value, simple_name.value)
        };

        let type_handle = match loader.try_load(&qualified_name) {
            Some(t) => t,
            None if tolerant => unexisted_skip_handle(),
            None => return Err(Error::class_not_found(qualified_name)),
        };

        let info = make_class_info(type_handle);
        self.composite_cache.insert(key, info.clone());
        fast_cache.update(key, info.clone());
        Ok(info)
    }
}
