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

//! `ClassInfo`: one record per known type, and the two caches the hot path
//! consults before ever touching the registry's maps.

use crate::class_def::ClassDef;
use crate::codec::CodecHandle;
use crate::stringtable::InternedString;
use crate::type_traits::TypeHandle;
use crate::types::NO_CLASS_ID;
use std::sync::{Arc, RwLock};

/// `(packageHash, simpleNameHash)` — identifies a reconstructed type
/// without string comparison on the read hot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassNameBytes {
    pub package_hash: u64,
    pub simple_name_hash: u64,
}

impl ClassNameBytes {
    pub fn new(package_hash: u64, simple_name_hash: u64) -> ClassNameBytes {
        ClassNameBytes {
            package_hash,
            simple_name_hash,
        }
    }
}

pub struct ClassInfo {
    pub type_handle: TypeHandle,
    class_id: RwLock<u16>,
    package_name_bytes: RwLock<Option<InternedString>>,
    class_name_bytes: RwLock<Option<InternedString>>,
    full_class_name_bytes: RwLock<Option<InternedString>>,
    type_tag_bytes: RwLock<Option<InternedString>>,
    /// Replaced concurrently by the JIT callback; readers must re-fetch
    /// through this slot on every use rather than caching a reference.
    codec: RwLock<Option<CodecHandle>>,
    structural_def: RwLock<Option<Arc<ClassDef>>>,
}

impl ClassInfo {
    pub fn new(type_handle: TypeHandle) -> Arc<ClassInfo> {
        Arc::new(ClassInfo {
            type_handle,
            class_id: RwLock::new(NO_CLASS_ID),
            package_name_bytes: RwLock::new(None),
            class_name_bytes: RwLock::new(None),
            full_class_name_bytes: RwLock::new(None),
            type_tag_bytes: RwLock::new(None),
            codec: RwLock::new(None),
            structural_def: RwLock::new(None),
        })
    }

    pub fn class_id(&self) -> u16 {
        *self.class_id.read().unwrap()
    }

    pub fn set_class_id(&self, id: u16) {
        *self.class_id.write().unwrap() = id;
    }

    pub fn is_registered(&self) -> bool {
        self.class_id() != NO_CLASS_ID
    }

    pub fn codec(&self) -> Option<CodecHandle> {
        self.codec.read().unwrap().clone()
    }

    pub fn set_codec(&self, codec: CodecHandle) {
        *self.codec.write().unwrap() = Some(codec);
    }

    pub fn structural_def(&self) -> Option<Arc<ClassDef>> {
        self.structural_def.read().unwrap().clone()
    }

    pub fn set_structural_def(&self, def: Arc<ClassDef>) {
        *self.structural_def.write().unwrap() = Some(def);
    }

    pub fn package_name_bytes(&self) -> Option<InternedString> {
        self.package_name_bytes.read().unwrap().clone()
    }

    pub fn get_or_init_package_name_bytes(
        &self,
        init: impl FnOnce() -> InternedString,
    ) -> InternedString {
        let mut slot = self.package_name_bytes.write().unwrap();
        if slot.is_none() {
            *slot = Some(init());
        }
        slot.clone().unwrap()
    }

    pub fn class_name_bytes(&self) -> Option<InternedString> {
        self.class_name_bytes.read().unwrap().clone()
    }

    pub fn get_or_init_class_name_bytes(
        &self,
        init: impl FnOnce() -> InternedString,
    ) -> InternedString {
        let mut slot = self.class_name_bytes.write().unwrap();
        if slot.is_none() {
            *slot = Some(init());
        }
        slot.clone().unwrap()
    }

    pub fn full_class_name_bytes(&self) -> Option<InternedString> {
        self.full_class_name_bytes.read().unwrap().clone()
    }

    pub fn get_or_init_full_class_name_bytes(
        &self,
        init: impl FnOnce() -> InternedString,
    ) -> InternedString {
        let mut slot = self.full_class_name_bytes.write().unwrap();
        if slot.is_none() {
            *slot = Some(init());
        }
        slot.clone().unwrap()
    }

    pub fn type_tag_bytes(&self) -> Option<InternedString> {
        self.type_tag_bytes.read().unwrap().clone()
    }

    pub fn get_or_init_type_tag_bytes(
        &self,
        init: impl FnOnce() -> InternedString,
    ) -> InternedString {
        let mut slot = self.type_tag_bytes.write().unwrap();
        if slot.is_none() {
            *slot = Some(init());
        }
        slot.clone().unwrap()
    }
}

/// Single-slot last-seen cache updated on every successful
/// `getOrCreateClassInfo` lookup. Deliberately holds at most one entry: the
/// point is a branchless identity compare on the hottest path, not a real
/// cache with eviction policy.
#[derive(Default)]
pub struct ClassInfoCache {
    last: RwLock<Option<(TypeHandle, Arc<ClassInfo>)>>,
}

impl ClassInfoCache {
    pub fn new() -> ClassInfoCache {
        ClassInfoCache::default()
    }

    pub fn get(&self, type_handle: TypeHandle) -> Option<Arc<ClassInfo>> {
        let slot = self.last.read().unwrap();
        match &*slot {
            Some((t, info)) if *t == type_handle => Some(info.clone()),
            _ => None,
        }
    }

    pub fn update(&self, type_handle: TypeHandle, info: Arc<ClassInfo>) {
        *self.last.write().unwrap() = Some((type_handle, info));
    }
}

/// Read-side fast path: if the two incoming byte-string hashes equal the
/// previously cached `ClassInfo`'s name bytes, skip the map lookup
/// entirely. Kept separate from `ClassInfoCache` because the read side
/// keys on wire bytes, not on a `TypeHandle`.
#[derive(Default)]
pub struct ClassNameCache {
    last: RwLock<Option<(ClassNameBytes, Arc<ClassInfo>)>>,
}

impl ClassNameCache {
    pub fn new() -> ClassNameCache {
        ClassNameCache::default()
    }

    pub fn get(&self, key: ClassNameBytes) -> Option<Arc<ClassInfo>> {
        let slot = self.last.read().unwrap();
        match &*slot {
            Some((k, info)) if *k == key => Some(info.clone()),
            _ => None,
        }
    }

    pub fn update(&self, key: ClassNameBytes, info: Arc<ClassInfo>) {
        *self.last.write().unwrap() = Some((key, info));
    }
}
