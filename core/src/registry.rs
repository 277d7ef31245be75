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

//! `Registry`: the bidirectional `id <-> type` mapping. Registration runs
//! once, during setup, on a single thread; after that, lookups are
//! read-only and safe to share.

use crate::class_info::ClassInfo;
use crate::error::Error;
use crate::type_traits::TypeHandle;
use crate::types::{INNER_END_CLASS_ID, MAX_CLASS_ID};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct Registry {
    type_to_info: HashMap<TypeHandle, Arc<ClassInfo>>,
    /// Amortized-dense: grows by doubling, indexed directly by class id.
    id_to_info: Vec<Option<Arc<ClassInfo>>>,
    name_to_type: HashMap<String, TypeHandle>,
    /// Cross-language tag tables, populated only by `register_with_tag`.
    /// Separate from `name_to_type`/`id_to_info`: a tag is an opaque
    /// cross-language identifier, not necessarily the dotted class name.
    tag_to_type: HashMap<String, TypeHandle>,
    type_to_tag: HashMap<TypeHandle, String>,
    next_id: u16,
    builtins_frozen: bool,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    fn ensure_capacity(&mut self, id: u16) {
        let needed = id as usize + 1;
        if self.id_to_info.len() < needed {
            let grown = (self.id_to_info.len().max(1) * 2).max(needed);
            self.id_to_info.resize(grown, None);
        }
    }

    fn first_free_id_from(&self, start: u16) -> u16 {
        let mut candidate = start;
        loop {
            if (candidate as usize) >= self.id_to_info.len()
                || self.id_to_info[candidate as usize].is_none()
            {
                return candidate;
            }
            candidate += 1;
        }
    }

    /// Registers `type` under the smallest free id at or above the
    /// monotonically advancing counter. Idempotent: a second call for an
    /// already-registered type returns the existing `ClassInfo`.
    pub fn register(&mut self, type_handle: TypeHandle) -> Arc<ClassInfo> {
        if let Some(info) = self.type_to_info.get(&type_handle) {
            return info.clone();
        }
        let id = self.first_free_id_from(self.next_id.max(INNER_END_CLASS_ID));
        let info = ClassInfo::new(type_handle);
        info.set_class_id(id);
        self.ensure_capacity(id);
        self.id_to_info[id as usize] = Some(info.clone());
        self.type_to_info.insert(type_handle, info.clone());
        self.next_id = id + 1;
        info
    }

    /// Registers `type` at a caller-chosen `id`. Reuses any pre-existing
    /// `ClassInfo` for `type`, preserving identity with the `type -> info`
    /// map, rather than minting a second record.
    pub fn register_with_id(
        &mut self,
        type_handle: TypeHandle,
        qualified_name: &str,
        id: u16,
    ) -> Result<Arc<ClassInfo>, Error> {
        self.check_id_assignable(type_handle, qualified_name, id)?;

        let info = match self.type_to_info.get(&type_handle) {
            Some(existing) => existing.clone(),
            None => ClassInfo::new(type_handle),
        };
        info.set_class_id(id);
        self.ensure_capacity(id);
        self.id_to_info[id as usize] = Some(info.clone());
        self.type_to_info.insert(type_handle, info.clone());
        self.name_to_type
            .insert(qualified_name.to_string(), type_handle);
        Ok(info)
    }

    /// Same as `register_with_id`, but always fails if `type` was
    /// previously registered under any id — no reuse of an existing entry.
    pub fn register_with_check(
        &mut self,
        type_handle: TypeHandle,
        qualified_name: &str,
        id: u16,
    ) -> Result<Arc<ClassInfo>, Error> {
        if self.type_to_info.contains_key(&type_handle) {
            return Err(Error::duplicate_registration(format!(
                "{qualified_name} already registered"
            )));
        }
        self.register_with_id(type_handle, qualified_name, id)
    }

    /// Registers `type` at `id`, same as `register_with_id`, and additionally
    /// binds it under a cross-language `tag` so a non-native peer can name
    /// the type without sharing this process's id table.
    pub fn register_with_tag(
        &mut self,
        type_handle: TypeHandle,
        qualified_name: &str,
        id: u16,
        tag: &str,
    ) -> Result<Arc<ClassInfo>, Error> {
        let info = self.register_with_id(type_handle, qualified_name, id)?;
        self.tag_to_type.insert(tag.to_string(), type_handle);
        self.type_to_tag.insert(type_handle, tag.to_string());
        Ok(info)
    }

    pub fn type_for_tag(&self, tag: &str) -> Option<TypeHandle> {
        self.tag_to_type.get(tag).copied()
    }

    pub fn tag_for_type(&self, type_handle: TypeHandle) -> Option<String> {
        self.type_to_tag.get(&type_handle).cloned()
    }

    fn check_id_assignable(
        &self,
        type_handle: TypeHandle,
        qualified_name: &str,
        id: u16,
    ) -> Result<(), Error> {
        if id >= MAX_CLASS_ID {
            return Err(Error::unsupported(format!(
                "class id {id} is out of the legal range [0, {MAX_CLASS_ID})"
            )));
        }
        if self.builtins_frozen && id < INNER_END_CLASS_ID {
            return Err(Error::unsupported(format!(
                "class id {id} is reserved for built-in types"
            )));
        }
        if let Some(existing_id) = self.registered_id(type_handle) {
            if existing_id != id {
                return Err(Error::duplicate_registration(format!(
                    "{qualified_name} is already registered at id {existing_id}"
                )));
            }
        }
        if let Some(occupant) = self.id_to_info.get(id as usize).and_then(|o| o.as_ref()) {
            if occupant.type_handle != type_handle {
                return Err(Error::duplicate_registration(format!(
                    "id {id} is already occupied by a different type"
                )));
            }
        }
        if let Some(&existing_type) = self.name_to_type.get(qualified_name) {
            if existing_type != type_handle {
                return Err(Error::duplicate_registration(format!(
                    "{qualified_name} is already registered for a different type"
                )));
            }
        }
        Ok(())
    }

    /// Occupies ids `[0, INNER_END_CLASS_ID)` and forbids user registration
    /// inside that range from this point on. Built-ins that correspond to
    /// a concrete `TypeHandle` should already have been registered via
    /// `register_with_id` before this call; stub ids with no Rust type
    /// (lambda/proxy/replace-resolve) simply stay reserved and empty.
    pub fn freeze_builtins(&mut self) {
        self.ensure_capacity(INNER_END_CLASS_ID.saturating_sub(1));
        self.next_id = self.next_id.max(INNER_END_CLASS_ID);
        self.builtins_frozen = true;
    }

    pub fn registered_id(&self, type_handle: TypeHandle) -> Option<u16> {
        self.type_to_info.get(&type_handle).map(|info| info.class_id())
    }

    pub fn registered_type(&self, id: u16) -> Option<TypeHandle> {
        self.id_to_info
            .get(id as usize)
            .and_then(|o| o.as_ref())
            .map(|info| info.type_handle)
    }

    pub fn class_info_for_id(&self, id: u16) -> Option<Arc<ClassInfo>> {
        self.id_to_info.get(id as usize).and_then(|o| o.clone())
    }

    pub fn class_info_for_type(&self, type_handle: TypeHandle) -> Option<Arc<ClassInfo>> {
        self.type_to_info.get(&type_handle).cloned()
    }

    /// The process-wide identity-keyed map the resolver facade consults on
    /// every lookup: returns the existing `ClassInfo` for `type`, or mints
    /// an unregistered one (`classId == NO_CLASS_ID`) and remembers it, so
    /// a type seen only through name transmission or meta-sharing still
    /// gets a single stable `ClassInfo` instance for the rest of the
    /// session.
    pub fn get_or_create_class_info(&mut self, type_handle: TypeHandle) -> Arc<ClassInfo> {
        self.type_to_info
            .entry(type_handle)
            .or_insert_with(|| ClassInfo::new(type_handle))
            .clone()
    }

    pub fn registered_types(&self) -> Vec<TypeHandle> {
        self.type_to_info.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;

    #[test]
    fn register_without_id_assigns_smallest_free_slot() {
        let mut registry = Registry::new();
        registry.freeze_builtins();
        let info = registry.register(TypeHandle::of::<A>());
        assert_eq!(info.class_id(), INNER_END_CLASS_ID);
    }

    #[test]
    fn register_is_idempotent() {
        let mut registry = Registry::new();
        let a = TypeHandle::of::<A>();
        let first = registry.register(a);
        let second = registry.register(a);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn duplicate_id_is_refused_and_original_mapping_survives() {
        let mut registry = Registry::new();
        registry
            .register_with_id(TypeHandle::of::<A>(), "pkg.A", 200)
            .unwrap();
        let err = registry
            .register_with_id(TypeHandle::of::<B>(), "pkg.B", 200)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateRegistration(_)));
        assert_eq!(registry.registered_type(200), Some(TypeHandle::of::<A>()));
    }

    #[test]
    fn id_at_max_class_id_is_refused() {
        let mut registry = Registry::new();
        let err = registry
            .register_with_id(TypeHandle::of::<A>(), "pkg.A", MAX_CLASS_ID)
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn reserved_ids_are_refused_once_frozen() {
        let mut registry = Registry::new();
        registry.freeze_builtins();
        let err = registry
            .register_with_id(TypeHandle::of::<A>(), "pkg.A", 0)
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn get_or_create_class_info_mints_an_unregistered_entry_once() {
        let mut registry = Registry::new();
        let first = registry.get_or_create_class_info(TypeHandle::of::<A>());
        assert!(!first.is_registered());
        let second = registry.get_or_create_class_info(TypeHandle::of::<A>());
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn register_with_tag_binds_both_tag_directions() {
        let mut registry = Registry::new();
        registry
            .register_with_tag(TypeHandle::of::<A>(), "pkg.A", 700, "xlang.A")
            .unwrap();
        assert_eq!(registry.type_for_tag("xlang.A"), Some(TypeHandle::of::<A>()));
        assert_eq!(registry.tag_for_type(TypeHandle::of::<A>()), Some("xlang.A".to_string()));
        assert_eq!(registry.type_for_tag("xlang.unknown"), None);
    }

    #[test]
    fn register_with_check_rejects_a_type_already_registered() {
        let mut registry = Registry::new();
        registry
            .register_with_id(TypeHandle::of::<A>(), "pkg.A", 50)
            .unwrap();
        let err = registry
            .register_with_check(TypeHandle::of::<A>(), "pkg.A", 60)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateRegistration(_)));
    }
}
