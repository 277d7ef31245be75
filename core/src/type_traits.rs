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

//! `TypeTraits` and `TypeLoader`: the two capabilities `CodecSelector` and
//! `ClassNameCodec` consult instead of doing deep reflection on a runtime
//! type. Each embedding runtime binds these once, rather than the resolver
//! inspecting a type itself.

use std::any::TypeId as RustTypeId;
use std::collections::HashMap;
use std::sync::RwLock;

/// Opaque runtime type handle. The resolver never manufactures these; it
/// receives them from the embedding runtime or from a `TypeLoader`.
pub type TypeHandle = RustTypeId;

/// The physical shape of a type, as far as codec selection cares. Rust has
/// no runtime reflection, so this stands in for the Java source's battery
/// of `instanceof`/annotation checks: the embedding runtime classifies each
/// type once, at registration time, instead of the selector inspecting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeShape {
    Primitive,
    Enum,
    EnumSet,
    CharSet,
    ObjectArray,
    /// Array whose element type is itself primitive; these must have been
    /// pre-registered under a dedicated primitive-array id.
    PrimitiveArray,
    Lambda,
    Proxy,
    Calendar,
    TimeZone,
    ZoneId,
    ImmutableList,
    ImmutableMap,
    ByteBuffer,
    Collection,
    Map,
    /// No special shape; falls through to the Object/Compatible-Object
    /// codec cascade tail.
    Plain,
}

/// Per-type capability flags the `CodecSelector` security gate and JDK-style
/// cascade consult, in lieu of reflecting on replace/resolve methods,
/// externalizable/serializable marker interfaces, and codegen detection.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeCapabilities {
    pub shape: Option<TypeShape>,
    pub has_replace_resolve: bool,
    pub is_externalizable: bool,
    pub is_serializable: bool,
    pub is_runtime_generated: bool,
    /// True if the type defines read-object/write-object instance methods
    /// without implementing the externalizable contract.
    pub has_jdk_custom_methods: bool,
    pub is_stdlib: bool,
}

/// Binds runtime capability facts to types. The default table answers
/// "unknown" (`Plain` shape, no special flags) for anything not explicitly
/// registered — the embedding runtime is expected to call `set` for every
/// type with a non-default shape before it is ever resolved.
#[derive(Default)]
pub struct TypeTraits {
    table: RwLock<HashMap<TypeHandle, TypeCapabilities>>,
    super_chains: RwLock<HashMap<TypeHandle, Vec<TypeHandle>>>,
}

impl TypeTraits {
    pub fn new() -> TypeTraits {
        TypeTraits::default()
    }

    pub fn set(&self, t: TypeHandle, caps: TypeCapabilities) {
        self.table.write().unwrap().insert(t, caps);
    }

    pub fn set_super_chain(&self, t: TypeHandle, chain: Vec<TypeHandle>) {
        self.super_chains.write().unwrap().insert(t, chain);
    }

    pub fn capabilities(&self, t: TypeHandle) -> TypeCapabilities {
        self.table.read().unwrap().get(&t).copied().unwrap_or_default()
    }

    pub fn shape(&self, t: TypeHandle) -> TypeShape {
        self.capabilities(t).shape.unwrap_or(TypeShape::Plain)
    }

    /// True if `t` is an enum, or an inner subclass of an enum: the type's
    /// own shape is `Enum`, or any type in its super-chain is.
    pub fn is_enum_or_enum_subclass(&self, t: TypeHandle) -> bool {
        if self.shape(t) == TypeShape::Enum {
            return true;
        }
        self.super_chain(t)
            .iter()
            .any(|parent| self.shape(*parent) == TypeShape::Enum)
    }

    pub fn super_chain(&self, t: TypeHandle) -> Vec<TypeHandle> {
        self.super_chains
            .read()
            .unwrap()
            .get(&t)
            .cloned()
            .unwrap_or_default()
    }

    pub fn has_replace_resolve(&self, t: TypeHandle) -> bool {
        self.capabilities(t).has_replace_resolve
    }

    pub fn is_externalizable(&self, t: TypeHandle) -> bool {
        self.capabilities(t).is_externalizable
    }

    pub fn is_serializable(&self, t: TypeHandle) -> bool {
        self.capabilities(t).is_serializable
    }

    pub fn is_runtime_generated(&self, t: TypeHandle) -> bool {
        self.capabilities(t).is_runtime_generated
    }

    pub fn is_stdlib(&self, t: TypeHandle) -> bool {
        self.capabilities(t).is_stdlib
    }

    /// Requires JDK-style custom serialization: implements the
    /// serializable marker; is not an enum, array, or runtime-generated
    /// class; has no replace/resolve methods; does not implement the
    /// externalizable contract; but defines read-object/write-object.
    pub fn requires_jdk_style_custom_serialization(&self, t: TypeHandle) -> bool {
        let caps = self.capabilities(t);
        let shape = caps.shape.unwrap_or(TypeShape::Plain);
        caps.is_serializable
            && !matches!(
                shape,
                TypeShape::Enum | TypeShape::ObjectArray | TypeShape::PrimitiveArray
            )
            && !caps.is_runtime_generated
            && !caps.has_replace_resolve
            && !caps.is_externalizable
            && caps.has_jdk_custom_methods
    }
}

/// Resolves a type by its fully-qualified name. Narrow interface the
/// embedding runtime implements; `ClassNameCodec` calls it on a cache miss.
pub trait TypeLoader: Send + Sync {
    fn try_load(&self, qualified_name: &str) -> Option<TypeHandle>;
}

/// Tries a primary loader, then falls back to an ambient loader, matching
/// the spec's "configured loader, then the current ambient loader" order.
pub struct CompositeLoader {
    primary: Box<dyn TypeLoader>,
    ambient: Box<dyn TypeLoader>,
}

impl CompositeLoader {
    pub fn new(primary: Box<dyn TypeLoader>, ambient: Box<dyn TypeLoader>) -> CompositeLoader {
        CompositeLoader { primary, ambient }
    }
}

impl TypeLoader for CompositeLoader {
    fn try_load(&self, qualified_name: &str) -> Option<TypeHandle> {
        self.primary
            .try_load(qualified_name)
            .or_else(|| self.ambient.try_load(qualified_name))
    }
}

/// A loader backed by a simple name table, the shape most embedding
/// runtimes need: names become known the moment a type is registered by
/// name (`Registry::register_by_name`), and this loader is just that map's
/// read side.
#[derive(Default)]
pub struct TableLoader {
    names: RwLock<HashMap<String, TypeHandle>>,
}

impl TableLoader {
    pub fn new() -> TableLoader {
        TableLoader::default()
    }

    pub fn insert(&self, qualified_name: impl Into<String>, t: TypeHandle) {
        self.names.write().unwrap().insert(qualified_name.into(), t);
    }
}

impl TypeLoader for TableLoader {
    fn try_load(&self, qualified_name: &str) -> Option<TypeHandle> {
        self.names.read().unwrap().get(qualified_name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Foo;
    struct Bar;

    #[test]
    fn table_loader_resolves_registered_names() {
        let loader = TableLoader::new();
        loader.insert("app.Foo", TypeHandle::of::<Foo>());
        assert_eq!(loader.try_load("app.Foo"), Some(TypeHandle::of::<Foo>()));
        assert_eq!(loader.try_load("app.Bar"), None);
    }

    #[test]
    fn composite_loader_falls_back_to_ambient() {
        let primary = TableLoader::new();
        let ambient = TableLoader::new();
        ambient.insert("app.Bar", TypeHandle::of::<Bar>());
        let composite = CompositeLoader::new(Box::new(primary), Box::new(ambient));
        assert_eq!(composite.try_load("app.Bar"), Some(TypeHandle::of::<Bar>()));
        assert_eq!(composite.try_load("app.Missing"), None);
    }

    #[test]
    fn enum_subclass_is_detected_via_super_chain() {
        let traits = TypeTraits::new();
        let enum_t = TypeHandle::of::<Foo>();
        let subclass_t = TypeHandle::of::<Bar>();
        traits.set(
            enum_t,
            TypeCapabilities {
                shape: Some(TypeShape::Enum),
                ..Default::default()
            },
        );
        traits.set_super_chain(subclass_t, vec![enum_t]);
        assert!(traits.is_enum_or_enum_subclass(subclass_t));
    }
}
