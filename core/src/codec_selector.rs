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

//! `CodecSelector`: the pure cascade from `(type, mode, flags)` to a codec
//! family. Every rule in the cascade is a disjoint predicate; the first
//! one that matches wins.

use crate::blacklist::BlackList;
use crate::class_info::ClassInfo;
use crate::codec::{static_codec, Codec, CodecHandle, CodecKind, LazyInitCodec};
use crate::error::Error;
use crate::jit::{warn_codegen_unavailable, CodecFactory, JitCallback, JitContext};
use crate::type_traits::{TypeHandle, TypeShape, TypeTraits};
use crate::types::Mode;
use dashmap::DashSet;
use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

thread_local! {
    /// Per-thread "currently selecting" set: breaks the cycle when `T`'s
    /// own selection recursively re-enters `selectCodec(T)` (field of B is
    /// A, field of A is B).
    static SELECTING: RefCell<HashSet<TypeHandle>> = RefCell::new(HashSet::new());
}

pub struct SelectionRequest<'a> {
    pub type_handle: TypeHandle,
    pub qualified_name: &'a str,
    pub mode: Mode,
    pub codegen_enabled: bool,
    pub share_meta: bool,
    /// Whether unregistered, non-blacklisted types are refused outright
    /// unless implicitly trusted (lambdas, proxies, arrays of a trusted
    /// component).
    pub require_registration: bool,
    pub registered: bool,
}

pub struct CodecSelector {
    traits: Arc<TypeTraits>,
    blacklist: BlackList,
    /// Concurrent so the JIT compile thread can query field descriptors
    /// the same way the owning thread does, without a lock around the
    /// whole selector.
    warned_insecure: DashSet<TypeHandle>,
    jit: Mutex<Option<Arc<dyn JitContext>>>,
}

impl CodecSelector {
    pub fn new(traits: Arc<TypeTraits>, blacklist: BlackList) -> CodecSelector {
        CodecSelector {
            traits,
            blacklist,
            warned_insecure: DashSet::new(),
            jit: Mutex::new(None),
        }
    }

    pub fn set_jit_context(&self, jit: Arc<dyn JitContext>) {
        *self.jit.lock().unwrap() = Some(jit);
    }

    fn warn_once(&self, req: &SelectionRequest) {
        if self.warned_insecure.insert(req.type_handle) {
            tracing::warn!(
                type_name = req.qualified_name,
                "resolving a security-sensitive type without rejecting it"
            );
        }
    }

    /// Gates every unregistered type against the blacklist and the
    /// required-registration flag. A type the caller already registered
    /// explicitly is allowed through even if blacklisted, since explicit
    /// registration is the caller's own override; it still gets the
    /// once-only warning so the decision is visible.
    fn security_gate(&self, req: &SelectionRequest) -> Result<(), Error> {
        if req.registered {
            if self.blacklist.contains(req.qualified_name) {
                self.warn_once(req);
            }
            return Ok(());
        }

        if self.blacklist.contains(req.qualified_name) {
            return Err(Error::insecure(format!(
                "{} is blacklisted",
                req.qualified_name
            )));
        }

        let shape = self.traits.shape(req.type_handle);
        let implicitly_trusted = matches!(
            shape,
            TypeShape::Lambda | TypeShape::Proxy | TypeShape::ObjectArray | TypeShape::PrimitiveArray
        );
        if req.require_registration && !implicitly_trusted {
            return Err(Error::insecure(format!(
                "{} must be registered before use",
                req.qualified_name
            )));
        }

        self.warn_once(req);
        Ok(())
    }

    /// Drives the 17-step cascade. `class_info` is consulted for a
    /// pre-bound codec (rule 2) and is where a codegen upgrade gets
    /// installed once the JIT callback fires.
    pub fn select_codec(
        &self,
        req: SelectionRequest,
        class_info: &ClassInfo,
    ) -> Result<CodecHandle, Error> {
        self.security_gate(&req)?;

        let shape = self.traits.shape(req.type_handle);
        let caps = self.traits.capabilities(req.type_handle);

        // 1. Primitive -> boxed form's codec.
        if shape == TypeShape::Primitive {
            return Ok(static_codec(CodecKind::Boxed));
        }
        // 2. Pre-bound codec already on the ClassInfo.
        if let Some(existing) = class_info.codec() {
            return Ok(existing);
        }
        // 3. Enum or enum subclass.
        if self.traits.is_enum_or_enum_subclass(req.type_handle) {
            return Ok(static_codec(CodecKind::Enum));
        }
        // 4. Enum set.
        if shape == TypeShape::EnumSet {
            return Ok(static_codec(CodecKind::EnumSet));
        }
        // 5. Character set.
        if shape == TypeShape::CharSet {
            return Ok(static_codec(CodecKind::CharSet));
        }
        // 6. Arrays: primitive-element arrays must already have a
        // dedicated registered id; encountering one here is a bug in the
        // caller, not something this cascade can recover from.
        if shape == TypeShape::PrimitiveArray {
            return Err(Error::unsupported(format!(
                "{} is a primitive-element array; it must be pre-registered under a dedicated id",
                req.qualified_name
            )));
        }
        if shape == TypeShape::ObjectArray {
            return Ok(static_codec(CodecKind::ObjectArray));
        }
        // 7. Lambda / dynamic proxy.
        if shape == TypeShape::Lambda {
            return Ok(static_codec(CodecKind::Lambda));
        }
        if shape == TypeShape::Proxy {
            return Ok(static_codec(CodecKind::Proxy));
        }
        // 8. Calendar / time-zone / zone-id.
        match shape {
            TypeShape::Calendar => return Ok(static_codec(CodecKind::Calendar)),
            TypeShape::TimeZone => return Ok(static_codec(CodecKind::TimeZone)),
            TypeShape::ZoneId => return Ok(static_codec(CodecKind::ZoneId)),
            _ => {}
        }
        // 9. Externalizable contract.
        if caps.is_externalizable {
            return Ok(static_codec(CodecKind::Externalizable));
        }
        // 10. Immutable list/map built-ins.
        if shape == TypeShape::ImmutableList {
            return Ok(static_codec(CodecKind::ImmutableList));
        }
        if shape == TypeShape::ImmutableMap {
            return Ok(static_codec(CodecKind::ImmutableMap));
        }
        // 11. Byte buffer.
        if shape == TypeShape::ByteBuffer {
            return Ok(static_codec(CodecKind::ByteBuffer));
        }
        // 12. JDK-class-serializability check.
        if caps.is_stdlib && !caps.is_serializable {
            return Err(Error::unsupported(format!(
                "{} is a standard-library type not marked serializable",
                req.qualified_name
            )));
        }
        // 13. Collection.
        if shape == TypeShape::Collection {
            return Ok(static_codec(
                if self
                    .traits
                    .requires_jdk_style_custom_serialization(req.type_handle)
                    || caps.has_replace_resolve
                {
                    CodecKind::JdkCompatibleCollection
                } else {
                    CodecKind::Collection
                },
            ));
        }
        // 14. Map.
        if shape == TypeShape::Map {
            return Ok(static_codec(
                if self
                    .traits
                    .requires_jdk_style_custom_serialization(req.type_handle)
                    || caps.has_replace_resolve
                {
                    CodecKind::JdkCompatibleMap
                } else {
                    CodecKind::Map
                },
            ));
        }
        // 15. Replace/resolve hooks.
        if caps.has_replace_resolve {
            return Ok(static_codec(CodecKind::ReplaceResolve));
        }
        // 16. JDK-style custom serialization.
        if self
            .traits
            .requires_jdk_style_custom_serialization(req.type_handle)
        {
            return Ok(static_codec(CodecKind::JdkCustomSerialization));
        }
        // 17. Fallback, with the JIT recursion guard and async upgrade.
        self.select_fallback(req, class_info)
    }

    fn select_fallback(
        &self,
        req: SelectionRequest,
        class_info: &ClassInfo,
    ) -> Result<CodecHandle, Error> {
        let already_selecting = SELECTING.with(|set| !set.borrow_mut().insert(req.type_handle));
        if already_selecting {
            // Recursive re-entry: A's field is B, B's field is A. Hand the
            // nested frame a codec with nothing bound yet; the outer frame
            // installs the real one once its own selection completes.
            return Ok(LazyInitCodec::new());
        }

        let result = (|| -> Result<CodecHandle, Error> {
            let fallback_kind = match (req.mode, req.share_meta) {
                (Mode::SchemaConsistent, _) => CodecKind::Object,
                (Mode::Compatible, _) => CodecKind::CompatibleObject,
            };
            let fallback: CodecHandle = static_codec(fallback_kind);

            if !req.codegen_enabled {
                return Ok(fallback);
            }

            let jit = self.jit.lock().unwrap().clone();
            match jit {
                None => {
                    warn_codegen_unavailable(req.qualified_name);
                    Ok(fallback)
                }
                Some(jit) => {
                    let lazy = LazyInitCodec::with_fallback(fallback);
                    let callback_target = lazy.clone();
                    let on_ready: JitCallback = Box::new(move |compiled| {
                        callback_target.resolve(compiled);
                    });
                    match jit.request_codec(req.type_handle, req.qualified_name, on_ready) {
                        CodecFactory::Ready(compiled) => {
                            lazy.resolve(compiled);
                        }
                        CodecFactory::Pending => {}
                    }
                    let handle: CodecHandle = lazy;
                    Ok(handle)
                }
            }
        })();

        if let Ok(ref codec) = result {
            class_info.set_codec(codec.clone());
        }
        SELECTING.with(|set| set.borrow_mut().remove(&req.type_handle));
        result
    }
}
