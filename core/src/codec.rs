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

//! The `Codec` seam. Individual codec bodies (the actual per-value
//! read/write logic for arrays, collections, enums, and so on) are an
//! external collaborator the resolver never implements — it only selects
//! *which* codec family applies and hands back a handle the embedding
//! runtime already knows how to drive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// The codec family `CodecSelector` chose for a type. Mirrors the selection
/// cascade's branches one-to-one so a caller can tell which rule fired
/// without inspecting the bound `Codec` itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    Boxed,
    PreBound,
    Enum,
    EnumSet,
    CharSet,
    ObjectArray,
    Lambda,
    Proxy,
    Calendar,
    TimeZone,
    ZoneId,
    Externalizable,
    ImmutableList,
    ImmutableMap,
    ByteBuffer,
    Collection,
    JdkCompatibleCollection,
    Map,
    JdkCompatibleMap,
    ReplaceResolve,
    JdkCustomSerialization,
    Object,
    CompatibleObject,
    /// Placeholder installed to break a recursive selection cycle or while
    /// a JIT-compiled codec is still being built; self-upgrades on next use.
    LazyInit,
}

/// Narrow interface every bound codec satisfies. The resolver only needs
/// to know which family it belongs to; encoding/decoding a value is the
/// embedding runtime's concern.
pub trait Codec: Send + Sync {
    fn kind(&self) -> CodecKind;
}

pub type CodecHandle = Arc<dyn Codec>;

struct StaticCodec(CodecKind);

impl Codec for StaticCodec {
    fn kind(&self) -> CodecKind {
        self.0
    }
}

/// Wraps an already-known codec kind as a `CodecHandle`, for the selection
/// branches that need nothing beyond tagging which rule fired.
pub fn static_codec(kind: CodecKind) -> CodecHandle {
    Arc::new(StaticCodec(kind))
}

/// Installed wherever `selectCodec` cannot hand back a concrete codec yet:
/// the JIT recursion guard breaking a cycle, or an async JIT compile still
/// in flight. Self-upgrades the moment `resolve` is called.
pub struct LazyInitCodec {
    resolved: Mutex<Option<CodecHandle>>,
    ready: AtomicBool,
}

impl LazyInitCodec {
    /// For the JIT recursion guard: no codec exists yet at all, not even a
    /// fallback. Only safe to hand out to the nested frame that triggered
    /// the cycle; the outer frame finishes selection and calls `resolve`.
    pub fn new() -> Arc<LazyInitCodec> {
        Arc::new(LazyInitCodec {
            resolved: Mutex::new(None),
            ready: AtomicBool::new(false),
        })
    }

    /// For the async codegen path: a working fallback codec (typically
    /// `Object`/`CompatibleObject`) is already bound, and this wraps it
    /// until the JIT callback upgrades it to the compiled codec.
    pub fn with_fallback(fallback: CodecHandle) -> Arc<LazyInitCodec> {
        Arc::new(LazyInitCodec {
            resolved: Mutex::new(Some(fallback)),
            ready: AtomicBool::new(false),
        })
    }

    /// Called by the JIT callback, or by the outer frame of a recursive
    /// selection, once the real codec is known.
    pub fn resolve(&self, codec: CodecHandle) {
        *self.resolved.lock().unwrap() = Some(codec);
        self.ready.store(true, Ordering::Release);
    }

    /// True once a compiled (not fallback) codec has been installed.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Returns the best codec available right now: the compiled one if
    /// ready, else the fallback, else `None` if nothing has been bound at
    /// all (the bare recursion-guard case).
    pub fn current(&self) -> Option<CodecHandle> {
        self.resolved.lock().unwrap().clone()
    }
}

impl Codec for LazyInitCodec {
    fn kind(&self) -> CodecKind {
        self.resolved
            .lock()
            .unwrap()
            .as_ref()
            .map(|c| c.kind())
            .unwrap_or(CodecKind::LazyInit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_codec_reports_its_kind() {
        let c = static_codec(CodecKind::Enum);
        assert_eq!(c.kind(), CodecKind::Enum);
    }

    #[test]
    fn lazy_init_codec_upgrades_on_resolve() {
        let lazy = LazyInitCodec::new();
        assert_eq!(lazy.kind(), CodecKind::LazyInit);
        assert!(!lazy.is_ready());
        lazy.resolve(static_codec(CodecKind::Object));
        assert!(lazy.is_ready());
        assert_eq!(lazy.kind(), CodecKind::Object);
    }

    #[test]
    fn lazy_init_codec_with_fallback_serves_fallback_until_upgraded() {
        let lazy = LazyInitCodec::with_fallback(static_codec(CodecKind::Object));
        assert_eq!(lazy.kind(), CodecKind::Object);
        assert!(!lazy.is_ready());
        lazy.resolve(static_codec(CodecKind::CompatibleObject));
        assert!(lazy.is_ready());
        assert_eq!(lazy.kind(), CodecKind::CompatibleObject);
    }
}
