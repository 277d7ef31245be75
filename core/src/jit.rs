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

//! `JitContext`: asynchronous compilation of per-type fast codecs. The
//! resolver never blocks on this — `request_codec` returns a `Pending`
//! factory synchronously, and a background compile thread later calls the
//! supplied callback, which installs the compiled codec into the owning
//! `ClassInfo`.

use crate::codec::CodecHandle;
use crate::type_traits::TypeHandle;
use tracing::warn;

pub type JitCallback = Box<dyn FnOnce(CodecHandle) + Send>;

/// What `request_codec` hands back. `Ready` is only returned by a context
/// that can compile synchronously (none of ours do); every real
/// implementation here returns `Pending` and completes later through the
/// callback.
pub enum CodecFactory {
    Pending,
    Ready(CodecHandle),
}

pub trait JitContext: Send + Sync {
    /// Requests a compiled fast codec for `type_handle`. Must return
    /// immediately; `on_ready` fires once, from any thread, when (and if)
    /// compilation finishes. A context that never calls `on_ready` is a
    /// valid way to opt out of JIT entirely — the selector's fallback
    /// codec, already installed, keeps serving the type forever.
    fn request_codec(
        &self,
        type_handle: TypeHandle,
        qualified_name: &str,
        on_ready: JitCallback,
    ) -> CodecFactory;
}

/// Default context: codegen is effectively disabled. Every request returns
/// `Pending` and the callback is dropped, matching "JIT compilation
/// failures do not propagate: the resolver remains on the fallback
/// reflective codec."
pub struct NullJitContext;

impl JitContext for NullJitContext {
    fn request_codec(
        &self,
        _type_handle: TypeHandle,
        _qualified_name: &str,
        _on_ready: JitCallback,
    ) -> CodecFactory {
        CodecFactory::Pending
    }
}

#[cfg(feature = "dylib-jit")]
pub use dylib::DylibJitContext;

#[cfg(feature = "dylib-jit")]
mod dylib {
    use super::{CodecFactory, JitCallback, JitContext};
    use crate::codec::{static_codec, CodecKind};
    use crate::type_traits::TypeHandle;
    use libloading::Library;
    use std::fs;
    use std::process::{Command, Stdio};
    use tempfile::TempDir;
    use tracing::{error, info};

    /// Compiles a marker cdylib per type and loads it with `libloading`,
    /// the same out-of-process compile-then-dlopen shape the framework's
    /// codegen backend uses for a real fast codec. This crate has no codec
    /// bodies of its own to generate (`Codec<T>` implementations are an
    /// external collaborator), so the generated crate only proves the
    /// round trip: it exports a symbol the loader can resolve, and the
    /// installed codec is tagged `CodecKind::Object` with JIT provenance
    /// noted in its label.
    pub struct DylibJitContext;

    impl JitContext for DylibJitContext {
        fn request_codec(
            &self,
            _type_handle: TypeHandle,
            qualified_name: &str,
            on_ready: JitCallback,
        ) -> CodecFactory {
            let qualified_name = qualified_name.to_string();
            std::thread::spawn(move || match compile_and_load(&qualified_name) {
                Ok(_lib) => {
                    info!(qualified_name, "jit codec compiled");
                    on_ready(static_codec(CodecKind::Object));
                }
                Err(e) => {
                    error!(qualified_name, error = %e, "jit codec compilation failed");
                }
            });
            CodecFactory::Pending
        }
    }

    fn compile_and_load(qualified_name: &str) -> Result<Library, String> {
        let dir = TempDir::new().map_err(|e| e.to_string())?;
        let src_dir = dir.path().join("src");
        fs::create_dir_all(&src_dir).map_err(|e| e.to_string())?;
        fs::write(
            src_dir.join("lib.rs"),
            "#[no_mangle]\npub extern \"C\" fn jit_codec_marker() {}\n",
        )
        .map_err(|e| e.to_string())?;
        fs::write(
            dir.path().join("Cargo.toml"),
            format!(
                "[package]\nname = \"jit-{name}\"\nversion = \"0.0.0\"\nedition = \"2021\"\n\n[lib]\ncrate-type = [\"cdylib\"]\n\n[workspace]\n",
                name = sanitize(qualified_name),
            ),
        )
        .map_err(|e| e.to_string())?;

        let status = Command::new("cargo")
            .current_dir(dir.path())
            .args(["build", "--release"])
            .stdout(Stdio::null())
            .status()
            .map_err(|e| e.to_string())?;
        if !status.success() {
            return Err("cargo build failed".to_string());
        }

        let lib_name = format!(
            "lib{}{}",
            format!("jit_{}", sanitize(qualified_name)),
            std::env::consts::DLL_SUFFIX
        );
        let lib_path = dir.path().join("target/release").join(lib_name);
        unsafe { Library::new(lib_path).map_err(|e| e.to_string()) }
    }

    fn sanitize(qualified_name: &str) -> String {
        qualified_name
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect()
    }
}

/// No-op warning hook used by callers that configure `NullJitContext` but
/// still want a log line the first time codegen is requested and skipped.
pub fn warn_codegen_unavailable(qualified_name: &str) {
    warn!(qualified_name, "codegen requested but no JitContext configured; using fallback codec");
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Foo;

    #[test]
    fn null_context_never_resolves_the_callback() {
        let ctx = NullJitContext;
        let resolved = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = resolved.clone();
        let factory = ctx.request_codec(TypeHandle::of::<Foo>(), "user.Foo", Box::new(move |_| {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
        }));
        assert!(matches!(factory, CodecFactory::Pending));
        assert!(!resolved.load(std::sync::atomic::Ordering::SeqCst));
    }
}
