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

mod blacklist;
mod buffer;
mod class_def;
mod class_info;
mod codec;
mod codec_selector;
mod config;
mod error;
mod hash;
mod jit;
mod meta_share;
mod name_codec;
mod registry;
mod resolver;
mod stringtable;
mod type_traits;
mod types;

pub use blacklist::BlackList;
pub use buffer::{Reader, Writer};
pub use class_def::{ClassDef, ExtMeta, FieldDescriptor};
pub use class_info::{ClassInfo, ClassInfoCache, ClassNameBytes, ClassNameCache};
pub use codec::{static_codec, Codec, CodecHandle, CodecKind, LazyInitCodec};
pub use codec_selector::{CodecSelector, SelectionRequest};
pub use config::ResolverConfig;
pub use error::Error;
pub use jit::{warn_codegen_unavailable, CodecFactory, JitCallback, JitContext, NullJitContext};
#[cfg(feature = "dylib-jit")]
pub use jit::DylibJitContext;
pub use meta_share::{unexisted_meta_shared_handle, MetaContext, MetaShare, UnexistedMetaShared};
pub use name_codec::{unexisted_skip_handle, ClassNameCodec, UnexistedSkip};
pub use registry::Registry;
pub use resolver::Resolver;
pub use stringtable::{InternedString, StringTableReader, StringTableWriter};
pub use type_traits::{
    CompositeLoader, TableLoader, TypeCapabilities, TypeHandle, TypeLoader, TypeShape, TypeTraits,
};
pub use types::{
    ClassTag, Mode, BOXED_DOUBLE_CLASS_ID, BOXED_INTEGER_CLASS_ID, BOXED_LONG_CLASS_ID,
    CLASS_CLASS_ID, INNER_END_CLASS_ID, MAX_CLASS_ID, NO_CLASS_ID,
};
