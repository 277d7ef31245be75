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

use std::borrow::Cow;
use thiserror::Error as ThisError;

pub type AnyhowError = anyhow::Error;

/// Errors raised by the registry, codec selector, and meta-sharing channel.
///
/// Registration-time failures (`DuplicateRegistration`) and read/write-time
/// failures are both surfaced here; the resolver never retries and never
/// defers a failure to a later call.
#[derive(ThisError, Debug)]
pub enum Error {
    #[error("type already registered: {0}")]
    DuplicateRegistration(Cow<'static, str>),

    #[error("refusing to resolve unregistered/blacklisted class: {0}")]
    Insecure(Cow<'static, str>),

    #[error("class not found: {0}")]
    ClassNotFound(Cow<'static, str>),

    #[error("unsupported type for serialization: {0}")]
    Unsupported(Cow<'static, str>),

    #[error("meta-sharing operation requires a MetaContext to be set")]
    MissingMetaContext,

    #[error("type mismatch: local type id {0}, remote type id {1}")]
    TypeMismatch(u32, u32),

    #[error("invalid data: {0}")]
    InvalidData(Cow<'static, str>),

    #[error("invalid reference: {0}")]
    InvalidRef(Cow<'static, str>),

    #[error("encoding error: {0}")]
    EncodingError(Cow<'static, str>),

    #[error("buffer out of bound: requested {requested}, remaining {remaining}")]
    BufferOutOfBound { requested: usize, remaining: usize },

    #[error(transparent)]
    Other(#[from] AnyhowError),
}

impl Error {
    pub fn duplicate_registration(msg: impl Into<Cow<'static, str>>) -> Error {
        Error::DuplicateRegistration(msg.into())
    }

    pub fn insecure(msg: impl Into<Cow<'static, str>>) -> Error {
        Error::Insecure(msg.into())
    }

    pub fn class_not_found(msg: impl Into<Cow<'static, str>>) -> Error {
        Error::ClassNotFound(msg.into())
    }

    pub fn unsupported(msg: impl Into<Cow<'static, str>>) -> Error {
        Error::Unsupported(msg.into())
    }

    pub fn type_mismatch(local: u32, remote: u32) -> Error {
        Error::TypeMismatch(local, remote)
    }

    pub fn invalid_data(msg: impl Into<Cow<'static, str>>) -> Error {
        Error::InvalidData(msg.into())
    }

    pub fn encoding_error(msg: impl Into<Cow<'static, str>>) -> Error {
        Error::EncodingError(msg.into())
    }

    pub fn buffer_out_of_bound(requested: usize, remaining: usize) -> Error {
        Error::BufferOutOfBound {
            requested,
            remaining,
        }
    }
}

/// `ensure!(cond, err)` — the teacher's shorthand for `if !cond { return Err(err) }`.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err.into());
        }
    };
}
