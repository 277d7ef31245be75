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

//! `ResolverConfig`: the flags that steer codec selection and meta-sharing.
//! Built by chaining setters that consume and return `self`, the same
//! shape the framework's top-level builder uses.

use crate::types::Mode;

#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
    mode: Mode,
    codegen_enabled: bool,
    share_meta: bool,
    /// Substitute `UnexistedSkip` instead of failing when a class name
    /// cannot be resolved through the loader chain.
    tolerant_unknown_class: bool,
    /// Refuse unregistered, non-blacklisted, non-implicitly-trusted types
    /// outright instead of warning once and proceeding.
    require_registration: bool,
}

impl Default for ResolverConfig {
    fn default() -> ResolverConfig {
        ResolverConfig {
            mode: Mode::SchemaConsistent,
            codegen_enabled: false,
            share_meta: false,
            tolerant_unknown_class: false,
            require_registration: false,
        }
    }
}

impl ResolverConfig {
    pub fn new() -> ResolverConfig {
        ResolverConfig::default()
    }

    pub fn mode(mut self, mode: Mode) -> ResolverConfig {
        self.mode = mode;
        self
    }

    pub fn codegen_enabled(mut self, enabled: bool) -> ResolverConfig {
        self.codegen_enabled = enabled;
        self
    }

    pub fn share_meta(mut self, enabled: bool) -> ResolverConfig {
        self.share_meta = enabled;
        self
    }

    pub fn tolerant_unknown_class(mut self, tolerant: bool) -> ResolverConfig {
        self.tolerant_unknown_class = tolerant;
        self
    }

    pub fn require_registration(mut self, required: bool) -> ResolverConfig {
        self.require_registration = required;
        self
    }

    pub fn get_mode(&self) -> Mode {
        self.mode
    }

    pub fn is_codegen_enabled(&self) -> bool {
        self.codegen_enabled
    }

    pub fn is_share_meta(&self) -> bool {
        self.share_meta
    }

    pub fn is_tolerant_unknown_class(&self) -> bool {
        self.tolerant_unknown_class
    }

    pub fn is_require_registration(&self) -> bool {
        self.require_registration
    }
}
