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

//! `ClassDef`: the canonical structural description of a type that
//! `MetaShare` transmits once per session instead of inlining per value.
//! Its id is derived from its own serialized bytes, so two peers that
//! build the same structure independently agree on the id without
//! negotiating.

use crate::buffer::{Reader, Writer};
use crate::error::Error;
use crate::hash::murmurhash3_x64_128;
use std::collections::BTreeMap;

/// One field of a `ClassDef`: its name, its declared type (a fully
/// qualified or primitive type name, not a Rust `TypeHandle` — this travels
/// on the wire to a peer that may be a different language entirely), and
/// the class that actually declares it (relevant once inheritance puts
/// fields from more than one layer on a single def).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub declared_type: String,
    pub owning_class: String,
}

impl FieldDescriptor {
    pub fn new(
        name: impl Into<String>,
        declared_type: impl Into<String>,
        owning_class: impl Into<String>,
    ) -> FieldDescriptor {
        FieldDescriptor {
            name: name.into(),
            declared_type: declared_type.into(),
            owning_class: owning_class.into(),
        }
    }

    fn write(&self, w: &mut Writer) {
        write_str(w, &self.name);
        write_str(w, &self.declared_type);
        write_str(w, &self.owning_class);
    }

    fn read(r: &mut Reader) -> Result<FieldDescriptor, Error> {
        Ok(FieldDescriptor {
            name: read_str(r)?,
            declared_type: read_str(r)?,
            owning_class: read_str(r)?,
        })
    }
}

fn write_str(w: &mut Writer, s: &str) {
    let bytes = s.as_bytes();
    w.write_varuint32(bytes.len() as u32);
    w.write_bytes(bytes);
}

fn read_str(r: &mut Reader) -> Result<String, Error> {
    let len = r.read_varuint32()? as usize;
    let bytes = r.read_bytes(len)?;
    std::str::from_utf8(bytes)
        .map(|s| s.to_string())
        .map_err(|_| Error::invalid_data("class def contains non-utf8 string"))
}

/// Protocol-level flags that do not affect the field list, e.g.
/// `shareFieldsInfo ∈ {"true", "false"}`. Kept as an ordered map so the hash
/// that derives `ClassDef::id` is stable regardless of insertion order.
pub type ExtMeta = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub qualified_name: String,
    pub fields: Vec<FieldDescriptor>,
    pub ext_meta: ExtMeta,
    pub id: u64,
}

impl ClassDef {
    /// Builds a def and derives its id from its own content, so that two
    /// peers building the same structure agree without negotiating.
    pub fn new(
        qualified_name: impl Into<String>,
        fields: Vec<FieldDescriptor>,
        ext_meta: ExtMeta,
    ) -> ClassDef {
        let qualified_name = qualified_name.into();
        let id = Self::content_id(&qualified_name, &fields, &ext_meta);
        ClassDef {
            qualified_name,
            fields,
            ext_meta,
            id,
        }
    }

    /// A def carrying no field layout, used in `SchemaConsistent` mode or
    /// in a shareMeta-only handshake: `extMeta.shareFieldsInfo = "false"`.
    pub fn without_fields(qualified_name: impl Into<String>) -> ClassDef {
        let mut ext_meta = ExtMeta::new();
        ext_meta.insert("shareFieldsInfo".to_string(), "false".to_string());
        ClassDef::new(qualified_name, Vec::new(), ext_meta)
    }

    pub fn shares_fields_info(&self) -> bool {
        self.ext_meta.get("shareFieldsInfo").map(String::as_str) != Some("false")
    }

    fn content_id(qualified_name: &str, fields: &[FieldDescriptor], ext_meta: &ExtMeta) -> u64 {
        let mut w = Writer::default();
        write_str(&mut w, qualified_name);
        w.write_varuint32(fields.len() as u32);
        for f in fields {
            f.write(&mut w);
        }
        w.write_varuint32(ext_meta.len() as u32);
        for (k, v) in ext_meta {
            write_str(&mut w, k);
            write_str(&mut w, v);
        }
        let (h1, h2) = murmurhash3_x64_128(&w.dump(), 47);
        h1 ^ h2
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::default();
        write_str(&mut w, &self.qualified_name);
        w.write_varuint32(self.fields.len() as u32);
        for f in &self.fields {
            f.write(&mut w);
        }
        w.write_varuint32(self.ext_meta.len() as u32);
        for (k, v) in &self.ext_meta {
            write_str(&mut w, k);
            write_str(&mut w, v);
        }
        w.dump()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<ClassDef, Error> {
        let mut r = Reader::new(bytes);
        let qualified_name = read_str(&mut r)?;
        let num_fields = r.read_varuint32()? as usize;
        let mut fields = Vec::with_capacity(num_fields);
        for _ in 0..num_fields {
            fields.push(FieldDescriptor::read(&mut r)?);
        }
        let num_ext = r.read_varuint32()? as usize;
        let mut ext_meta = ExtMeta::new();
        for _ in 0..num_ext {
            let k = read_str(&mut r)?;
            let v = read_str(&mut r)?;
            ext_meta.insert(k, v);
        }
        let id = Self::content_id(&qualified_name, &fields, &ext_meta);
        Ok(ClassDef {
            qualified_name,
            fields,
            ext_meta,
            id,
        })
    }
}
