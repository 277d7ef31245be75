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

//! `StringTable`: the interned-string channel `ClassNameCodec` writes
//! package names and simple names through. First occurrence of a string
//! carries its length, a hash, and its UTF-8 bytes; later occurrences in
//! the same session carry only a small back-reference id.
//!
//! Wire shape per string, `header = (payload << 1) | is_ref`:
//! - `is_ref == 0`: `payload` is the byte length. A length over
//!   [`SMALL_STRING_THRESHOLD`] is followed by an 8-byte hash (so a
//!   dictionary hit can skip the bytes on re-read); otherwise the bytes
//!   follow directly.
//! - `is_ref == 1`: `payload - 1` is the id of a previously-written string.

use crate::buffer::{Reader, Writer};
use crate::error::Error;
use crate::hash::murmurhash3_x64_128;
use std::collections::HashMap;
use std::rc::Rc;

const SMALL_STRING_THRESHOLD: usize = 16;

fn hash_of(bytes: &[u8]) -> u64 {
    murmurhash3_x64_128(bytes, 47).0
}

/// A previously-interned string plus the hash `ClassNameBytes` keys on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternedString {
    pub value: Rc<str>,
    pub hash: u64,
}

#[derive(Default)]
pub struct StringTableWriter {
    ids: HashMap<Rc<str>, u32>,
    next_id: u32,
}

impl StringTableWriter {
    pub fn new() -> StringTableWriter {
        StringTableWriter::default()
    }

    /// Writes `s`, interning it for the lifetime of this writer. Returns
    /// the hash so the caller can build a `ClassNameBytes` cache key
    /// without re-hashing.
    pub fn write_string(&mut self, writer: &mut Writer, s: &str) -> u64 {
        if let Some(&id) = self.ids.get(s) {
            let header = ((id + 1) << 1) | 1;
            writer.write_varuint32(header);
            return hash_of(s.as_bytes());
        }

        let bytes = s.as_bytes();
        let hash = hash_of(bytes);
        let header = ((bytes.len() as u32) << 1) | 0;
        writer.write_varuint32(header);
        if bytes.len() > SMALL_STRING_THRESHOLD {
            writer.write_u64(hash);
        }
        writer.write_bytes(bytes);

        let id = self.next_id;
        self.next_id += 1;
        self.ids.insert(Rc::from(s), id);
        hash
    }

    /// Clears per-session interning state. Called between independent
    /// write sessions so ids do not leak across them.
    pub fn reset(&mut self) {
        self.ids.clear();
        self.next_id = 0;
    }
}

#[derive(Default)]
pub struct StringTableReader {
    by_id: Vec<InternedString>,
    by_hash: HashMap<u64, InternedString>,
}

impl StringTableReader {
    pub fn new() -> StringTableReader {
        StringTableReader::default()
    }

    pub fn read_string(&mut self, reader: &mut Reader) -> Result<InternedString, Error> {
        let header = reader.read_varuint32()?;
        if header & 1 == 1 {
            let id = (header >> 1).wrapping_sub(1) as usize;
            return self
                .by_id
                .get(id)
                .cloned()
                .ok_or_else(|| Error::invalid_data("back-referenced string id not seen yet"));
        }

        let len = (header >> 1) as usize;
        let interned = if len > SMALL_STRING_THRESHOLD {
            let hash = reader.read_u64()?;
            if let Some(existing) = self.by_hash.get(&hash) {
                reader.skip(len)?;
                existing.clone()
            } else {
                let bytes = reader.read_bytes(len)?;
                let value = std::str::from_utf8(bytes)
                    .map_err(|_| Error::invalid_data("string bytes are not valid utf-8"))?;
                let interned = InternedString {
                    value: Rc::from(value),
                    hash,
                };
                self.by_hash.insert(hash, interned.clone());
                interned
            }
        } else {
            let bytes = reader.read_bytes(len)?;
            let value = std::str::from_utf8(bytes)
                .map_err(|_| Error::invalid_data("string bytes are not valid utf-8"))?;
            InternedString {
                value: Rc::from(value),
                hash: hash_of(bytes),
            }
        };

        self.by_id.push(interned.clone());
        Ok(interned)
    }

    pub fn reset(&mut self) {
        self.by_id.clear();
        self.by_hash.clear();
    }
}
