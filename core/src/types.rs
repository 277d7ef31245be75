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

//! Wire-level constants: the class tag byte, reserved id block, and the
//! schema-consistency mode. These are fixed points of the wire format,
//! expressed as named constants rather than scattered arithmetic.

/// Tag byte written in front of every object payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ClassTag {
    /// Payload identifies the type by name or by meta-share session id.
    UseClassValue = 0x00,
    /// Payload is a 16-bit registered id.
    UseId = 0x01,
}

impl ClassTag {
    pub fn from_byte(b: u8) -> Option<ClassTag> {
        match b {
            0x00 => Some(ClassTag::UseClassValue),
            0x01 => Some(ClassTag::UseId),
            _ => None,
        }
    }
}

pub const NO_CLASS_ID: u16 = 0;
pub const LAMBDA_STUB: u16 = 1;
pub const PROXY_STUB: u16 = 2;
pub const REPLACE_STUB: u16 = 3;

// Primitives: void, bool, byte, char, short, int, float, long, double.
pub const PRIMITIVE_VOID: u16 = 4;
pub const PRIMITIVE_BOOL: u16 = 5;
pub const PRIMITIVE_BYTE: u16 = 6;
pub const PRIMITIVE_CHAR: u16 = 7;
pub const PRIMITIVE_SHORT: u16 = 8;
pub const PRIMITIVE_INT: u16 = 9;
pub const PRIMITIVE_FLOAT: u16 = 10;
pub const PRIMITIVE_LONG: u16 = 11;
pub const PRIMITIVE_DOUBLE: u16 = 12;

// Boxed equivalents and String.
pub const BOXED_BOOL_CLASS_ID: u16 = 13;
pub const BOXED_BYTE_CLASS_ID: u16 = 14;
pub const BOXED_CHAR_CLASS_ID: u16 = 15;
pub const BOXED_SHORT_CLASS_ID: u16 = 16;
pub const BOXED_INTEGER_CLASS_ID: u16 = 17;
pub const BOXED_FLOAT_CLASS_ID: u16 = 18;
pub const BOXED_LONG_CLASS_ID: u16 = 19;
pub const BOXED_DOUBLE_CLASS_ID: u16 = 20;
pub const STRING_CLASS_ID: u16 = 21;
// 22 reserved for a future boxed/builtin slot.

// Primitive 1-D arrays.
pub const BOOL_ARRAY_CLASS_ID: u16 = 23;
pub const BYTE_ARRAY_CLASS_ID: u16 = 24;
pub const CHAR_ARRAY_CLASS_ID: u16 = 25;
pub const SHORT_ARRAY_CLASS_ID: u16 = 26;
pub const INT_ARRAY_CLASS_ID: u16 = 27;
pub const FLOAT_ARRAY_CLASS_ID: u16 = 28;
pub const LONG_ARRAY_CLASS_ID: u16 = 29;
pub const DOUBLE_ARRAY_CLASS_ID: u16 = 30;

pub const STRING_ARRAY_CLASS_ID: u16 = 31;
pub const OBJECT_ARRAY_CLASS_ID: u16 = 32;

pub const ARRAY_LIST_CLASS_ID: u16 = 33;
pub const HASH_MAP_CLASS_ID: u16 = 34;
pub const HASH_SET_CLASS_ID: u16 = 35;
pub const CLASS_CLASS_ID: u16 = 36;

/// First id available for user registration. Ids below this are reserved
/// for built-ins and frozen after `Registry::initialize`.
pub const INNER_END_CLASS_ID: u16 = 37;

/// Largest id a class may legally be registered at (exclusive): ids span
/// `[0, 32767)`. The boundary value itself, `i16::MAX`, is refused.
pub const MAX_CLASS_ID: u16 = i16::MAX as u16;

pub const THREE_COMMON_BOXED_NUMERICS: [u16; 3] = [
    BOXED_LONG_CLASS_ID,
    BOXED_INTEGER_CLASS_ID,
    BOXED_DOUBLE_CLASS_ID,
];

/// Schema-evolution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Sender and receiver agree on layouts; used for maximum speed.
    SchemaConsistent,
    /// Deserialization tolerates schema drift between sender and receiver.
    Compatible,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_block_ends_before_inner_end_class_id() {
        assert_eq!(HASH_SET_CLASS_ID, INNER_END_CLASS_ID - 2);
        assert_eq!(CLASS_CLASS_ID, INNER_END_CLASS_ID - 1);
    }

    #[test]
    fn class_tag_round_trips() {
        assert_eq!(ClassTag::from_byte(0x00), Some(ClassTag::UseClassValue));
        assert_eq!(ClassTag::from_byte(0x01), Some(ClassTag::UseId));
        assert_eq!(ClassTag::from_byte(0x02), None);
    }
}
