//! MessagePack prefix bytes and wire types.
//!
//! Byte values follow the published MessagePack format.

use std::fmt;

// 0XXXXXXX
pub const FIXINT: u8 = 0x00;
// 111XXXXX
pub const FIXINT_NEG: u8 = 0xe0;
// 1000XXXX
pub const FIXMAP: u8 = 0x80;
// 1001XXXX
pub const FIXARRAY: u8 = 0x90;
// 101XXXXX
pub const FIXSTR: u8 = 0xa0;

pub const NIL: u8 = 0xc0;
/// Reserved by the format; never valid on the wire.
pub const NEVER_USED: u8 = 0xc1;
pub const FALSE: u8 = 0xc2;
pub const TRUE: u8 = 0xc3;
pub const BIN8: u8 = 0xc4;
pub const BIN16: u8 = 0xc5;
pub const BIN32: u8 = 0xc6;
pub const EXT8: u8 = 0xc7;
pub const EXT16: u8 = 0xc8;
pub const EXT32: u8 = 0xc9;
pub const FLOAT32: u8 = 0xca;
pub const FLOAT64: u8 = 0xcb;
pub const UINT8: u8 = 0xcc;
pub const UINT16: u8 = 0xcd;
pub const UINT32: u8 = 0xce;
pub const UINT64: u8 = 0xcf;
pub const INT8: u8 = 0xd0;
pub const INT16: u8 = 0xd1;
pub const INT32: u8 = 0xd2;
pub const INT64: u8 = 0xd3;
pub const FIXEXT1: u8 = 0xd4;
pub const FIXEXT2: u8 = 0xd5;
pub const FIXEXT4: u8 = 0xd6;
pub const FIXEXT8: u8 = 0xd7;
pub const FIXEXT16: u8 = 0xd8;
pub const STR8: u8 = 0xd9;
pub const STR16: u8 = 0xda;
pub const STR32: u8 = 0xdb;
pub const ARRAY16: u8 = 0xdc;
pub const ARRAY32: u8 = 0xdd;
pub const MAP16: u8 = 0xde;
pub const MAP32: u8 = 0xdf;

pub const LAST4: u8 = 0x0f;
pub const FIRST4: u8 = 0xf0;
pub const LAST5: u8 = 0x1f;
pub const FIRST3: u8 = 0xe0;
pub const LAST7: u8 = 0x7f;

/// Longest payload a fixstr can carry.
pub const FIXSTR_MAX: usize = 31;
/// Most elements (or pairs) a fixarray/fixmap can carry.
pub const FIXCONTAINER_MAX: usize = 15;

/// Logical kind of a value, as determined by its leading byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Invalid,
    Str,
    Bin,
    Map,
    Array,
    Float32,
    Float64,
    Bool,
    Int,
    Uint,
    Nil,
    Extension,
}

impl WireType {
    pub fn is_container(self) -> bool {
        matches!(self, WireType::Array | WireType::Map)
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WireType::Str => "str",
            WireType::Bin => "bin",
            WireType::Map => "map",
            WireType::Array => "array",
            WireType::Float64 => "float64",
            WireType::Float32 => "float32",
            WireType::Bool => "bool",
            WireType::Uint => "uint",
            WireType::Int => "int",
            WireType::Extension => "ext",
            WireType::Nil => "nil",
            WireType::Invalid => "<invalid>",
        };
        f.write_str(name)
    }
}

#[inline]
pub const fn is_fixint(b: u8) -> bool {
    b >> 7 == 0
}

#[inline]
pub const fn is_negative_fixint(b: u8) -> bool {
    b & FIRST3 == FIXINT_NEG
}

#[inline]
pub const fn is_fixstr(b: u8) -> bool {
    b & FIRST3 == FIXSTR
}

#[inline]
pub const fn is_fixarray(b: u8) -> bool {
    b & FIRST4 == FIXARRAY
}

#[inline]
pub const fn is_fixmap(b: u8) -> bool {
    b & FIRST4 == FIXMAP
}

/// Short human label for a prefix byte, e.g. `fixstr` or `uint16`.
pub fn prefix_name(prefix: u8) -> &'static str {
    if is_fixint(prefix) {
        return "fixint";
    }
    if is_negative_fixint(prefix) {
        return "nfixint";
    }
    if is_fixstr(prefix) {
        return "fixstr";
    }
    if is_fixarray(prefix) {
        return "fixarray";
    }
    if is_fixmap(prefix) {
        return "fixmap";
    }
    match prefix {
        NIL => "nil",
        FALSE => "false",
        TRUE => "true",
        BIN8 => "bin8",
        BIN16 => "bin16",
        BIN32 => "bin32",
        EXT8 => "ext8",
        EXT16 => "ext16",
        EXT32 => "ext32",
        FLOAT32 => "float32",
        FLOAT64 => "float64",
        UINT8 => "uint8",
        UINT16 => "uint16",
        UINT32 => "uint32",
        UINT64 => "uint64",
        INT8 => "int8",
        INT16 => "int16",
        INT32 => "int32",
        INT64 => "int64",
        FIXEXT1 => "fixext1",
        FIXEXT2 => "fixext2",
        FIXEXT4 => "fixext4",
        FIXEXT8 => "fixext8",
        FIXEXT16 => "fixext16",
        STR8 => "str8",
        STR16 => "str16",
        STR32 => "str32",
        ARRAY16 => "array16",
        ARRAY32 => "array32",
        MAP16 => "map16",
        MAP32 => "map32",
        _ => "invalid",
    }
}
