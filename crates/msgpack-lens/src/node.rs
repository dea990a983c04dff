//! In-memory value tree that re-serializes to the exact bytes it was decoded from.
//!
//! Every node remembers the prefix byte it was encoded with. Numeric nodes
//! additionally keep the full 64-bit big-endian bit pattern of the value, so a
//! `uint32` holding `1` re-encodes as `ce 00 00 00 01` rather than `01`.
//!
//! Nodes are built by [`decode`](crate::decode), by the typed JSON codec, or
//! with the canonical constructors on [`Node`] (`Node::str`, `Node::uint`, ...)
//! which pick the smallest encoding for a value.

use std::ops::RangeInclusive;

use crate::constants::*;
use crate::dispatch::{classify, measure};
use crate::error::{LensError, Result};
use crate::leaf;

/// Prefix byte and fixed header length shared by every node variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Common {
    pub prefix: u8,
    pub header_size: usize,
}

impl Common {
    pub fn new(prefix: u8) -> Self {
        Common {
            prefix,
            header_size: classify(prefix).header_len(),
        }
    }
}

fn expect_family(prefix: u8, expected: WireType) -> Result<()> {
    if classify(prefix).wire_type != expected {
        return Err(LensError::UnsupportedPrefix { prefix });
    }
    Ok(())
}

// The fixed families carry their length in the prefix; keep it in step with
// the payload so `prefix()` always matches what `write_to` emits.
fn fit_fixed(prefix: u8, is_family: fn(u8) -> bool, family: u8, max: usize, len: usize) -> Result<u8> {
    if !is_family(prefix) {
        return Ok(prefix);
    }
    if len > max {
        return Err(LensError::LengthOverflow { prefix, len });
    }
    Ok(family | len as u8)
}

fn fit_len(prefix: u8, len: usize) -> Result<()> {
    let width = match classify(prefix).size_mode {
        crate::dispatch::SizeMode::Extra(width) | crate::dispatch::SizeMode::Count(width) => width,
        _ => return Ok(()),
    };
    if len > width.max() {
        return Err(LensError::LengthOverflow { prefix, len });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrNode {
    common: Common,
    value: String,
}

impl StrNode {
    pub fn new(prefix: u8, value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        expect_family(prefix, WireType::Str)?;
        let prefix = fit_fixed(prefix, is_fixstr, FIXSTR, FIXSTR_MAX, value.len())?;
        fit_len(prefix, value.len())?;
        Ok(StrNode {
            common: Common::new(prefix),
            value,
        })
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinNode {
    common: Common,
    value: Vec<u8>,
}

impl BinNode {
    pub fn new(prefix: u8, value: impl Into<Vec<u8>>) -> Result<Self> {
        let value = value.into();
        expect_family(prefix, WireType::Bin)?;
        fit_len(prefix, value.len())?;
        Ok(BinNode {
            common: Common::new(prefix),
            value,
        })
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

fn int_range(prefix: u8) -> Option<RangeInclusive<i64>> {
    match prefix {
        p if is_fixint(p) || is_negative_fixint(p) => {
            let v = p as i8 as i64;
            Some(v..=v)
        }
        INT8 => Some(i8::MIN as i64..=i8::MAX as i64),
        INT16 => Some(i16::MIN as i64..=i16::MAX as i64),
        INT32 => Some(i32::MIN as i64..=i32::MAX as i64),
        INT64 => Some(i64::MIN..=i64::MAX),
        _ => None,
    }
}

fn uint_max(prefix: u8) -> Option<u64> {
    match prefix {
        UINT8 => Some(u8::MAX as u64),
        UINT16 => Some(u16::MAX as u64),
        UINT32 => Some(u32::MAX as u64),
        UINT64 => Some(u64::MAX),
        _ => None,
    }
}

/// Signed integer: fixint, negative fixint or int8..int64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntNode {
    common: Common,
    bits: [u8; 8],
}

impl IntNode {
    /// `value` must fit the prefix's width; a fixint prefix is its own value.
    pub fn new(prefix: u8, value: i64) -> Result<Self> {
        let range = int_range(prefix).ok_or(LensError::UnsupportedPrefix { prefix })?;
        if !range.contains(&value) {
            return Err(LensError::ValueOutOfRange { prefix });
        }
        Ok(IntNode {
            common: Common::new(prefix),
            bits: value.to_be_bytes(),
        })
    }

    pub fn value(&self) -> i64 {
        i64::from_be_bytes(self.bits)
    }

    /// Sign-extended two's-complement bits, big-endian.
    pub fn bits(&self) -> [u8; 8] {
        self.bits
    }
}

/// Unsigned integer: uint8..uint64. Positive fixints are [`IntNode`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UintNode {
    common: Common,
    bits: [u8; 8],
}

impl UintNode {
    pub fn new(prefix: u8, value: u64) -> Result<Self> {
        let max = uint_max(prefix).ok_or(LensError::UnsupportedPrefix { prefix })?;
        if value > max {
            return Err(LensError::ValueOutOfRange { prefix });
        }
        Ok(UintNode {
            common: Common::new(prefix),
            bits: value.to_be_bytes(),
        })
    }

    pub fn value(&self) -> u64 {
        u64::from_be_bytes(self.bits)
    }

    pub fn bits(&self) -> [u8; 8] {
        self.bits
    }
}

/// float32 or float64. A float32's IEEE bits occupy the low 32 bits.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatNode {
    common: Common,
    bits: [u8; 8],
}

impl FloatNode {
    pub fn from_bits(prefix: u8, bits: u64) -> Result<Self> {
        match prefix {
            FLOAT32 if bits > u32::MAX as u64 => Err(LensError::ValueOutOfRange { prefix }),
            FLOAT32 | FLOAT64 => Ok(FloatNode {
                common: Common::new(prefix),
                bits: bits.to_be_bytes(),
            }),
            _ => Err(LensError::UnsupportedPrefix { prefix }),
        }
    }

    pub fn is_float32(&self) -> bool {
        self.common.prefix == FLOAT32
    }

    pub fn raw_bits(&self) -> u64 {
        u64::from_be_bytes(self.bits)
    }

    pub fn bits(&self) -> [u8; 8] {
        self.bits
    }

    /// The value widened to f64.
    pub fn value(&self) -> f64 {
        let raw = self.raw_bits();
        if self.is_float32() {
            f32::from_bits(raw as u32) as f64
        } else {
            f64::from_bits(raw)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoolNode {
    common: Common,
}

impl BoolNode {
    pub fn new(prefix: u8) -> Result<Self> {
        expect_family(prefix, WireType::Bool)?;
        Ok(BoolNode {
            common: Common::new(prefix),
        })
    }

    pub fn value(&self) -> bool {
        self.common.prefix == TRUE
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NilNode {
    common: Common,
}

/// Opaque extension value, stored as its complete wire window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionNode {
    common: Common,
    raw: Vec<u8>,
}

impl ExtensionNode {
    /// `raw` must be exactly one ext8/16/32 or fixext value.
    pub fn new(raw: impl Into<Vec<u8>>) -> Result<Self> {
        let raw = raw.into();
        let measured = measure(&raw)?;
        let prefix = raw[0];
        if classify(prefix).wire_type != WireType::Extension {
            return Err(LensError::TypeMismatch {
                expected: "ext",
                prefix,
            });
        }
        if measured.total > raw.len() {
            return Err(LensError::ShortRead {
                offset: 0,
                needed: measured.total,
                available: raw.len(),
            });
        }
        if measured.total < raw.len() {
            return Err(LensError::TrailingData {
                offset: measured.total,
                remaining: raw.len() - measured.total,
            });
        }
        Ok(ExtensionNode {
            common: Common::new(prefix),
            raw,
        })
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Application-defined type byte.
    pub fn ext_type(&self) -> i8 {
        self.raw[self.common.header_size - 1] as i8
    }

    pub fn data(&self) -> &[u8] {
        &self.raw[self.common.header_size..]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayNode {
    common: Common,
    children: Vec<Node>,
}

impl ArrayNode {
    pub fn new(prefix: u8, children: Vec<Node>) -> Result<Self> {
        expect_family(prefix, WireType::Array)?;
        let prefix = fit_fixed(prefix, is_fixarray, FIXARRAY, FIXCONTAINER_MAX, children.len())?;
        fit_len(prefix, children.len())?;
        Ok(ArrayNode {
            common: Common::new(prefix),
            children,
        })
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }
}

/// Map in wire order. Keys may repeat and need not be strings.
#[derive(Debug, Clone, PartialEq)]
pub struct MapNode {
    common: Common,
    entries: Vec<(Node, Node)>,
}

impl MapNode {
    pub fn new(prefix: u8, entries: Vec<(Node, Node)>) -> Result<Self> {
        expect_family(prefix, WireType::Map)?;
        let prefix = fit_fixed(prefix, is_fixmap, FIXMAP, FIXCONTAINER_MAX, entries.len())?;
        fit_len(prefix, entries.len())?;
        Ok(MapNode {
            common: Common::new(prefix),
            entries,
        })
    }

    pub fn entries(&self) -> &[(Node, Node)] {
        &self.entries
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Str(StrNode),
    Bin(BinNode),
    Int(IntNode),
    Uint(UintNode),
    Float(FloatNode),
    Bool(BoolNode),
    Nil(NilNode),
    Extension(ExtensionNode),
    Array(ArrayNode),
    Map(MapNode),
}

fn str_prefix(len: usize) -> u8 {
    if len <= FIXSTR_MAX {
        FIXSTR | len as u8
    } else if len <= u8::MAX as usize {
        STR8
    } else if len <= u16::MAX as usize {
        STR16
    } else {
        STR32
    }
}

fn bin_prefix(len: usize) -> u8 {
    if len <= u8::MAX as usize {
        BIN8
    } else if len <= u16::MAX as usize {
        BIN16
    } else {
        BIN32
    }
}

fn container_prefix(fixed: u8, wide16: u8, wide32: u8, count: usize) -> u8 {
    if count <= FIXCONTAINER_MAX {
        fixed | count as u8
    } else if count <= u16::MAX as usize {
        wide16
    } else {
        wide32
    }
}

impl Node {
    /// String with the smallest str header for its length.
    pub fn str(value: impl Into<String>) -> Result<Node> {
        let value = value.into();
        StrNode::new(str_prefix(value.len()), value).map(Node::Str)
    }

    pub fn bin(value: impl Into<Vec<u8>>) -> Result<Node> {
        let value = value.into();
        BinNode::new(bin_prefix(value.len()), value).map(Node::Bin)
    }

    /// Smallest signed encoding: fixint, negative fixint, then int8..int64.
    pub fn int(value: i64) -> Node {
        let prefix = if (0..=LAST7 as i64).contains(&value) || (-32..0).contains(&value) {
            value as i8 as u8
        } else if i8::try_from(value).is_ok() {
            INT8
        } else if i16::try_from(value).is_ok() {
            INT16
        } else if i32::try_from(value).is_ok() {
            INT32
        } else {
            INT64
        };
        Node::Int(IntNode {
            common: Common::new(prefix),
            bits: value.to_be_bytes(),
        })
    }

    /// Smallest unsigned encoding. Values up to 127 become a positive fixint,
    /// which is an [`IntNode`].
    pub fn uint(value: u64) -> Node {
        if value <= LAST7 as u64 {
            return Node::int(value as i64);
        }
        let prefix = if value <= u8::MAX as u64 {
            UINT8
        } else if value <= u16::MAX as u64 {
            UINT16
        } else if value <= u32::MAX as u64 {
            UINT32
        } else {
            UINT64
        };
        Node::Uint(UintNode {
            common: Common::new(prefix),
            bits: value.to_be_bytes(),
        })
    }

    pub fn float64(value: f64) -> Node {
        Node::Float(FloatNode {
            common: Common::new(FLOAT64),
            bits: value.to_bits().to_be_bytes(),
        })
    }

    pub fn float32(value: f32) -> Node {
        Node::Float(FloatNode {
            common: Common::new(FLOAT32),
            bits: (value.to_bits() as u64).to_be_bytes(),
        })
    }

    pub fn bool(value: bool) -> Node {
        Node::Bool(BoolNode {
            common: Common::new(if value { TRUE } else { FALSE }),
        })
    }

    pub fn nil() -> Node {
        Node::Nil(NilNode {
            common: Common::new(NIL),
        })
    }

    pub fn array(children: Vec<Node>) -> Result<Node> {
        let prefix = container_prefix(FIXARRAY, ARRAY16, ARRAY32, children.len());
        ArrayNode::new(prefix, children).map(Node::Array)
    }

    pub fn map(entries: Vec<(Node, Node)>) -> Result<Node> {
        let prefix = container_prefix(FIXMAP, MAP16, MAP32, entries.len());
        MapNode::new(prefix, entries).map(Node::Map)
    }

    pub fn extension(raw: impl Into<Vec<u8>>) -> Result<Node> {
        ExtensionNode::new(raw).map(Node::Extension)
    }

    fn common(&self) -> &Common {
        match self {
            Node::Str(n) => &n.common,
            Node::Bin(n) => &n.common,
            Node::Int(n) => &n.common,
            Node::Uint(n) => &n.common,
            Node::Float(n) => &n.common,
            Node::Bool(n) => &n.common,
            Node::Nil(n) => &n.common,
            Node::Extension(n) => &n.common,
            Node::Array(n) => &n.common,
            Node::Map(n) => &n.common,
        }
    }

    pub fn prefix(&self) -> u8 {
        self.common().prefix
    }

    pub fn wire_type(&self) -> WireType {
        classify(self.prefix()).wire_type
    }

    pub fn header_size(&self) -> usize {
        self.common().header_size
    }

    /// Encoded length in bytes, children included.
    pub fn total_size(&self) -> usize {
        let header = self.header_size();
        match self {
            Node::Str(n) => header + n.value.len(),
            Node::Bin(n) => header + n.value.len(),
            Node::Extension(n) => n.raw.len(),
            Node::Array(n) => header + n.children.iter().map(Node::total_size).sum::<usize>(),
            Node::Map(n) => {
                header
                    + n.entries
                        .iter()
                        .map(|(k, v)| k.total_size() + v.total_size())
                        .sum::<usize>()
            }
            _ => header,
        }
    }

    /// Appends the node's encoding to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        let prefix = self.prefix();
        match self {
            Node::Str(n) => {
                leaf::write_str_header(prefix, n.value.len(), out)?;
                out.extend_from_slice(n.value.as_bytes());
            }
            Node::Bin(n) => {
                leaf::write_bin_header(prefix, n.value.len(), out)?;
                out.extend_from_slice(&n.value);
            }
            Node::Int(n) => leaf::put_int(prefix, n.value(), out)?,
            Node::Uint(n) => leaf::put_uint(prefix, n.value(), out)?,
            Node::Float(n) => leaf::put_float(prefix, n.raw_bits(), out)?,
            Node::Bool(_) | Node::Nil(_) => out.push(prefix),
            Node::Extension(n) => out.extend_from_slice(&n.raw),
            Node::Array(n) => {
                leaf::write_array_header(prefix, n.children.len(), out)?;
                for child in &n.children {
                    child.write_to(out)?;
                }
            }
            Node::Map(n) => {
                leaf::write_map_header(prefix, n.entries.len(), out)?;
                for (key, value) in &n.entries {
                    key.write_to(out)?;
                    value.write_to(out)?;
                }
            }
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.total_size());
        self.write_to(&mut out)?;
        Ok(out)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Str(n) => Some(&n.value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Node]> {
        match self {
            Node::Array(n) => Some(&n.children),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Node, Node)]> {
        match self {
            Node::Map(n) => Some(&n.entries),
            _ => None,
        }
    }
}
