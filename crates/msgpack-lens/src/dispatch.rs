//! Leading-byte dispatch table.
//!
//! Every possible first byte of an encoded value maps to a [`DispatchEntry`]
//! describing its wire type, the size of its fixed header and how the rest of
//! the value's length is found. The table is built once, at compile time, by
//! [`build_table`]; the fixed families are filled from their bit-mask ranges.

use crate::constants::*;
use crate::error::{LensError, Result};

/// Width of a big-endian length or count field following the prefix byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LenWidth {
    U8,
    U16,
    U32,
}

impl LenWidth {
    pub const fn bytes(self) -> usize {
        match self {
            LenWidth::U8 => 1,
            LenWidth::U16 => 2,
            LenWidth::U32 => 4,
        }
    }

    /// Largest length this field can express.
    pub const fn max(self) -> usize {
        match self {
            LenWidth::U8 => u8::MAX as usize,
            LenWidth::U16 => u16::MAX as usize,
            LenWidth::U32 => u32::MAX as usize,
        }
    }

    /// Reads the field from `b`, which must hold at least `self.bytes()` bytes.
    fn read(self, b: &[u8]) -> usize {
        match self {
            LenWidth::U8 => b[0] as usize,
            LenWidth::U16 => u16::from_be_bytes([b[0], b[1]]) as usize,
            LenWidth::U32 => u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as usize,
        }
    }
}

/// How the total length of a value is obtained once its prefix is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeMode {
    /// The header is the whole value.
    Constant,
    /// A length field follows the prefix; that many payload bytes follow the header.
    Extra(LenWidth),
    /// A container element count follows the prefix.
    Count(LenWidth),
    /// The byte or element count lives in the low bits of the prefix.
    Inline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchEntry {
    /// Bytes of fixed prefix, including the leading byte. Zero marks an invalid entry.
    pub header_size: u8,
    pub size_mode: SizeMode,
    pub wire_type: WireType,
}

impl DispatchEntry {
    pub const INVALID: DispatchEntry = DispatchEntry {
        header_size: 0,
        size_mode: SizeMode::Constant,
        wire_type: WireType::Invalid,
    };

    const fn new(header_size: u8, size_mode: SizeMode, wire_type: WireType) -> Self {
        DispatchEntry {
            header_size,
            size_mode,
            wire_type,
        }
    }

    pub const fn is_valid(&self) -> bool {
        self.header_size != 0 && !matches!(self.wire_type, WireType::Invalid)
    }

    pub const fn header_len(&self) -> usize {
        self.header_size as usize
    }
}

/// Result of [`measure`]: how many bytes the value's own encoding spans and,
/// for containers, how many child values follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measure {
    /// Header plus any inline payload. Container children are not included.
    pub total: usize,
    /// Child values to visit: the element count for arrays, twice the pair
    /// count for maps, zero for scalars.
    pub elements: usize,
}

static TABLE: [DispatchEntry; 256] = build_table();

const fn build_table() -> [DispatchEntry; 256] {
    use SizeMode::*;
    use WireType::*;

    let mut table = [DispatchEntry::INVALID; 256];
    let mut i = 0;
    while i < 256 {
        let b = i as u8;
        table[i] = if is_fixint(b) || is_negative_fixint(b) {
            DispatchEntry::new(1, Constant, Int)
        } else if is_fixmap(b) {
            DispatchEntry::new(1, Inline, Map)
        } else if is_fixarray(b) {
            DispatchEntry::new(1, Inline, Array)
        } else if is_fixstr(b) {
            DispatchEntry::new(1, Inline, Str)
        } else {
            match b {
                NIL => DispatchEntry::new(1, Constant, Nil),
                FALSE | TRUE => DispatchEntry::new(1, Constant, Bool),
                BIN8 => DispatchEntry::new(2, Extra(LenWidth::U8), Bin),
                BIN16 => DispatchEntry::new(3, Extra(LenWidth::U16), Bin),
                BIN32 => DispatchEntry::new(5, Extra(LenWidth::U32), Bin),
                // ext headers include the one-byte extension type
                EXT8 => DispatchEntry::new(3, Extra(LenWidth::U8), Extension),
                EXT16 => DispatchEntry::new(4, Extra(LenWidth::U16), Extension),
                EXT32 => DispatchEntry::new(6, Extra(LenWidth::U32), Extension),
                FLOAT32 => DispatchEntry::new(5, Constant, Float32),
                FLOAT64 => DispatchEntry::new(9, Constant, Float64),
                UINT8 => DispatchEntry::new(2, Constant, Uint),
                UINT16 => DispatchEntry::new(3, Constant, Uint),
                UINT32 => DispatchEntry::new(5, Constant, Uint),
                UINT64 => DispatchEntry::new(9, Constant, Uint),
                INT8 => DispatchEntry::new(2, Constant, Int),
                INT16 => DispatchEntry::new(3, Constant, Int),
                INT32 => DispatchEntry::new(5, Constant, Int),
                INT64 => DispatchEntry::new(9, Constant, Int),
                FIXEXT1 => DispatchEntry::new(3, Constant, Extension),
                FIXEXT2 => DispatchEntry::new(4, Constant, Extension),
                FIXEXT4 => DispatchEntry::new(6, Constant, Extension),
                FIXEXT8 => DispatchEntry::new(10, Constant, Extension),
                FIXEXT16 => DispatchEntry::new(18, Constant, Extension),
                STR8 => DispatchEntry::new(2, Extra(LenWidth::U8), Str),
                STR16 => DispatchEntry::new(3, Extra(LenWidth::U16), Str),
                STR32 => DispatchEntry::new(5, Extra(LenWidth::U32), Str),
                ARRAY16 => DispatchEntry::new(3, Count(LenWidth::U16), Array),
                ARRAY32 => DispatchEntry::new(5, Count(LenWidth::U32), Array),
                MAP16 => DispatchEntry::new(3, Count(LenWidth::U16), Map),
                MAP32 => DispatchEntry::new(5, Count(LenWidth::U32), Map),
                _ => DispatchEntry::INVALID,
            }
        };
        i += 1;
    }
    table
}

/// Looks up the dispatch entry for a leading byte.
#[inline]
pub fn classify(prefix: u8) -> DispatchEntry {
    TABLE[prefix as usize]
}

#[inline]
pub fn wire_type(prefix: u8) -> WireType {
    TABLE[prefix as usize].wire_type
}

/// Measures the value starting at `bytes[0]`.
pub fn measure(bytes: &[u8]) -> Result<Measure> {
    measure_at(bytes, 0)
}

/// Like [`measure`], reporting errors at absolute position `offset`.
pub fn measure_at(bytes: &[u8], offset: usize) -> Result<Measure> {
    let Some(&lead) = bytes.first() else {
        return Err(LensError::ShortRead {
            offset,
            needed: 1,
            available: 0,
        });
    };
    let entry = classify(lead);
    if !entry.is_valid() {
        return Err(LensError::InvalidPrefix {
            offset,
            prefix: lead,
        });
    }
    let header = entry.header_len();
    if bytes.len() < header {
        return Err(LensError::ShortRead {
            offset,
            needed: header,
            available: bytes.len(),
        });
    }

    let measured = match entry.size_mode {
        SizeMode::Constant => Measure {
            total: header,
            elements: 0,
        },
        SizeMode::Extra(width) => Measure {
            total: header.saturating_add(width.read(&bytes[1..])),
            elements: 0,
        },
        SizeMode::Count(width) => {
            let count = width.read(&bytes[1..]);
            Measure {
                total: header,
                elements: element_slots(entry.wire_type, count),
            }
        }
        SizeMode::Inline => match entry.wire_type {
            WireType::Str => Measure {
                total: header + (lead & LAST5) as usize,
                elements: 0,
            },
            kind => Measure {
                total: header,
                elements: element_slots(kind, (lead & LAST4) as usize),
            },
        },
    };
    Ok(measured)
}

// Traversal treats a map's key and value as two sequential elements.
fn element_slots(kind: WireType, count: usize) -> usize {
    match kind {
        WireType::Map => count.saturating_mul(2),
        _ => count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_total_and_only_c1_is_invalid() {
        for b in 0..=255u8 {
            let entry = classify(b);
            assert_eq!(entry.is_valid(), b != NEVER_USED, "byte 0x{b:02x}");
            assert_eq!(entry, classify(b));
        }
    }

    #[test]
    fn fixed_families() {
        for b in 0x00..=0x7fu8 {
            assert_eq!(wire_type(b), WireType::Int);
        }
        for b in 0xe0..=0xffu8 {
            assert_eq!(wire_type(b), WireType::Int);
        }
        for b in 0x80..=0x8fu8 {
            assert_eq!(classify(b).size_mode, SizeMode::Inline);
            assert_eq!(wire_type(b), WireType::Map);
        }
        for b in 0x90..=0x9fu8 {
            assert_eq!(wire_type(b), WireType::Array);
        }
        for b in 0xa0..=0xbfu8 {
            assert_eq!(wire_type(b), WireType::Str);
        }
    }

    #[test]
    fn measure_scalars() {
        assert_eq!(measure(&[0x01]).unwrap(), Measure { total: 1, elements: 0 });
        assert_eq!(
            measure(&[0xa3, b'k', b'e', b'y']).unwrap(),
            Measure { total: 4, elements: 0 }
        );
        assert_eq!(
            measure(&[BIN16, 0x01, 0x00]).unwrap(),
            Measure { total: 3 + 256, elements: 0 }
        );
        assert_eq!(
            measure(&[EXT8, 0x02, 0x05, 0xaa, 0xbb]).unwrap(),
            Measure { total: 5, elements: 0 }
        );
        assert_eq!(measure(&[FIXEXT16]).unwrap_err().to_string(), "short read at 0: need 18 bytes, have 1");
    }

    #[test]
    fn measure_containers() {
        assert_eq!(measure(&[0x92]).unwrap(), Measure { total: 1, elements: 2 });
        assert_eq!(measure(&[0x83]).unwrap(), Measure { total: 1, elements: 6 });
        assert_eq!(
            measure(&[ARRAY16, 0x01, 0x00]).unwrap(),
            Measure { total: 3, elements: 256 }
        );
        assert_eq!(
            measure(&[MAP32, 0x00, 0x00, 0x00, 0x03]).unwrap(),
            Measure { total: 5, elements: 6 }
        );
    }

    #[test]
    fn measure_failures() {
        assert!(matches!(
            measure(&[]),
            Err(LensError::ShortRead { needed: 1, available: 0, .. })
        ));
        assert!(matches!(
            measure_at(&[NEVER_USED], 7),
            Err(LensError::InvalidPrefix { offset: 7, prefix: 0xc1 })
        ));
        assert!(matches!(
            measure(&[FLOAT64, 0x00, 0x00]),
            Err(LensError::ShortRead { needed: 9, available: 3, .. })
        ));
        assert!(matches!(
            measure(&[STR16, 0x00]),
            Err(LensError::ShortRead { needed: 3, available: 2, .. })
        ));
    }
}
