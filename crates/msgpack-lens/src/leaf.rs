//! Scalar decoders and header/number writers.
//!
//! Readers take the exact byte window of one value (as produced by
//! [`measure`](crate::dispatch::measure)) and check both its family and its
//! length. Writers append a big-endian encoding for a requested prefix and
//! reject prefixes outside their family instead of panicking.

use crate::constants::*;
use crate::dispatch::{classify, LenWidth};
use crate::error::{LensError, Result};

fn check_window(window: &[u8], expected: &'static str, family: fn(u8) -> bool) -> Result<u8> {
    let Some(&lead) = window.first() else {
        return Err(LensError::ShortRead {
            offset: 0,
            needed: 1,
            available: 0,
        });
    };
    if !family(lead) {
        return Err(LensError::TypeMismatch {
            expected,
            prefix: lead,
        });
    }
    let needed = classify(lead).header_len();
    if window.len() != needed {
        return Err(LensError::ShortRead {
            offset: 0,
            needed,
            available: window.len(),
        });
    }
    Ok(lead)
}

fn be<const N: usize>(window: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&window[1..=N]);
    out
}

/// Reads a signed integer (fixint, negative fixint, int8..int64), sign-extended.
pub fn read_int64(window: &[u8]) -> Result<i64> {
    let lead = check_window(window, "int64", |b| {
        is_fixint(b) || is_negative_fixint(b) || (INT8..=INT64).contains(&b)
    })?;
    let value = match lead {
        INT8 => window[1] as i8 as i64,
        INT16 => i16::from_be_bytes(be(window)) as i64,
        INT32 => i32::from_be_bytes(be(window)) as i64,
        INT64 => i64::from_be_bytes(be(window)),
        _ => lead as i8 as i64,
    };
    Ok(value)
}

/// Reads an unsigned integer (fixint, uint8..uint64), zero-extended.
pub fn read_uint64(window: &[u8]) -> Result<u64> {
    let lead = check_window(window, "uint64", |b| is_fixint(b) || (UINT8..=UINT64).contains(&b))?;
    let value = match lead {
        UINT8 => window[1] as u64,
        UINT16 => u16::from_be_bytes(be(window)) as u64,
        UINT32 => u32::from_be_bytes(be(window)) as u64,
        UINT64 => u64::from_be_bytes(be(window)),
        _ => lead as u64,
    };
    Ok(value)
}

pub fn read_float32(window: &[u8]) -> Result<f32> {
    check_window(window, "float32", |b| b == FLOAT32)?;
    Ok(f32::from_be_bytes(be(window)))
}

pub fn read_float64(window: &[u8]) -> Result<f64> {
    check_window(window, "float64", |b| b == FLOAT64)?;
    Ok(f64::from_be_bytes(be(window)))
}

pub fn read_bool(window: &[u8]) -> Result<bool> {
    let lead = check_window(window, "bool", |b| b == TRUE || b == FALSE)?;
    Ok(lead == TRUE)
}

fn put_len(prefix: u8, width: LenWidth, len: usize, out: &mut Vec<u8>) -> Result<()> {
    if len > width.max() {
        return Err(LensError::LengthOverflow { prefix, len });
    }
    out.push(prefix);
    match width {
        LenWidth::U8 => out.push(len as u8),
        LenWidth::U16 => out.extend_from_slice(&(len as u16).to_be_bytes()),
        LenWidth::U32 => out.extend_from_slice(&(len as u32).to_be_bytes()),
    }
    Ok(())
}

fn put_fixed(prefix: u8, family: u8, max: usize, len: usize, out: &mut Vec<u8>) -> Result<()> {
    if len > max {
        return Err(LensError::LengthOverflow { prefix, len });
    }
    out.push(family | len as u8);
    Ok(())
}

/// Writes a str header for a payload of `len` bytes.
pub fn write_str_header(prefix: u8, len: usize, out: &mut Vec<u8>) -> Result<()> {
    match prefix {
        p if is_fixstr(p) => put_fixed(p, FIXSTR, FIXSTR_MAX, len, out),
        STR8 => put_len(prefix, LenWidth::U8, len, out),
        STR16 => put_len(prefix, LenWidth::U16, len, out),
        STR32 => put_len(prefix, LenWidth::U32, len, out),
        _ => Err(LensError::UnsupportedPrefix { prefix }),
    }
}

/// Writes a bin header for a payload of `len` bytes.
pub fn write_bin_header(prefix: u8, len: usize, out: &mut Vec<u8>) -> Result<()> {
    match prefix {
        BIN8 => put_len(prefix, LenWidth::U8, len, out),
        BIN16 => put_len(prefix, LenWidth::U16, len, out),
        BIN32 => put_len(prefix, LenWidth::U32, len, out),
        _ => Err(LensError::UnsupportedPrefix { prefix }),
    }
}

/// Writes an array header for `count` elements.
pub fn write_array_header(prefix: u8, count: usize, out: &mut Vec<u8>) -> Result<()> {
    match prefix {
        p if is_fixarray(p) => put_fixed(p, FIXARRAY, FIXCONTAINER_MAX, count, out),
        ARRAY16 => put_len(prefix, LenWidth::U16, count, out),
        ARRAY32 => put_len(prefix, LenWidth::U32, count, out),
        _ => Err(LensError::UnsupportedPrefix { prefix }),
    }
}

/// Writes a map header for `pairs` key/value pairs.
pub fn write_map_header(prefix: u8, pairs: usize, out: &mut Vec<u8>) -> Result<()> {
    match prefix {
        p if is_fixmap(p) => put_fixed(p, FIXMAP, FIXCONTAINER_MAX, pairs, out),
        MAP16 => put_len(prefix, LenWidth::U16, pairs, out),
        MAP32 => put_len(prefix, LenWidth::U32, pairs, out),
        _ => Err(LensError::UnsupportedPrefix { prefix }),
    }
}

/// Writes `value` at the width and signedness of a signed-int prefix.
///
/// For the fixint families the value is the prefix itself, so it must fall
/// inside the family's range.
pub fn put_int(prefix: u8, value: i64, out: &mut Vec<u8>) -> Result<()> {
    let overflow = || LensError::ValueOutOfRange { prefix };
    match prefix {
        p if is_fixint(p) || is_negative_fixint(p) => {
            if !(-32..=127).contains(&value) {
                return Err(overflow());
            }
            out.push(value as i8 as u8);
        }
        INT8 => {
            let v = i8::try_from(value).map_err(|_| overflow())?;
            out.push(INT8);
            out.push(v as u8);
        }
        INT16 => {
            let v = i16::try_from(value).map_err(|_| overflow())?;
            out.push(INT16);
            out.extend_from_slice(&v.to_be_bytes());
        }
        INT32 => {
            let v = i32::try_from(value).map_err(|_| overflow())?;
            out.push(INT32);
            out.extend_from_slice(&v.to_be_bytes());
        }
        INT64 => {
            out.push(INT64);
            out.extend_from_slice(&value.to_be_bytes());
        }
        _ => return Err(LensError::UnsupportedPrefix { prefix }),
    }
    Ok(())
}

/// Writes `value` at the width of an unsigned-int prefix.
pub fn put_uint(prefix: u8, value: u64, out: &mut Vec<u8>) -> Result<()> {
    let overflow = || LensError::ValueOutOfRange { prefix };
    match prefix {
        p if is_fixint(p) => {
            if value > LAST7 as u64 {
                return Err(overflow());
            }
            out.push(value as u8);
        }
        UINT8 => {
            let v = u8::try_from(value).map_err(|_| overflow())?;
            out.push(UINT8);
            out.push(v);
        }
        UINT16 => {
            let v = u16::try_from(value).map_err(|_| overflow())?;
            out.push(UINT16);
            out.extend_from_slice(&v.to_be_bytes());
        }
        UINT32 => {
            let v = u32::try_from(value).map_err(|_| overflow())?;
            out.push(UINT32);
            out.extend_from_slice(&v.to_be_bytes());
        }
        UINT64 => {
            out.push(UINT64);
            out.extend_from_slice(&value.to_be_bytes());
        }
        _ => return Err(LensError::UnsupportedPrefix { prefix }),
    }
    Ok(())
}

/// Writes a float from its raw IEEE-754 bits. For float32 the bits live in
/// the low 32 bits of `bits`.
pub fn put_float(prefix: u8, bits: u64, out: &mut Vec<u8>) -> Result<()> {
    match prefix {
        FLOAT32 => {
            let v = u32::try_from(bits).map_err(|_| LensError::ValueOutOfRange { prefix })?;
            out.push(FLOAT32);
            out.extend_from_slice(&v.to_be_bytes());
        }
        FLOAT64 => {
            out.push(FLOAT64);
            out.extend_from_slice(&bits.to_be_bytes());
        }
        _ => return Err(LensError::UnsupportedPrefix { prefix }),
    }
    Ok(())
}
