//! Lossy JSON rendering of MessagePack, and back.
//!
//! Numeric width, bin/str distinctions and extension types do not survive
//! this projection; use [`repr_json`](crate::repr_json) when they must.

use serde_json::Value;

use crate::error::{LensError, Result};
use crate::node::Node;
use crate::stack::{guarded, json_nesting, with_stack_for};
use crate::walker::{walk_with, Visitor, WalkContext, WalkOptions, DEFAULT_MAX_DEPTH};

/// Visitor writing compact JSON text.
///
/// Bin and extension payloads are written as strings of their bytes, with
/// invalid UTF-8 replaced. Map keys that are not strings are rendered and
/// then quoted, so `{1: 2}` becomes `{"1":2}`.
#[derive(Debug, Default)]
pub struct JsonEncoder {
    buf: Vec<u8>,
    /// Buffer offsets where currently open map keys started.
    keys: Vec<usize>,
}

impl JsonEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_string(self) -> String {
        match String::from_utf8(self.buf) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        }
    }

    fn write_str(&mut self, value: &str) -> Result<()> {
        serde_json::to_writer(&mut self.buf, value)?;
        Ok(())
    }

    fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.write_str(&String::from_utf8_lossy(value))
    }
}

impl Visitor for JsonEncoder {
    fn str(&mut self, _ctx: &WalkContext<'_>, _bts: &[u8], value: &str) -> Result<()> {
        self.write_str(value)
    }

    fn bin(&mut self, _ctx: &WalkContext<'_>, _bts: &[u8], value: &[u8]) -> Result<()> {
        self.write_bytes(value)
    }

    fn int(&mut self, _ctx: &WalkContext<'_>, _bts: &[u8], value: i64) -> Result<()> {
        serde_json::to_writer(&mut self.buf, &value)?;
        Ok(())
    }

    fn uint(&mut self, _ctx: &WalkContext<'_>, _bts: &[u8], value: u64) -> Result<()> {
        serde_json::to_writer(&mut self.buf, &value)?;
        Ok(())
    }

    fn float32(&mut self, _ctx: &WalkContext<'_>, _bts: &[u8], value: f32) -> Result<()> {
        if !value.is_finite() {
            return Err(LensError::NonFiniteFloat(value as f64));
        }
        serde_json::to_writer(&mut self.buf, &value)?;
        Ok(())
    }

    fn float64(&mut self, _ctx: &WalkContext<'_>, _bts: &[u8], value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(LensError::NonFiniteFloat(value));
        }
        serde_json::to_writer(&mut self.buf, &value)?;
        Ok(())
    }

    fn bool(&mut self, _ctx: &WalkContext<'_>, _bts: &[u8], value: bool) -> Result<()> {
        let text: &[u8] = if value { b"true" } else { b"false" };
        self.buf.extend_from_slice(text);
        Ok(())
    }

    fn nil(&mut self, _ctx: &WalkContext<'_>, _prefix: u8) -> Result<()> {
        self.buf.extend_from_slice(b"null");
        Ok(())
    }

    fn extension(&mut self, _ctx: &WalkContext<'_>, bts: &[u8]) -> Result<()> {
        self.write_bytes(bts)
    }

    fn enter_array(&mut self, _ctx: &WalkContext<'_>, _prefix: u8, _count: usize) -> Result<()> {
        self.buf.push(b'[');
        Ok(())
    }

    fn leave_array_elem(&mut self, _ctx: &WalkContext<'_>, n: usize, count: usize) -> Result<()> {
        if n + 1 < count {
            self.buf.push(b',');
        }
        Ok(())
    }

    fn leave_array(
        &mut self,
        _ctx: &WalkContext<'_>,
        _prefix: u8,
        _count: usize,
        _bts: &[u8],
    ) -> Result<()> {
        self.buf.push(b']');
        Ok(())
    }

    fn enter_map(&mut self, _ctx: &WalkContext<'_>, _prefix: u8, _count: usize) -> Result<()> {
        self.buf.push(b'{');
        Ok(())
    }

    fn enter_map_key(&mut self, _ctx: &WalkContext<'_>, _n: usize, _count: usize) -> Result<()> {
        self.keys.push(self.buf.len());
        Ok(())
    }

    fn leave_map_key(&mut self, _ctx: &WalkContext<'_>, _n: usize, _count: usize) -> Result<()> {
        let Some(start) = self.keys.pop() else {
            return Err(LensError::malformed("map key closed without a matching open"));
        };
        if self.buf.get(start) != Some(&b'"') {
            let rendered = self.buf.split_off(start);
            self.write_bytes(&rendered)?;
        }
        self.buf.push(b':');
        Ok(())
    }

    fn leave_map_elem(&mut self, _ctx: &WalkContext<'_>, n: usize, count: usize) -> Result<()> {
        if n + 1 < count {
            self.buf.push(b',');
        }
        Ok(())
    }

    fn leave_map(
        &mut self,
        _ctx: &WalkContext<'_>,
        _prefix: u8,
        _count: usize,
        _bts: &[u8],
    ) -> Result<()> {
        self.buf.push(b'}');
        Ok(())
    }
}

/// Renders the value in `bytes` as compact JSON.
pub fn to_json(bytes: &[u8], options: &WalkOptions) -> Result<String> {
    let mut encoder = JsonEncoder::new();
    walk_with(bytes, &mut encoder, options)?;
    Ok(encoder.into_string())
}

/// Parses one JSON document with serde_json's recursion limit lifted. Run
/// it on a stack sized with [`with_stack_for`].
pub(crate) fn read_document(text: &str, allow_extra: bool) -> Result<Value> {
    let mut de = serde_json::Deserializer::from_str(text);
    de.disable_recursion_limit();
    let mut stream = de.into_iter::<Value>();
    let value = match stream.next() {
        Some(value) => value?,
        None => return Err(LensError::malformed("empty JSON document")),
    };
    let offset = stream.byte_offset();
    if !allow_extra && !text[offset..].trim().is_empty() {
        return Err(LensError::TrailingData {
            offset,
            remaining: text.len() - offset,
        });
    }
    Ok(value)
}

/// Parses JSON text into a [`Node`] using the smallest encoding for every
/// value. Integers pick the narrowest of fixint, negative fixint,
/// uint8..uint64 and int8..int64; other numbers become float64. Object keys
/// keep their textual order.
pub fn from_json(text: &str, allow_extra: bool) -> Result<Node> {
    from_json_with(
        text,
        &WalkOptions::default().with_allow_trailing_data(allow_extra),
    )
}

/// [`from_json`] with arrays and objects nested at most
/// `options.max_depth` deep, the same bound the walker applies.
pub fn from_json_with(text: &str, options: &WalkOptions) -> Result<Node> {
    let limit = options.max_depth;
    let levels = json_nesting(text, true, limit)
        .map_err(|offset| LensError::DepthLimit { offset, limit })?;
    with_stack_for(levels, || {
        let value = read_document(text, options.allow_trailing_data)?;
        convert(&value, 0, limit)
    })
}

pub fn value_to_node(value: &Value) -> Result<Node> {
    convert(value, 0, DEFAULT_MAX_DEPTH)
}

fn convert(value: &Value, depth: usize, limit: usize) -> Result<Node> {
    if matches!(value, Value::Array(_) | Value::Object(_)) && depth >= limit {
        return Err(LensError::DepthLimit { offset: 0, limit });
    }
    let node = match value {
        Value::Null => Node::nil(),
        Value::Bool(b) => Node::bool(*b),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Node::uint(u)
            } else if let Some(i) = n.as_i64() {
                Node::int(i)
            } else {
                let f = n
                    .as_f64()
                    .ok_or_else(|| LensError::malformed(format!("unrepresentable number {n}")))?;
                Node::float64(f)
            }
        }
        Value::String(s) => Node::str(s.as_str())?,
        Value::Array(items) => {
            let children = items
                .iter()
                .map(|item| guarded(|| convert(item, depth + 1, limit)))
                .collect::<Result<_>>()?;
            Node::array(children)?
        }
        Value::Object(obj) => {
            let entries = obj
                .iter()
                .map(|(k, v)| -> Result<(Node, Node)> {
                    let value = guarded(|| convert(v, depth + 1, limit))?;
                    Ok((Node::str(k.as_str())?, value))
                })
                .collect::<Result<_>>()?;
            Node::map(entries)?
        }
    };
    Ok(node)
}
