//! Typed JSON: a lossless JSON rendering of a [`Node`] tree.
//!
//! Each node becomes an object carrying its `Prefix` and a `Size` (header
//! bytes), plus variant fields:
//!
//! | variant   | fields                                         |
//! |-----------|------------------------------------------------|
//! | str       | `Value` (string)                               |
//! | bin       | `Value` (Base64)                               |
//! | int/uint  | `Bits` (Base64, 8 bytes big-endian), `Approx`  |
//! | float     | `Bits` (Base64, 8 bytes big-endian), `Approx`  |
//! | bool      | `Value`                                        |
//! | ext       | `Contents` (Base64 of the whole wire window)   |
//! | array     | `Children`                                     |
//! | map       | `Values`: `[{"Key": .., "Value": ..}]`          |
//!
//! Empty `Children`/`Values` are omitted. On decode `Size` is ignored and
//! recomputed from the prefix. `Bits` takes precedence over `Approx`, so a
//! hand-written document may give only `Approx`. A fixstr, fixarray or
//! fixmap prefix must agree with the length it holds.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde_json::{Map, Number, Value};

use crate::constants::*;
use crate::dispatch::classify;
use crate::error::{LensError, Result};
use crate::json::read_document;
use crate::node::*;
use crate::stack::{guarded, json_nesting, with_stack_for};
use crate::walker::{WalkOptions, DEFAULT_MAX_DEPTH};

pub fn to_repr(node: &Node) -> Value {
    render(node, 1, &mut 0)
}

/// Builds the object for `node` at JSON nesting `level`, recording the
/// deepest level reached in `deepest`.
fn render(node: &Node, level: usize, deepest: &mut usize) -> Value {
    *deepest = (*deepest).max(level);
    let mut obj = Map::new();
    obj.insert("Prefix".into(), Value::from(node.prefix()));
    obj.insert("Size".into(), Value::from(node.header_size()));
    match node {
        Node::Str(n) => {
            obj.insert("Value".into(), Value::from(n.value()));
        }
        Node::Bin(n) => {
            obj.insert("Value".into(), BASE64_STANDARD.encode(n.value()).into());
        }
        Node::Int(n) => {
            obj.insert("Bits".into(), BASE64_STANDARD.encode(n.bits()).into());
            obj.insert("Approx".into(), Value::from(n.value()));
        }
        Node::Uint(n) => {
            obj.insert("Bits".into(), BASE64_STANDARD.encode(n.bits()).into());
            obj.insert("Approx".into(), Value::from(n.value()));
        }
        Node::Float(n) => {
            obj.insert("Bits".into(), BASE64_STANDARD.encode(n.bits()).into());
            let approx = Number::from_f64(n.value()).map_or(Value::Null, Value::Number);
            obj.insert("Approx".into(), approx);
        }
        Node::Bool(n) => {
            obj.insert("Value".into(), Value::from(n.value()));
        }
        Node::Nil(_) => {}
        Node::Extension(n) => {
            obj.insert("Contents".into(), BASE64_STANDARD.encode(n.raw()).into());
        }
        Node::Array(n) => {
            if !n.children().is_empty() {
                let children = n
                    .children()
                    .iter()
                    .map(|child| guarded(|| render(child, level + 2, deepest)))
                    .collect();
                obj.insert("Children".into(), Value::Array(children));
            }
        }
        Node::Map(n) => {
            if !n.entries().is_empty() {
                let values = n
                    .entries()
                    .iter()
                    .map(|(k, v)| {
                        let mut pair = Map::new();
                        pair.insert("Key".into(), guarded(|| render(k, level + 3, deepest)));
                        pair.insert("Value".into(), guarded(|| render(v, level + 3, deepest)));
                        Value::Object(pair)
                    })
                    .collect();
                obj.insert("Values".into(), Value::Array(values));
            }
        }
    }
    Value::Object(obj)
}

pub fn to_repr_string(node: &Node, pretty: bool) -> Result<String> {
    let mut deepest = 0;
    let value = render(node, 1, &mut deepest);
    with_stack_for(deepest, move || -> Result<String> {
        let text = if pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(text)
    })
}

/// Parses one typed JSON document. Anything but whitespace after it is
/// [`LensError::TrailingData`] unless `allow_extra` is set.
pub fn from_repr_str(text: &str, allow_extra: bool) -> Result<Node> {
    from_repr_str_with(
        text,
        &WalkOptions::default().with_allow_trailing_data(allow_extra),
    )
}

/// [`from_repr_str`] with containers nested at most `options.max_depth`
/// deep, the same bound the walker applies to the encoded bytes.
pub fn from_repr_str_with(text: &str, options: &WalkOptions) -> Result<Node> {
    let limit = options.max_depth;
    // each container's children sit in one `Children` or `Values` array
    let levels = json_nesting(text, false, limit)
        .map_err(|offset| LensError::DepthLimit { offset, limit })?;
    with_stack_for(levels, || {
        let value = read_document(text, options.allow_trailing_data)?;
        read_node(&value, 0, limit)
    })
}

pub fn from_repr(value: &Value) -> Result<Node> {
    read_node(value, 0, DEFAULT_MAX_DEPTH)
}

/// Node constructors reject values that do not fit the stored prefix; in a
/// document that is a malformed representation.
fn invalid(err: LensError) -> LensError {
    LensError::malformed(err.to_string())
}

fn read_node(value: &Value, depth: usize, limit: usize) -> Result<Node> {
    let obj = value
        .as_object()
        .ok_or_else(|| LensError::malformed("node must be an object"))?;
    let prefix = read_prefix(obj)?;

    let node = match classify(prefix).wire_type {
        WireType::Str => {
            let text = field(obj, "Value")?
                .as_str()
                .ok_or_else(|| LensError::malformed("str Value must be a string"))?;
            Node::Str(StrNode::new(prefix, text).map_err(invalid)?)
        }
        WireType::Bin => {
            Node::Bin(BinNode::new(prefix, base64_field(obj, "Value")?).map_err(invalid)?)
        }
        WireType::Int => {
            let value = match (bits_field(obj)?, obj.get("Approx")) {
                (Some(bits), _) => i64::from_be_bytes(bits),
                (None, Some(approx)) => approx
                    .as_i64()
                    .ok_or_else(|| LensError::malformed("int Approx must be an integer"))?,
                // fixints carry their value in the prefix
                (None, None) if is_fixint(prefix) || is_negative_fixint(prefix) => {
                    prefix as i8 as i64
                }
                (None, None) => return Err(LensError::malformed("missing Approx")),
            };
            Node::Int(IntNode::new(prefix, value).map_err(invalid)?)
        }
        WireType::Uint => {
            let value = match bits_field(obj)? {
                Some(bits) => u64::from_be_bytes(bits),
                None => field(obj, "Approx")?
                    .as_u64()
                    .ok_or_else(|| LensError::malformed("uint Approx must be an unsigned integer"))?,
            };
            Node::Uint(UintNode::new(prefix, value).map_err(invalid)?)
        }
        WireType::Float32 | WireType::Float64 => {
            let bits = match bits_field(obj)? {
                Some(bits) => u64::from_be_bytes(bits),
                None => {
                    let approx = field(obj, "Approx")?
                        .as_f64()
                        .ok_or_else(|| LensError::malformed("float Approx must be a number"))?;
                    if prefix == FLOAT32 {
                        (approx as f32).to_bits() as u64
                    } else {
                        approx.to_bits()
                    }
                }
            };
            Node::Float(FloatNode::from_bits(prefix, bits).map_err(invalid)?)
        }
        WireType::Bool => {
            let node = BoolNode::new(prefix).map_err(invalid)?;
            if let Some(value) = obj.get("Value") {
                if value.as_bool() != Some(node.value()) {
                    return Err(LensError::malformed(format!(
                        "bool Value {value} disagrees with prefix 0x{prefix:02x}"
                    )));
                }
            }
            Node::Bool(node)
        }
        WireType::Nil => Node::nil(),
        WireType::Extension => {
            let raw = base64_field(obj, "Contents")?;
            if raw.first() != Some(&prefix) {
                return Err(LensError::malformed(format!(
                    "ext Contents must start with prefix 0x{prefix:02x}"
                )));
            }
            let node = ExtensionNode::new(raw)
                .map_err(|err| LensError::malformed(format!("ext Contents: {err}")))?;
            Node::Extension(node)
        }
        WireType::Array => {
            if depth >= limit {
                return Err(LensError::DepthLimit { offset: 0, limit });
            }
            let children = match obj.get("Children") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items
                    .iter()
                    .map(|item| guarded(|| read_node(item, depth + 1, limit)))
                    .collect::<Result<_>>()?,
                Some(_) => return Err(LensError::malformed("Children must be an array")),
            };
            Node::Array(ArrayNode::new(prefix, children).map_err(invalid)?)
        }
        WireType::Map => {
            if depth >= limit {
                return Err(LensError::DepthLimit { offset: 0, limit });
            }
            let entries = match obj.get("Values") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items
                    .iter()
                    .map(|item| guarded(|| read_pair(item, depth + 1, limit)))
                    .collect::<Result<_>>()?,
                Some(_) => return Err(LensError::malformed("Values must be an array")),
            };
            Node::Map(MapNode::new(prefix, entries).map_err(invalid)?)
        }
        WireType::Invalid => {
            return Err(LensError::malformed(format!("unknown type for prefix 0x{prefix:02x}")))
        }
    };
    // fixstr, fixarray and fixmap prefixes carry the length themselves
    if node.prefix() != prefix {
        return Err(LensError::malformed(format!(
            "prefix 0x{prefix:02x} does not match its content length"
        )));
    }
    Ok(node)
}

fn read_prefix(obj: &Map<String, Value>) -> Result<u8> {
    let raw = obj
        .get("Prefix")
        .ok_or_else(|| LensError::malformed("missing Prefix"))?;
    let Some(n) = raw.as_i64() else {
        return Err(LensError::malformed(format!("Prefix must be an integer, got {raw}")));
    };
    u8::try_from(n).map_err(|_| LensError::malformed(format!("invalid prefix {n}")))
}

fn field<'a>(obj: &'a Map<String, Value>, name: &str) -> Result<&'a Value> {
    obj.get(name)
        .ok_or_else(|| LensError::malformed(format!("missing {name}")))
}

fn base64_field(obj: &Map<String, Value>, name: &str) -> Result<Vec<u8>> {
    let text = field(obj, name)?
        .as_str()
        .ok_or_else(|| LensError::malformed(format!("{name} must be a Base64 string")))?;
    BASE64_STANDARD
        .decode(text)
        .map_err(|err| LensError::malformed(format!("{name}: {err}")))
}

fn bits_field(obj: &Map<String, Value>) -> Result<Option<[u8; 8]>> {
    if matches!(obj.get("Bits"), None | Some(Value::Null)) {
        return Ok(None);
    }
    let raw = base64_field(obj, "Bits")?;
    let bits = <[u8; 8]>::try_from(raw.as_slice())
        .map_err(|_| LensError::malformed(format!("Bits must hold 8 bytes, got {}", raw.len())))?;
    Ok(Some(bits))
}

fn read_pair(value: &Value, depth: usize, limit: usize) -> Result<(Node, Node)> {
    let obj = value
        .as_object()
        .ok_or_else(|| LensError::malformed("map entry must be an object"))?;
    let key = read_node(field(obj, "Key")?, depth, limit)?;
    let value = read_node(field(obj, "Value")?, depth, limit)?;
    Ok((key, value))
}
