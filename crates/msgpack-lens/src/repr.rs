//! Builds a [`Node`] tree from a walk.

use crate::constants::*;
use crate::error::{LensError, Result};
use crate::node::*;
use crate::walker::{walk_with, Visitor, WalkContext, WalkOptions};

enum Open {
    Array { prefix: u8, children: Vec<Node> },
    /// Keys and values in wire order, paired up when the map closes.
    Map { prefix: u8, flat: Vec<Node> },
}

/// Raw payload bits, so NaN payloads survive untouched.
fn payload_bits(bts: &[u8]) -> u64 {
    bts[1..].iter().fold(0, |acc, b| acc << 8 | u64::from(*b))
}

/// Visitor that materializes the walked value as a [`Node`] tree.
#[derive(Default)]
pub struct Representer {
    roots: Vec<Node>,
    open: Vec<Open>,
}

impl Representer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed top-level values.
    pub fn nodes(&self) -> &[Node] {
        &self.roots
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.roots
    }

    fn push(&mut self, node: Node) -> Result<()> {
        match self.open.last_mut() {
            Some(Open::Array { children, .. }) => children.push(node),
            Some(Open::Map { flat, .. }) => flat.push(node),
            None => self.roots.push(node),
        }
        Ok(())
    }
}

impl Visitor for Representer {
    fn str(&mut self, _ctx: &WalkContext<'_>, bts: &[u8], value: &str) -> Result<()> {
        self.push(Node::Str(StrNode::new(bts[0], value)?))
    }

    fn bin(&mut self, _ctx: &WalkContext<'_>, bts: &[u8], value: &[u8]) -> Result<()> {
        self.push(Node::Bin(BinNode::new(bts[0], value)?))
    }

    fn int(&mut self, _ctx: &WalkContext<'_>, bts: &[u8], value: i64) -> Result<()> {
        self.push(Node::Int(IntNode::new(bts[0], value)?))
    }

    fn uint(&mut self, _ctx: &WalkContext<'_>, bts: &[u8], value: u64) -> Result<()> {
        self.push(Node::Uint(UintNode::new(bts[0], value)?))
    }

    fn float32(&mut self, _ctx: &WalkContext<'_>, bts: &[u8], _value: f32) -> Result<()> {
        self.push(Node::Float(FloatNode::from_bits(FLOAT32, payload_bits(bts))?))
    }

    fn float64(&mut self, _ctx: &WalkContext<'_>, bts: &[u8], _value: f64) -> Result<()> {
        self.push(Node::Float(FloatNode::from_bits(FLOAT64, payload_bits(bts))?))
    }

    fn bool(&mut self, _ctx: &WalkContext<'_>, bts: &[u8], _value: bool) -> Result<()> {
        self.push(Node::Bool(BoolNode::new(bts[0])?))
    }

    fn nil(&mut self, _ctx: &WalkContext<'_>, _prefix: u8) -> Result<()> {
        self.push(Node::nil())
    }

    fn extension(&mut self, _ctx: &WalkContext<'_>, bts: &[u8]) -> Result<()> {
        self.push(Node::Extension(ExtensionNode::new(bts)?))
    }

    fn enter_array(&mut self, _ctx: &WalkContext<'_>, prefix: u8, _count: usize) -> Result<()> {
        self.open.push(Open::Array {
            prefix,
            children: Vec::new(),
        });
        Ok(())
    }

    fn leave_array(
        &mut self,
        _ctx: &WalkContext<'_>,
        _prefix: u8,
        _count: usize,
        _bts: &[u8],
    ) -> Result<()> {
        match self.open.pop() {
            Some(Open::Array { prefix, children }) => {
                self.push(Node::Array(ArrayNode::new(prefix, children)?))
            }
            _ => Err(LensError::malformed("array closed without a matching open")),
        }
    }

    fn enter_map(&mut self, _ctx: &WalkContext<'_>, prefix: u8, _count: usize) -> Result<()> {
        self.open.push(Open::Map {
            prefix,
            flat: Vec::new(),
        });
        Ok(())
    }

    fn leave_map(
        &mut self,
        _ctx: &WalkContext<'_>,
        _prefix: u8,
        count: usize,
        _bts: &[u8],
    ) -> Result<()> {
        let Some(Open::Map { prefix, flat }) = self.open.pop() else {
            return Err(LensError::malformed("map closed without a matching open"));
        };
        if flat.len() != count * 2 {
            return Err(LensError::malformed(format!(
                "map expected {} keys and values, got {}",
                count * 2,
                flat.len()
            )));
        }
        let mut entries = Vec::with_capacity(count);
        let mut flat = flat.into_iter();
        while let (Some(key), Some(value)) = (flat.next(), flat.next()) {
            entries.push((key, value));
        }
        self.push(Node::Map(MapNode::new(prefix, entries)?))
    }
}

/// Decodes one value. Trailing bytes are an error.
pub fn decode(bytes: &[u8]) -> Result<Node> {
    decode_with(bytes, &WalkOptions::default())
}

/// Decodes the first value in `bytes`. With `allow_trailing_data` set,
/// anything after it is ignored.
pub fn decode_with(bytes: &[u8], options: &WalkOptions) -> Result<Node> {
    let mut repr = Representer::new();
    walk_with(bytes, &mut repr, options)?;
    repr.into_nodes()
        .into_iter()
        .next()
        .ok_or_else(|| LensError::malformed("no value decoded"))
}
