//! `msgpack-lens`: look inside MessagePack values without losing a byte.
//!
//! The crate is layered:
//!
//! - [`dispatch`] classifies every leading byte and measures values.
//! - [`leaf`] reads scalar windows and writes headers at a chosen width.
//! - [`walker`] drives a [`Visitor`] over encoded bytes, one event per value
//!   and per container boundary.
//! - [`node`] and [`repr`] build a [`Node`] tree that re-encodes exactly.
//! - [`repr_json`] renders that tree as typed JSON, losslessly.
//! - [`json`] renders plain (lossy) JSON and parses JSON back into nodes.
//! - [`printer`] lists a value for humans.
//!
//! ```
//! use msgpack_lens::{decode, repr_json};
//!
//! let bytes = [0x81, 0xa3, b'k', b'e', b'y', 0xcd, 0x00, 0x01];
//! let node = decode(&bytes).unwrap();
//! let text = repr_json::to_repr_string(&node, false).unwrap();
//! let back = repr_json::from_repr_str(&text, false).unwrap();
//! assert_eq!(back.to_bytes().unwrap(), bytes);
//! ```

pub mod constants;
pub mod dispatch;
pub mod error;
pub mod json;
pub mod leaf;
pub mod node;
pub mod printer;
pub mod repr;
pub mod repr_json;
mod stack;
pub mod walker;

pub use constants::WireType;
pub use dispatch::{classify, measure, DispatchEntry, Measure};
pub use error::{LensError, Result};
pub use node::Node;
pub use printer::Printer;
pub use repr::{decode, decode_with, Representer};
pub use walker::{walk, walk_with, Visitor, WalkContext, WalkOptions, DEFAULT_MAX_DEPTH};
