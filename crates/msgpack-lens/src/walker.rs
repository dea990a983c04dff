//! Structural walker over encoded MessagePack bytes.
//!
//! [`walk`] performs one depth-first traversal of a single top-level value,
//! calling a [`Visitor`] hook for every scalar and for every container
//! enter/element/leave event in document order. Nesting is tracked with an
//! explicit frame stack rather than recursion, and bounded by
//! [`WalkOptions::max_depth`].

use tracing::{debug, trace};

use crate::constants::WireType;
use crate::dispatch::{classify, measure_at};
use crate::error::{LensError, Result};
use crate::leaf;

pub const DEFAULT_MAX_DEPTH: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    /// Accept bytes left over after the first complete value.
    pub allow_trailing_data: bool,
    /// Deepest container nesting accepted before the walk fails.
    pub max_depth: usize,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            allow_trailing_data: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl WalkOptions {
    pub fn with_allow_trailing_data(mut self, allow: bool) -> Self {
        self.allow_trailing_data = allow;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Read-only view of the traversal handed to every hook.
#[derive(Debug, Clone)]
pub struct WalkContext<'a> {
    bytes: &'a [u8],
    last: usize,
    cur: usize,
    depth: usize,
}

impl<'a> WalkContext<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            last: 0,
            cur: 0,
            depth: 0,
        }
    }

    /// Length of the whole input.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Offset of the value most recently started.
    pub fn pos(&self) -> usize {
        self.last
    }

    /// Offset of the next unread byte.
    pub fn cursor(&self) -> usize {
        self.cur
    }

    /// Number of containers currently open.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

/// Callbacks fired by [`walk`]. Every hook defaults to doing nothing; returning
/// an error from any hook aborts the walk.
///
/// Scalar hooks receive the value's full byte window (`bts`, header included)
/// alongside the decoded value. Map counts are pair counts.
#[allow(unused_variables)]
pub trait Visitor {
    fn begin(&mut self, ctx: &WalkContext<'_>) -> Result<()> {
        Ok(())
    }
    /// Called once the top-level value is complete, with any bytes after it.
    fn end(&mut self, ctx: &WalkContext<'_>, trailing: &[u8]) -> Result<()> {
        Ok(())
    }

    fn str(&mut self, ctx: &WalkContext<'_>, bts: &[u8], value: &str) -> Result<()> {
        Ok(())
    }
    fn bin(&mut self, ctx: &WalkContext<'_>, bts: &[u8], value: &[u8]) -> Result<()> {
        Ok(())
    }
    fn int(&mut self, ctx: &WalkContext<'_>, bts: &[u8], value: i64) -> Result<()> {
        Ok(())
    }
    fn uint(&mut self, ctx: &WalkContext<'_>, bts: &[u8], value: u64) -> Result<()> {
        Ok(())
    }
    fn float32(&mut self, ctx: &WalkContext<'_>, bts: &[u8], value: f32) -> Result<()> {
        Ok(())
    }
    fn float64(&mut self, ctx: &WalkContext<'_>, bts: &[u8], value: f64) -> Result<()> {
        Ok(())
    }
    fn bool(&mut self, ctx: &WalkContext<'_>, bts: &[u8], value: bool) -> Result<()> {
        Ok(())
    }
    fn nil(&mut self, ctx: &WalkContext<'_>, prefix: u8) -> Result<()> {
        Ok(())
    }
    /// Extensions are opaque: `bts` is the whole window, type byte included.
    fn extension(&mut self, ctx: &WalkContext<'_>, bts: &[u8]) -> Result<()> {
        Ok(())
    }

    fn enter_array(&mut self, ctx: &WalkContext<'_>, prefix: u8, count: usize) -> Result<()> {
        Ok(())
    }
    fn enter_array_elem(&mut self, ctx: &WalkContext<'_>, n: usize, count: usize) -> Result<()> {
        Ok(())
    }
    fn leave_array_elem(&mut self, ctx: &WalkContext<'_>, n: usize, count: usize) -> Result<()> {
        Ok(())
    }
    /// `bts` spans the whole array, header and children.
    fn leave_array(
        &mut self,
        ctx: &WalkContext<'_>,
        prefix: u8,
        count: usize,
        bts: &[u8],
    ) -> Result<()> {
        Ok(())
    }

    fn enter_map(&mut self, ctx: &WalkContext<'_>, prefix: u8, count: usize) -> Result<()> {
        Ok(())
    }
    fn enter_map_key(&mut self, ctx: &WalkContext<'_>, n: usize, count: usize) -> Result<()> {
        Ok(())
    }
    fn leave_map_key(&mut self, ctx: &WalkContext<'_>, n: usize, count: usize) -> Result<()> {
        Ok(())
    }
    fn enter_map_elem(&mut self, ctx: &WalkContext<'_>, n: usize, count: usize) -> Result<()> {
        Ok(())
    }
    fn leave_map_elem(&mut self, ctx: &WalkContext<'_>, n: usize, count: usize) -> Result<()> {
        Ok(())
    }
    /// `bts` spans the whole map, header and every key and value.
    fn leave_map(
        &mut self,
        ctx: &WalkContext<'_>,
        prefix: u8,
        count: usize,
        bts: &[u8],
    ) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct Frame {
    kind: WireType,
    prefix: u8,
    start: usize,
    /// Elements for arrays, pairs for maps.
    count: usize,
    /// Child values still to be visited in total (2x pairs for maps).
    slots: usize,
    seen: usize,
}

/// Walks one value with the default options.
///
/// Returns the number of bytes the top-level value occupied.
pub fn walk<V: Visitor + ?Sized>(bytes: &[u8], visitor: &mut V) -> Result<usize> {
    walk_with(bytes, visitor, &WalkOptions::default())
}

pub fn walk_with<V: Visitor + ?Sized>(
    bytes: &[u8],
    visitor: &mut V,
    options: &WalkOptions,
) -> Result<usize> {
    debug!(len = bytes.len(), "walk: start");
    let mut walker = Walker {
        ctx: WalkContext::new(bytes),
        stack: Vec::new(),
        max_depth: options.max_depth,
    };
    let result = visitor
        .begin(&walker.ctx)
        .and_then(|()| walker.run(visitor));
    if let Err(err) = result {
        debug!(pos = walker.ctx.cur, error = %err, "walk: failed");
        return Err(LensError::Walk {
            offset: walker.ctx.cur,
            len: bytes.len(),
            source: Box::new(err),
        });
    }

    let consumed = walker.ctx.cur;
    let trailing = &bytes[consumed..];
    visitor.end(&walker.ctx, trailing)?;
    if !trailing.is_empty() && !options.allow_trailing_data {
        return Err(LensError::TrailingData {
            offset: consumed,
            remaining: trailing.len(),
        });
    }
    debug!(consumed, trailing = trailing.len(), "walk: done");
    Ok(consumed)
}

struct Walker<'a> {
    ctx: WalkContext<'a>,
    stack: Vec<Frame>,
    max_depth: usize,
}

impl<'a> Walker<'a> {
    fn run<V: Visitor + ?Sized>(&mut self, visitor: &mut V) -> Result<()> {
        let bytes = self.ctx.bytes;
        loop {
            let start = self.ctx.cur;
            self.ctx.last = start;
            let measured = measure_at(&bytes[start..], start)?;
            let prefix = bytes[start];
            let kind = classify(prefix).wire_type;

            if let Some(parent) = self.stack.last() {
                enter_child(parent, &self.ctx, visitor)?;
            }

            if kind.is_container() {
                if self.stack.len() >= self.max_depth {
                    return Err(LensError::DepthLimit {
                        offset: start,
                        limit: self.max_depth,
                    });
                }
                let count = match kind {
                    WireType::Map => measured.elements / 2,
                    _ => measured.elements,
                };
                trace!(pos = start, %kind, count, "walk: enter");
                match kind {
                    WireType::Map => visitor.enter_map(&self.ctx, prefix, count)?,
                    _ => visitor.enter_array(&self.ctx, prefix, count)?,
                }
                self.ctx.cur = start + measured.total;
                self.stack.push(Frame {
                    kind,
                    prefix,
                    start,
                    count,
                    slots: measured.elements,
                    seen: 0,
                });
                self.ctx.depth = self.stack.len();
                if measured.elements > 0 {
                    continue;
                }
                self.close_frame(visitor)?;
            } else {
                let available = bytes.len() - start;
                if measured.total > available {
                    return Err(LensError::ShortRead {
                        offset: start,
                        needed: measured.total,
                        available,
                    });
                }
                let end = start + measured.total;
                self.visit_scalar(kind, &bytes[start..end], visitor)?;
                self.ctx.cur = end;
            }

            // A value just finished: let each enclosing frame account for it,
            // closing frames whose children are all consumed.
            loop {
                let Some(parent) = self.stack.last_mut() else {
                    return Ok(());
                };
                leave_child(parent, &self.ctx, visitor)?;
                parent.seen += 1;
                if parent.seen < parent.slots {
                    break;
                }
                self.close_frame(visitor)?;
            }
        }
    }

    fn close_frame<V: Visitor + ?Sized>(&mut self, visitor: &mut V) -> Result<()> {
        let Some(frame) = self.stack.pop() else {
            return Ok(());
        };
        self.ctx.depth = self.stack.len();
        let span = &self.ctx.bytes[frame.start..self.ctx.cur];
        trace!(pos = frame.start, kind = %frame.kind, span = span.len(), "walk: leave");
        match frame.kind {
            WireType::Map => visitor.leave_map(&self.ctx, frame.prefix, frame.count, span),
            _ => visitor.leave_array(&self.ctx, frame.prefix, frame.count, span),
        }
    }

    fn visit_scalar<V: Visitor + ?Sized>(
        &self,
        kind: WireType,
        window: &[u8],
        visitor: &mut V,
    ) -> Result<()> {
        let ctx = &self.ctx;
        let prefix = window[0];
        match kind {
            WireType::Str => {
                let payload = &window[classify(prefix).header_len()..];
                let value = std::str::from_utf8(payload)
                    .map_err(|_| LensError::InvalidUtf8 { offset: ctx.last })?;
                visitor.str(ctx, window, value)
            }
            WireType::Bin => {
                let payload = &window[classify(prefix).header_len()..];
                visitor.bin(ctx, window, payload)
            }
            WireType::Int => visitor.int(ctx, window, leaf::read_int64(window)?),
            WireType::Uint => visitor.uint(ctx, window, leaf::read_uint64(window)?),
            WireType::Float32 => visitor.float32(ctx, window, leaf::read_float32(window)?),
            WireType::Float64 => visitor.float64(ctx, window, leaf::read_float64(window)?),
            WireType::Bool => visitor.bool(ctx, window, leaf::read_bool(window)?),
            WireType::Nil => visitor.nil(ctx, prefix),
            WireType::Extension => visitor.extension(ctx, window),
            WireType::Array | WireType::Map | WireType::Invalid => Err(LensError::InvalidPrefix {
                offset: ctx.last,
                prefix,
            }),
        }
    }
}

// Map children alternate key, value: even slots are keys.
fn enter_child<V: Visitor + ?Sized>(
    frame: &Frame,
    ctx: &WalkContext<'_>,
    visitor: &mut V,
) -> Result<()> {
    match frame.kind {
        WireType::Map if frame.seen % 2 == 0 => {
            visitor.enter_map_key(ctx, frame.seen / 2, frame.count)
        }
        WireType::Map => visitor.enter_map_elem(ctx, frame.seen / 2, frame.count),
        _ => visitor.enter_array_elem(ctx, frame.seen, frame.count),
    }
}

fn leave_child<V: Visitor + ?Sized>(
    frame: &Frame,
    ctx: &WalkContext<'_>,
    visitor: &mut V,
) -> Result<()> {
    match frame.kind {
        WireType::Map if frame.seen % 2 == 0 => {
            visitor.leave_map_key(ctx, frame.seen / 2, frame.count)
        }
        WireType::Map => visitor.leave_map_elem(ctx, frame.seen / 2, frame.count),
        _ => visitor.leave_array_elem(ctx, frame.seen, frame.count),
    }
}
