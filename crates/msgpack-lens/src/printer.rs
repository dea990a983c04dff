//! Human-readable, optionally coloured listing of an encoded value.
//!
//! Every value gets one line giving its offset, encoded size, prefix byte and
//! prefix name, followed by the decoded value:
//!
//! ```text
//! at:   0 sz:   1 0x92 (146) fixarray len:2 [
//!      0 at:   1 sz:   1 0x01 (001)   fixint 1
//!      1 at:   2 sz:   1 0x02 (002)   fixint 2
//! ]
//! ```

use std::fmt::Display;
use std::io::Write;

use owo_colors::{OwoColorize, Style};

use crate::constants::prefix_name;
use crate::dispatch::classify;
use crate::error::{LensError, Result};
use crate::walker::{walk_with, Visitor, WalkContext, WalkOptions};

const KEY_WIDTH: usize = 4;
const TYPE_WIDTH: usize = 8;
const ATTR_WIDTH: usize = 4;
const DUMP_LINE: usize = 26;

fn attr_name() -> Style {
    Style::new().bright_black()
}

fn attr_value() -> Style {
    Style::new().white()
}

fn key_index() -> Style {
    Style::new().bright_magenta()
}

fn key_kind() -> Style {
    Style::new().magenta()
}

fn prefix_style() -> Style {
    Style::new().bright_cyan()
}

fn type_style() -> Style {
    Style::new().cyan()
}

fn int_style() -> Style {
    Style::new().green()
}

fn float_style() -> Style {
    Style::new().yellow()
}

fn string_style() -> Style {
    Style::new().bright_blue()
}

pub struct Printer<W: Write> {
    out: W,
    indent: String,
    use_colors: bool,
    allow_extra: bool,
    depth: usize,
    line_start: bool,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            indent: "  ".to_string(),
            use_colors: std::env::var_os("NO_COLOR").is_none(),
            allow_extra: false,
            depth: 0,
            line_start: true,
        }
    }

    /// Enable or disable ANSI colours.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn with_indent(mut self, indent: &str) -> Self {
        self.indent = indent.to_string();
        self
    }

    /// Dump trailing bytes instead of failing on them.
    pub fn with_allow_extra(mut self, allow_extra: bool) -> Self {
        self.allow_extra = allow_extra;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Prints the first value in `bytes`. Trailing bytes are always dumped;
    /// they fail the print unless `allow_extra` is set.
    pub fn print(&mut self, bytes: &[u8], max_depth: usize) -> Result<usize> {
        let options = WalkOptions::default()
            .with_allow_trailing_data(true)
            .with_max_depth(max_depth);
        walk_with(bytes, self, &options)
    }

    fn paint(&self, text: impl Display, style: Style) -> String {
        if self.use_colors {
            text.style(style).to_string()
        } else {
            text.to_string()
        }
    }

    fn write(&mut self, text: &str) -> Result<()> {
        if self.line_start {
            for _ in 0..self.depth {
                self.out.write_all(self.indent.as_bytes())?;
            }
            self.line_start = false;
        }
        self.out.write_all(text.as_bytes())?;
        Ok(())
    }

    fn newline(&mut self) -> Result<()> {
        self.out.write_all(b"\n")?;
        self.line_start = true;
        Ok(())
    }

    fn header(&mut self, ctx: &WalkContext<'_>, prefix: u8, size: usize) -> Result<()> {
        let line = format!(
            "{}{} {}{} {} {}",
            self.paint("at:", attr_name()),
            self.paint(format!("{:>ATTR_WIDTH$}", ctx.pos()), attr_value()),
            self.paint("sz:", attr_name()),
            self.paint(format!("{size:>ATTR_WIDTH$}"), attr_value()),
            self.paint(format!("0x{prefix:02x} ({prefix:03})"), prefix_style()),
            self.paint(format!("{:>TYPE_WIDTH$}", prefix_name(prefix)), type_style()),
        );
        self.write(&line)
    }

    fn scalar(&mut self, ctx: &WalkContext<'_>, bts: &[u8], value: Option<String>) -> Result<()> {
        self.header(ctx, bts[0], bts.len())?;
        if let Some(value) = value {
            self.write(" ")?;
            self.write(&value)?;
        }
        self.newline()
    }

    fn enter_container(
        &mut self,
        ctx: &WalkContext<'_>,
        prefix: u8,
        count: usize,
        open: &str,
    ) -> Result<()> {
        self.header(ctx, prefix, classify(prefix).header_len())?;
        let len = format!(
            " {}{} {open}",
            self.paint("len:", attr_name()),
            self.paint(count, attr_value())
        );
        self.write(&len)?;
        if count > 0 {
            self.newline()?;
        }
        self.depth += 1;
        Ok(())
    }

    fn leave_container(&mut self, close: &str) -> Result<()> {
        self.depth = self.depth.saturating_sub(1);
        self.write(close)?;
        self.newline()
    }

    fn key(&mut self, kind: &str, n: usize) -> Result<()> {
        let label = format!("{kind}{n}");
        let pad = KEY_WIDTH.saturating_sub(label.len());
        let text = format!(
            "{}{}{} ",
            " ".repeat(pad),
            self.paint(kind, key_kind()),
            self.paint(n, key_index())
        );
        self.write(&text)
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl<W: Write> Visitor for Printer<W> {
    fn end(&mut self, ctx: &WalkContext<'_>, trailing: &[u8]) -> Result<()> {
        if !trailing.is_empty() {
            self.newline()?;
            self.write(&format!("{} bytes remaining:", trailing.len()))?;
            self.newline()?;
            self.depth += 1;
            for (i, b) in trailing.iter().enumerate() {
                if i > 0 && i % DUMP_LINE == 0 {
                    self.newline()?;
                } else if i > 0 && i % 2 == 0 {
                    self.write(" ")?;
                }
                self.write(&format!("{b:02x}"))?;
            }
            self.depth -= 1;
            self.newline()?;
        }
        self.out.flush()?;
        if !trailing.is_empty() && !self.allow_extra {
            return Err(LensError::TrailingData {
                offset: ctx.cursor(),
                remaining: trailing.len(),
            });
        }
        Ok(())
    }

    fn str(&mut self, ctx: &WalkContext<'_>, bts: &[u8], value: &str) -> Result<()> {
        let value = self.paint(format!("{value:?}"), string_style());
        self.scalar(ctx, bts, Some(value))
    }

    fn bin(&mut self, ctx: &WalkContext<'_>, bts: &[u8], value: &[u8]) -> Result<()> {
        let value = self.paint(hex(value), string_style());
        self.scalar(ctx, bts, Some(value))
    }

    fn int(&mut self, ctx: &WalkContext<'_>, bts: &[u8], value: i64) -> Result<()> {
        let value = self.paint(value, int_style());
        self.scalar(ctx, bts, Some(value))
    }

    fn uint(&mut self, ctx: &WalkContext<'_>, bts: &[u8], value: u64) -> Result<()> {
        let value = self.paint(value, int_style());
        self.scalar(ctx, bts, Some(value))
    }

    fn float32(&mut self, ctx: &WalkContext<'_>, bts: &[u8], value: f32) -> Result<()> {
        let value = self.paint(value, float_style());
        self.scalar(ctx, bts, Some(value))
    }

    fn float64(&mut self, ctx: &WalkContext<'_>, bts: &[u8], value: f64) -> Result<()> {
        let value = self.paint(value, float_style());
        self.scalar(ctx, bts, Some(value))
    }

    fn bool(&mut self, ctx: &WalkContext<'_>, bts: &[u8], _value: bool) -> Result<()> {
        self.scalar(ctx, bts, None)
    }

    fn nil(&mut self, ctx: &WalkContext<'_>, prefix: u8) -> Result<()> {
        self.scalar(ctx, &[prefix], None)
    }

    fn extension(&mut self, ctx: &WalkContext<'_>, bts: &[u8]) -> Result<()> {
        let header = classify(bts[0]).header_len();
        let value = format!(
            "{}{} {}",
            self.paint("type:", attr_name()),
            self.paint(bts[header - 1] as i8, attr_value()),
            self.paint(hex(&bts[header..]), string_style())
        );
        self.scalar(ctx, bts, Some(value))
    }

    fn enter_array(&mut self, ctx: &WalkContext<'_>, prefix: u8, count: usize) -> Result<()> {
        self.enter_container(ctx, prefix, count, "[")
    }

    fn enter_array_elem(&mut self, _ctx: &WalkContext<'_>, n: usize, _count: usize) -> Result<()> {
        let text = format!("{} ", self.paint(format!("{n:>KEY_WIDTH$}"), key_index()));
        self.write(&text)
    }

    fn leave_array(
        &mut self,
        _ctx: &WalkContext<'_>,
        _prefix: u8,
        _count: usize,
        _bts: &[u8],
    ) -> Result<()> {
        self.leave_container("]")
    }

    fn enter_map(&mut self, ctx: &WalkContext<'_>, prefix: u8, count: usize) -> Result<()> {
        self.enter_container(ctx, prefix, count, "{")
    }

    fn enter_map_key(&mut self, _ctx: &WalkContext<'_>, n: usize, _count: usize) -> Result<()> {
        self.key("K", n)
    }

    fn enter_map_elem(&mut self, _ctx: &WalkContext<'_>, n: usize, _count: usize) -> Result<()> {
        self.key("V", n)
    }

    fn leave_map(
        &mut self,
        _ctx: &WalkContext<'_>,
        _prefix: u8,
        _count: usize,
        _bts: &[u8],
    ) -> Result<()> {
        self.leave_container("}")
    }
}
