//! Conversion pipeline behind the `msgplens` binary.
//!
//! Raw input is first unwrapped from its text encoding ([`decode_input`]),
//! then parsed in the chosen [`InputFormat`] and rendered in the chosen
//! [`OutputFormat`] ([`convert`]).

use std::io::Write;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use clap::ValueEnum;
use msgpack_lens::json::{from_json_with, to_json};
use msgpack_lens::repr_json::{from_repr_str_with, to_repr_string};
use msgpack_lens::{decode_with, LensError, Node, Printer, WalkOptions, DEFAULT_MAX_DEPTH};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// MessagePack bytes
    Msgp,
    /// Typed JSON representation of MessagePack values
    Repr,
    /// Plain JSON
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// MessagePack bytes
    Msgp,
    /// Annotated listing
    Print,
    /// Typed JSON representation of MessagePack values
    Repr,
    /// Lossy plain JSON
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputEncoding {
    /// Hex bytes, e.g. "0a120b", "0a 12 0b" or "0x0a, 0x12, 0x0b"
    Hex,
    /// Decimal bytes, e.g. "[10, 18, 11]"
    #[value(alias = "num")]
    Nums,
    /// Python 3 bytes literal, e.g. b'\x91\xa1a'
    Py3b,
    /// Standard Base64
    #[value(alias = "base64")]
    B64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputEncoding {
    /// Standard Base64
    #[value(alias = "base64")]
    B64,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid hex token {token:?}: {source}")]
    Hex {
        token: String,
        #[source]
        source: hex::FromHexError,
    },
    #[error("invalid byte number {token:?}: {source}")]
    Number {
        token: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("invalid bytes literal: {0}")]
    PyBytes(String),
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("input is not UTF-8 text: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error(transparent)]
    Lens(#[from] LensError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Clone)]
pub struct Options {
    pub input: InputFormat,
    pub output: OutputFormat,
    pub output_encoding: Option<OutputEncoding>,
    /// Accept bytes after the first value instead of failing.
    pub allow_extra: bool,
    pub colors: bool,
    /// Indent typed JSON output.
    pub pretty: bool,
    /// Container nesting bound, applied to every input format.
    pub max_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            input: InputFormat::Msgp,
            output: OutputFormat::Print,
            output_encoding: None,
            allow_extra: false,
            colors: false,
            pretty: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Unwraps `raw` from its text encoding. `None` passes bytes through.
pub fn decode_input(raw: &[u8], encoding: Option<InputEncoding>) -> Result<Vec<u8>> {
    match encoding {
        None => Ok(raw.to_vec()),
        Some(InputEncoding::Hex) => decode_hex(std::str::from_utf8(raw)?),
        Some(InputEncoding::Nums) => decode_nums(std::str::from_utf8(raw)?),
        Some(InputEncoding::Py3b) => decode_py_bytes(raw),
        Some(InputEncoding::B64) => {
            let compact: Vec<u8> = raw
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            Ok(BASE64_STANDARD.decode(compact)?)
        }
    }
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | '[' | ']' | '(' | ')')
}

/// Parses hex bytes. Tokens are split on whitespace, commas and brackets,
/// may carry a `0x` prefix, and hold either a single digit or any number of
/// digit pairs.
pub fn decode_hex(text: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len() / 2);
    for token in text.split(is_separator).filter(|t| !t.is_empty()) {
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        let decoded = match digits.len() {
            0 => Err(hex::FromHexError::InvalidStringLength),
            1 => hex::decode(format!("0{digits}")),
            _ => hex::decode(digits),
        };
        let bytes = decoded.map_err(|source| CliError::Hex {
            token: token.to_string(),
            source,
        })?;
        out.extend_from_slice(&bytes);
    }
    Ok(out)
}

/// Parses a list of decimal bytes separated by whitespace or commas,
/// optionally wrapped in brackets.
pub fn decode_nums(text: &str) -> Result<Vec<u8>> {
    text.split(is_separator)
        .filter(|t| !t.is_empty())
        .map(|token| {
            token.parse::<u8>().map_err(|source| CliError::Number {
                token: token.to_string(),
                source,
            })
        })
        .collect()
}

/// Parses a Python 3 bytes literal such as `b'\x91\xa3key'`.
///
/// The `b'...'` wrapping is optional. Without quotes the whole input is the
/// literal body, minus trailing line breaks.
pub fn decode_py_bytes(raw: &[u8]) -> Result<Vec<u8>> {
    let mut rest = match raw {
        [b'b', tail @ ..] if matches!(tail.first(), Some(b'\'' | b'"')) => tail,
        _ => raw,
    };
    let quote = match rest {
        [q @ (b'\'' | b'"'), tail @ ..] => {
            rest = tail;
            Some(*q)
        }
        _ => {
            while let [head @ .., b'\n' | b'\r'] = rest {
                rest = head;
            }
            None
        }
    };

    let mut out = Vec::with_capacity(rest.len());
    let mut closed = false;
    let mut i = 0;
    while i < rest.len() {
        let c = rest[i];
        i += 1;
        if Some(c) == quote {
            closed = true;
            break;
        }
        if c != b'\\' {
            out.push(c);
            continue;
        }
        let Some(&escape) = rest.get(i) else {
            return Err(CliError::PyBytes("dangling backslash".into()));
        };
        i += 1;
        match escape {
            // line continuation
            b'\n' => {}
            b'x' => {
                let Some(digits) = rest.get(i..i + 2) else {
                    return Err(CliError::PyBytes("incomplete \\x escape".into()));
                };
                let mut byte = [0u8; 1];
                hex::decode_to_slice(digits, &mut byte).map_err(|source| CliError::Hex {
                    token: String::from_utf8_lossy(digits).into_owned(),
                    source,
                })?;
                out.push(byte[0]);
                i += 2;
            }
            b'\\' | b'\'' | b'"' => out.push(escape),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'v' => out.push(0x0b),
            other => out.extend_from_slice(&[b'\\', other]),
        }
    }

    if quote.is_some() && !closed {
        return Err(CliError::PyBytes("missing closing quote".into()));
    }
    if !rest[i..].iter().all(u8::is_ascii_whitespace) {
        return Err(CliError::PyBytes(format!(
            "unexpected text after closing quote at byte {}",
            raw.len() - rest.len() + i
        )));
    }
    Ok(out)
}

fn parse_node(input: &[u8], options: &Options) -> Result<Node> {
    let walk = WalkOptions::default()
        .with_allow_trailing_data(options.allow_extra)
        .with_max_depth(options.max_depth);
    let node = match options.input {
        InputFormat::Msgp => decode_with(input, &walk)?,
        InputFormat::Repr => from_repr_str_with(std::str::from_utf8(input)?, &walk)?,
        InputFormat::Json => from_json_with(std::str::from_utf8(input)?, &walk)?,
    };
    Ok(node)
}

fn print(bytes: &[u8], options: &Options, out: &mut Vec<u8>) -> Result<()> {
    let mut printer = Printer::new(out)
        .with_colors(options.colors)
        .with_allow_extra(options.allow_extra);
    printer.print(bytes, options.max_depth)?;
    Ok(())
}

fn render(input: &[u8], options: &Options) -> Result<Vec<u8>> {
    let same = matches!(
        (options.input, options.output),
        (InputFormat::Msgp, OutputFormat::Msgp)
            | (InputFormat::Repr, OutputFormat::Repr)
            | (InputFormat::Json, OutputFormat::Json)
    );
    if same {
        debug!("input and output formats match, copying through");
        return Ok(input.to_vec());
    }

    let mut rendered = Vec::new();
    if options.input == InputFormat::Msgp && options.output == OutputFormat::Print {
        // printing straight from the input keeps trailing bytes visible
        print(input, options, &mut rendered)?;
        return Ok(rendered);
    }

    let node = parse_node(input, options)?;
    debug!(input = ?options.input, output = ?options.output, "converting");
    match options.output {
        OutputFormat::Msgp => node.write_to(&mut rendered)?,
        OutputFormat::Repr => {
            rendered.extend_from_slice(to_repr_string(&node, options.pretty)?.as_bytes());
            rendered.push(b'\n');
        }
        OutputFormat::Json => {
            let text = to_json(&node.to_bytes()?, &WalkOptions::default())?;
            rendered.extend_from_slice(text.as_bytes());
            rendered.push(b'\n');
        }
        OutputFormat::Print => print(&node.to_bytes()?, options, &mut rendered)?,
    }
    Ok(rendered)
}

/// Converts `input` as described by `options` and writes the result.
pub fn convert<W: Write>(input: &[u8], options: &Options, out: &mut W) -> Result<()> {
    let rendered = render(input, options)?;
    match options.output_encoding {
        None => out.write_all(&rendered)?,
        Some(OutputEncoding::B64) => {
            out.write_all(BASE64_STANDARD.encode(rendered).as_bytes())?;
        }
    }
    out.flush()?;
    Ok(())
}
