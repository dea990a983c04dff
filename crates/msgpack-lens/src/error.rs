//! Error type shared by every stage of the lens.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LensError>;

#[derive(Debug, Error)]
pub enum LensError {
    /// Fewer bytes are available than a header or declared payload requires.
    #[error("short read at {offset}: need {needed} bytes, have {available}")]
    ShortRead {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("invalid prefix 0x{prefix:02x} at {offset}")]
    InvalidPrefix { offset: usize, prefix: u8 },

    /// A leaf decoder was handed a window from the wrong numeric family.
    #[error("{expected}: invalid type, got prefix 0x{prefix:02x}")]
    TypeMismatch { expected: &'static str, prefix: u8 },

    #[error("{remaining} bytes found at end of input (offset {offset})")]
    TrailingData { offset: usize, remaining: usize },

    /// JSON or typed-JSON input that does not describe a valid value.
    #[error("malformed representation: {0}")]
    Malformed(String),

    #[error("invalid utf-8 in string at {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("unsupported prefix 0x{prefix:02x}")]
    UnsupportedPrefix { prefix: u8 },

    #[error("length {len} does not fit prefix 0x{prefix:02x}")]
    LengthOverflow { prefix: u8, len: usize },

    #[error("value does not fit prefix 0x{prefix:02x}")]
    ValueOutOfRange { prefix: u8 },

    /// `offset` is a byte position in the input, or 0 for an in-memory tree.
    #[error("nesting deeper than {limit} at {offset}")]
    DepthLimit { offset: usize, limit: usize },

    #[error("unsupported value: {0}")]
    NonFiniteFloat(f64),

    /// A visitor hook asked the walk to stop.
    #[error("aborted: {0}")]
    Aborted(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("walk failed at position {offset}/{len}: {source}")]
    Walk {
        offset: usize,
        len: usize,
        #[source]
        source: Box<LensError>,
    },
}

impl LensError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        LensError::Malformed(msg.into())
    }

    /// The innermost error, with any `Walk` position wrappers removed.
    pub fn root_cause(&self) -> &LensError {
        let mut err = self;
        while let LensError::Walk { source, .. } = err {
            err = source;
        }
        err
    }

    /// Byte offset the error is attributed to, when known.
    pub fn offset(&self) -> Option<usize> {
        match self {
            LensError::Walk { offset, .. }
            | LensError::ShortRead { offset, .. }
            | LensError::InvalidPrefix { offset, .. }
            | LensError::TrailingData { offset, .. }
            | LensError::InvalidUtf8 { offset }
            | LensError::DepthLimit { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}
