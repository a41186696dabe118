//! Error and diagnostic types shared by every SMF encoding.

use std::fmt;
use std::io;

use thiserror::Error;

/// Stable prefix of every error produced by a short read.
pub const SHORT_READ_MESSAGE: &str = "Failed to read the required number of octets";

/// Source location attached to diagnostics.
///
/// Binary encodings report the absolute byte offset as `line` and leave
/// `column` at zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct LexicalPosition {
    pub line: u64,
    pub column: u64,
    pub source: Option<String>,
}

impl LexicalPosition {
    pub fn new(line: u64, column: u64, source: Option<String>) -> Self {
        Self { line, column, source }
    }

    /// Position of a byte offset within a binary stream.
    pub fn at_offset(offset: u64, source: Option<&str>) -> Self {
        Self {
            line: offset,
            column: 0,
            source: source.map(str::to_owned),
        }
    }
}

impl fmt::Display for LexicalPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}:{}:{}", source, self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

/// Snapshot of an I/O failure kept as the cause of a [`ParseError`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct IoCause {
    pub kind: io::ErrorKind,
    pub message: String,
}

impl From<&io::Error> for IoCause {
    fn from(e: &io::Error) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// An error reported while consuming an SMF stream.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{position}: {message}")]
pub struct ParseError {
    pub position: LexicalPosition,
    pub message: String,
    #[source]
    pub cause: Option<IoCause>,
}

impl ParseError {
    pub fn new(position: LexicalPosition, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: &io::Error) -> Self {
        self.cause = Some(IoCause::from(cause));
        self
    }
}

/// A non-fatal diagnostic reported while consuming an SMF stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{position}: {message}")]
pub struct ParseWarning {
    pub position: LexicalPosition,
    pub message: String,
}

impl ParseWarning {
    pub fn new(position: LexicalPosition, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SmfError {
    /// Malformed input. Always fatal to the current parse.
    #[error("Format error: {0}")]
    Format(ParseError),
    /// Declared and observed mesh structure disagree.
    #[error("Structural error: {0}")]
    Structural(ParseError),
    /// A parser or serializer was driven in an order it does not accept.
    #[error("Contract violation: {0}")]
    Contract(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(String),
}

impl SmfError {
    pub fn format(position: LexicalPosition, message: impl Into<String>) -> Self {
        SmfError::Format(ParseError::new(position, message))
    }

    pub fn structural(position: LexicalPosition, message: impl Into<String>) -> Self {
        SmfError::Structural(ParseError::new(position, message))
    }

    pub fn contract(message: impl Into<String>) -> Self {
        SmfError::Contract(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        SmfError::InvalidParameter(message.into())
    }

    /// Converts the error into a diagnostic anchored at `position`.
    ///
    /// Errors that already carry a position keep it.
    pub fn into_parse_error(self, position: LexicalPosition) -> ParseError {
        match self {
            SmfError::Format(e) | SmfError::Structural(e) => e,
            other => ParseError::new(position, other.to_string()),
        }
    }
}

impl From<io::Error> for SmfError {
    fn from(e: io::Error) -> Self {
        SmfError::IoError(e.to_string())
    }
}

pub type Status = Result<(), SmfError>;
