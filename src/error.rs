//! Error types
//!
//! Only the hard failure tier lives here: malformed input, I/O, malformed
//! path expressions and typed conversions of text that does not parse.
//! Lookups that merely find nothing are not errors anywhere in the crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, XmlError>;

/// Failure raised by the document layer while loading, parsing or saving
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("{message} (line {line}, column {column})")]
    Parse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Invalid tree operation: {0}")]
    Tree(String),
}

/// Failure compiling or evaluating a path expression
#[derive(Debug, Clone, PartialEq, Error)]
pub enum XPathError {
    #[error("XPath syntax error: {0}")]
    Syntax(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("XPath evaluation error: {0}")]
    Evaluation(String),
}

/// Failure converting a node's text into a typed value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("Input string '{text}' was not in a correct format for {target}")]
    Format { target: &'static str, text: String },

    #[error("Value '{text}' is out of range for {target}")]
    Overflow { target: &'static str, text: String },
}

impl ConvertError {
    pub fn format(target: &'static str, text: &str) -> Self {
        ConvertError::Format {
            target,
            text: text.to_string(),
        }
    }

    pub fn overflow(target: &'static str, text: &str) -> Self {
        ConvertError::Overflow {
            target,
            text: text.to_string(),
        }
    }

    /// Name of the requested target type
    pub fn target(&self) -> &'static str {
        match self {
            ConvertError::Format { target, .. } | ConvertError::Overflow { target, .. } => target,
        }
    }
}

impl XmlError {
    /// Build a parse error from a byte position in the (UTF-8) input
    pub fn parse_at(message: impl Into<String>, input: &[u8], position: usize) -> Self {
        let (line, column) = line_column(input, position);
        XmlError::Parse {
            message: message.into(),
            line,
            column,
        }
    }
}

/// 1-based line and column of a byte offset
fn line_column(input: &[u8], position: usize) -> (usize, usize) {
    let end = position.min(input.len());
    let before = &input[..end];
    let line = memchr::memchr_iter(b'\n', before).count() + 1;
    let line_start = memchr::memrchr(b'\n', before).map(|p| p + 1).unwrap_or(0);
    let column = String::from_utf8_lossy(&before[line_start..]).chars().count() + 1;
    (line, column)
}
