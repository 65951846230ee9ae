//! Errors reported while reading RDL text

use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::error::SchemaError;

/// Failure classes of the RDL tokenizer and parser
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ParseErrorKind {
    /// Token stream did not match the grammar
    UnexpectedToken { expected: String, found: String },
    UnexpectedEof { expected: String },
    UnterminatedString,
    BadEscape(char),
    BadNumber(String),
    BadCharacter(char),
    /// Option not recognized, or not applicable where it appears
    UnknownOption { option: String, context: String },
    BadOptionValue { option: String, value: String },
    /// Structural violation of the type graph
    Schema(SchemaError),
    IncludeFailed { name: String, reason: String },
    CircularInclude(String),
}

impl Display for ParseErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseErrorKind::UnexpectedToken { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            ParseErrorKind::UnexpectedEof { expected } => {
                write!(f, "expected {expected}, found end of input")
            }
            ParseErrorKind::UnterminatedString => write!(f, "unterminated string literal"),
            ParseErrorKind::BadEscape(c) => write!(f, "bad escape sequence '\\{c}'"),
            ParseErrorKind::BadNumber(text) => write!(f, "malformed number '{text}'"),
            ParseErrorKind::BadCharacter(c) => write!(f, "unexpected character {c:?}"),
            ParseErrorKind::UnknownOption { option, context } => {
                write!(f, "option '{option}' not valid for {context}")
            }
            ParseErrorKind::BadOptionValue { option, value } => {
                write!(f, "bad value {value} for option '{option}'")
            }
            ParseErrorKind::Schema(err) => Display::fmt(err, f),
            ParseErrorKind::IncludeFailed { name, reason } => {
                write!(f, "cannot include '{name}': {reason}")
            }
            ParseErrorKind::CircularInclude(name) => write!(f, "circular include of '{name}'"),
        }
    }
}

/// Positioned parse failure
///
/// `line` and `column` are 1-based; `file` is the include name the error was
/// found in, or `None` for the top-level text.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ParseError {
    pub file: Option<String>,
    pub line: usize,
    pub column: usize,
    pub kind: ParseErrorKind,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{file}:{}:{}: {}", self.line, self.column, self.kind),
            None => write!(f, "{}:{}: {}", self.line, self.column, self.kind),
        }
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            ParseErrorKind::Schema(err) => Some(err),
            _ => None,
        }
    }
}

/// Type alias for Result with an error type of [`ParseError`]
pub type ParseResult<T> = std::result::Result<T, ParseError>;
