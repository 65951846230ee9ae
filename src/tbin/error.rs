//! Error types for the TBin encoder and decoder
//!
//! Both encoder and decoder latch the first error they encounter and return
//! it again from every later operation, so the error types are `Clone`;
//! I/O errors, which are not, are held behind an `Arc`.

use std::error::Error;
use std::fmt::{Display, Formatter, Result};
use std::io;
use std::str::Utf8Error;
use std::sync::Arc;

/// Failures encountered while encoding a value
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum EncodeError {
    /// A required field held `None`
    MissingField { ty: String, field: String },
    /// A value that has no representation in the target position
    Unsupported(String),
    /// Failure reported by a hand-written `Marshal` implementation
    Custom(String),
    /// Failure while flushing the buffered encoding into a writer
    Io(Arc<io::Error>),
}

impl EncodeError {
    pub fn custom(msg: impl Display) -> Self {
        Self::Custom(msg.to_string())
    }
}

impl From<io::Error> for EncodeError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl Display for EncodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            EncodeError::MissingField { ty, field } => {
                write!(f, "cannot marshal null for required field {field} in {ty}")
            }
            EncodeError::Unsupported(what) => write!(f, "cannot marshal value: {what}"),
            EncodeError::Custom(msg) => f.write_str(msg),
            EncodeError::Io(err) => write!(f, "error writing encoded data: {err}"),
        }
    }
}

impl Error for EncodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EncodeError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

pub type EncodeResult<T> = std::result::Result<T, EncodeError>;

/// Failures encountered while decoding a TBin stream
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum DecodeError {
    /// Varint running past the maximum width of its type
    BadVarint { offset: usize },
    /// Input ended before a value was complete
    Truncated { offset: usize, requested: usize },
    Io(Arc<io::Error>),
    InvalidUtf8(Utf8Error),
    /// First tag of a stream is not a version tag
    NotTbin,
    UnsupportedVersion(u32),
    /// Reference to a user tag beyond the next one to be defined
    UndefinedTag(u32),
    /// Tag that is not legal in the position it was read
    UnexpectedTag(u32),
    UndefinedSymbol(u32),
    /// Stream defined the same shape twice
    DuplicateDefinition(String),
    /// Stream introduced a symbol that is already interned
    DuplicateSymbol(String),
    /// Map key that is neither a string nor a symbol
    NonStringKey(String),
    /// Union variant or enum symbol index outside the declared range
    IndexOutOfRange { what: &'static str, index: i64, len: usize },
    /// Enum symbol that the target type does not declare
    UnknownSymbol { ty: String, symbol: String },
    /// Stream value of a shape the target type cannot hold
    TypeMismatch { expected: String, found: String },
    /// Integer that does not fit the narrower target type
    Overflow { target: &'static str, value: i64 },
    InvalidTimestamp(f64),
    /// Required field absent from the stream (strict mode only)
    MissingField { ty: String, field: String },
    /// Bytes left over after a complete value
    TrailingBytes { offset: usize },
    /// Values or definitions nested more than `limit` levels deep
    TooDeep { limit: usize },
    /// Failure reported by a hand-written `Unmarshal` implementation
    Custom(String),
}

impl DecodeError {
    pub fn custom(msg: impl Display) -> Self {
        Self::Custom(msg.to_string())
    }
}

impl From<io::Error> for DecodeError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<Utf8Error> for DecodeError {
    fn from(err: Utf8Error) -> Self {
        Self::InvalidUtf8(err)
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            DecodeError::BadVarint { offset } => write!(f, "bad varint encoding at offset {offset}"),
            DecodeError::Truncated { offset, requested } => write!(
                f,
                "unexpected end of input at offset {offset} ({requested} more bytes requested)"
            ),
            DecodeError::Io(err) => write!(f, "error reading tbin data: {err}"),
            DecodeError::InvalidUtf8(err) => write!(f, "invalid utf-8 in string: {err}"),
            DecodeError::NotTbin => f.write_str("not a valid tbin file"),
            DecodeError::UnsupportedVersion(v) => write!(f, "tbin version not supported: {v}"),
            DecodeError::UndefinedTag(tag) => write!(f, "ref to an undefined tag: {tag:#04x}"),
            DecodeError::UnexpectedTag(tag) => write!(f, "unexpected tag value: {tag:#04x}"),
            DecodeError::UndefinedSymbol(id) => write!(f, "ref to an undefined symbol id: {id}"),
            DecodeError::DuplicateDefinition(key) => write!(f, "type defined twice in stream: {key}"),
            DecodeError::DuplicateSymbol(name) => write!(f, "symbol introduced twice in stream: {name}"),
            DecodeError::NonStringKey(kind) => write!(f, "map keys must derive from strings, found {kind}"),
            DecodeError::IndexOutOfRange { what, index, len } => {
                write!(f, "{what} index {index} out of range (1..={len})")
            }
            DecodeError::UnknownSymbol { ty, symbol } => write!(f, "no symbol {symbol} in enum {ty}"),
            DecodeError::TypeMismatch { expected, found } => {
                write!(f, "cannot decode {found} into {expected}")
            }
            DecodeError::Overflow { target, value } => write!(f, "value {value} overflows {target}"),
            DecodeError::InvalidTimestamp(secs) => write!(f, "invalid timestamp: {secs}"),
            DecodeError::MissingField { ty, field } => write!(f, "missing required field {field} in {ty}"),
            DecodeError::TrailingBytes { offset } => write!(f, "trailing bytes after value at offset {offset}"),
            DecodeError::TooDeep { limit } => write!(f, "nesting deeper than {limit} levels"),
            DecodeError::Custom(msg) => f.write_str(msg),
        }
    }
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DecodeError::Io(err) => Some(err.as_ref()),
            DecodeError::InvalidUtf8(err) => Some(err),
            _ => None,
        }
    }
}

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

#[cfg(test)]
mod test {
    use super::*;

    fn dummy<T: Send + Sync>() {}

    #[test]
    fn codec_errors_threadsafe() {
        dummy::<EncodeError>();
        dummy::<DecodeError>();
    }

    #[test]
    fn io_errors_clone() {
        let err = DecodeError::from(io::Error::new(io::ErrorKind::Other, "boom"));
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
        assert!(copy.source().is_some());
    }
}
