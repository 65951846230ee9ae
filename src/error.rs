//! General error types
//!
//! [`SchemaError`] covers violations of the structural invariants of a
//! [`Schema`](crate::model::Schema), whether detected while parsing RDL text
//! or while building a schema programmatically in paranoid mode.
//!
//! [`Error`] is the umbrella over every fallible layer of the crate, for
//! callers that would rather not distinguish them.

use std::error::Error as StdError;
use std::fmt::{Display, Formatter};

use crate::model::BaseType;
use crate::schema::ParseError;
use crate::tbin::{DecodeError, EncodeError};

/// Enumerated error type for invalid type graphs
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SchemaError {
    /// Type name defined more than once, or shadowing a base type
    DuplicateType(String),
    /// Reference to a type that is neither a base type nor previously defined
    UnknownType { context: String, name: String },
    /// Non-optional field whose type is the enclosing struct
    RecursiveField { ty: String, field: String },
    /// Field name repeated, possibly through inheritance
    DuplicateField { ty: String, field: String },
    DuplicateElement { ty: String, symbol: String },
    DuplicateVariant { ty: String, variant: String },
    /// Union listing itself as a variant
    SelfReferentialUnion(String),
    /// Restriction shape does not agree with the base of its supertype
    KindMismatch {
        ty: String,
        expected: &'static str,
        found: BaseType,
    },
    /// Mutually exclusive or out-of-order restriction options
    ConflictingOptions { ty: String, detail: String },
    InvalidPattern { ty: String, reason: String },
    BadAnnotation(String),
    BadIdentifier(String),
    UnknownMethod { resource: String, method: String },
    DuplicateParam { resource: String, name: String },
    MissingPathParam { resource: String, param: String },
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaError::DuplicateType(name) => write!(f, "duplicate type name: {name}"),
            SchemaError::UnknownType { context, name } => {
                write!(f, "undefined type '{name}' referenced by {context}")
            }
            SchemaError::RecursiveField { ty, field } => write!(
                f,
                "recursive field must be optional: {ty}.{field}"
            ),
            SchemaError::DuplicateField { ty, field } => {
                write!(f, "duplicate field '{field}' in struct {ty}")
            }
            SchemaError::DuplicateElement { ty, symbol } => {
                write!(f, "duplicate element '{symbol}' in enum {ty}")
            }
            SchemaError::DuplicateVariant { ty, variant } => {
                write!(f, "duplicate variant '{variant}' in union {ty}")
            }
            SchemaError::SelfReferentialUnion(ty) => {
                write!(f, "union {ty} cannot include itself as a variant")
            }
            SchemaError::KindMismatch { ty, expected, found } => write!(
                f,
                "type {ty} is declared as {expected} but derives from base type {found}"
            ),
            SchemaError::ConflictingOptions { ty, detail } => {
                write!(f, "inconsistent options for type {ty}: {detail}")
            }
            SchemaError::InvalidPattern { ty, reason } => {
                write!(f, "bad pattern for type {ty}: {reason}")
            }
            SchemaError::BadAnnotation(name) => {
                write!(f, "bad annotation name '{name}' (must match x_[a-zA-Z_0-9]*)")
            }
            SchemaError::BadIdentifier(name) => write!(f, "bad identifier: '{name}'"),
            SchemaError::UnknownMethod { resource, method } => {
                write!(f, "unsupported method '{method}' for resource {resource}")
            }
            SchemaError::DuplicateParam { resource, name } => {
                write!(f, "duplicate input/output name '{name}' in resource {resource}")
            }
            SchemaError::MissingPathParam { resource, param } => write!(
                f,
                "path parameter '{param}' of resource {resource} has no matching input"
            ),
        }
    }
}

impl StdError for SchemaError {}

/// Umbrella error over parsing, schema construction and the TBin codec
#[derive(Debug)]
pub enum Error {
    Parse(ParseError),
    Schema(SchemaError),
    Encode(EncodeError),
    Decode(DecodeError),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Parse(err) => write!(f, "parse error: {err}"),
            Error::Schema(err) => write!(f, "schema error: {err}"),
            Error::Encode(err) => write!(f, "encode error: {err}"),
            Error::Decode(err) => write!(f, "decode error: {err}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Schema(err) => Some(err),
            Error::Encode(err) => Some(err),
            Error::Decode(err) => Some(err),
        }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Self::Schema(err)
    }
}

impl From<EncodeError> for Error {
    fn from(err: EncodeError) -> Self {
        Self::Encode(err)
    }
}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Self {
        Self::Decode(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use super::*;

    fn dummy<T: Send + Sync>() {}

    #[test]
    fn errors_threadsafe() {
        dummy::<SchemaError>();
        dummy::<Error>();
    }

    #[test]
    fn recursive_field_message() {
        let err = SchemaError::RecursiveField {
            ty: "Node".into(),
            field: "next".into(),
        };
        assert!(err.to_string().contains("recursive field must be optional"));
    }
}
