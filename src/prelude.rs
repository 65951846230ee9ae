//! Glob-importable set of the types and functions most uses of the crate need

pub use crate::model::{BaseType, Schema, Type};
pub use crate::registry::TypeRegistry;
pub use crate::schema::builder::{BuildMode, SchemaBuilder};
pub use crate::schema::{parse_rdl, unparse_rdl};
pub use crate::tbin::{Decoder, Encoder, Session, SliceParser};
pub use crate::validate::{validate, Validatable, Validation};
pub use crate::value::{Bytes, Symbol, Timestamp, Uuid, Value};
pub use crate::{Marshal, Unmarshal};
