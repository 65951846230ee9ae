//! Schema model, validator and binary codec for the RDL interface-description language
//!
//! # Overview
//!
//! RDL (Resource Description Language) describes the types and resources of a
//! service interface: named types derived from a fixed set of base types,
//! restricted by options such as patterns, sizes and value ranges, composed
//! into structs, enums, unions, arrays and maps; and REST-style resources
//! whose inputs and outputs refer to those types.
//!
//! This crate provides
//!   * the in-memory type graph of a schema ([`model`]), which collaborating
//!     tools such as code generators consume,
//!   * a parser for RDL text, a programmatic builder with its consistency
//!     checks, and a printer back to text ([`schema`]),
//!   * read-only lookups over a schema's types ([`registry`]),
//!   * validation of dynamic data against schema types ([`validate`]),
//!   * TBin, a compact self-describing binary encoding of RDL values
//!     ([`tbin`]), with derivable [`Marshal`] and [`Unmarshal`] traits for
//!     static Rust types and the dynamically-typed [`Value`] as fallback.
//!
//! # Example
//!
//! ```ignore
//! use rdl::{schema::parse_rdl, validate::validate, Value};
//!
//! let schema = parse_rdl(r#"type Foo String (pattern="[a-z]*"); type Bar Foo (maxSize=4);"#)?;
//! assert!(validate(&schema, "Bar", &Value::from("abcd")).valid);
//! assert!(!validate(&schema, "Bar", &Value::from("abcdef")).valid);
//! ```
//!
//! # Features
//!
//!   * `serde_impls`: serde support for the model types and [`Value`]
//!   * `check_complete_parse`: [`tbin::unmarshal`] rejects input with bytes
//!     left over after the decoded value

extern crate self as rdl;

pub mod error;
pub mod model;
pub mod prelude;
pub mod registry;
pub mod schema;
pub mod tbin;
pub mod validate;
pub mod value;

pub use crate::error::{Error, Result, SchemaError};
pub use crate::tbin::{Marshal, Unmarshal};
pub use crate::value::Value;

pub use marshal_derive::Marshal;
pub use unmarshal_derive::Unmarshal;
