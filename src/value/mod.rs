//! Dynamic data values and RDL data primitives
//!
//! # Overview
//!
//! [`Value`] is the fully-dynamic representation of RDL data. It is what the
//! TBin decoder produces when no target type is known (generic decoding), and
//! what the [validator](crate::validate) inspects when checking data against a
//! schema type. Every variant corresponds to an RDL base type, with the two
//! string-keyed containers `Map` and `Struct` kept distinct so that a
//! generically decoded value can be re-encoded in the same shape it was read
//! from.
//!
//! Equality on `Value` is strict about representation: `Int8(23)` and
//! `Int16(23)` are different values, as are `Float64(23.0)` and `Int32(23)`,
//! and a `Symbol` never equals a `String` with the same text. Map and struct
//! equality ignore key order.
//!
//! # Primitives
//!
//! The remaining RDL primitives that have no exact counterpart in `std` are
//! defined in submodules and re-exported here:
//!   * [`Symbol`], an interned name
//!   * [`Timestamp`], a UTC instant with millisecond textual precision
//!   * [`Uuid`] (from the `uuid` crate) with the RDL-specific [`parse_uuid`]
//!   * [`Bytes`], an opaque byte-sequence

pub mod symbol;
pub mod timestamp;
pub mod uuid;

#[cfg(feature = "serde_impls")]
mod serde_impls;

use indexmap::IndexMap;

pub use self::symbol::Symbol;
pub use self::timestamp::Timestamp;
pub use self::uuid::{parse_uuid, Uuid};

/// Opaque variable-length byte-sequence
///
/// Distinguishes RDL `Bytes` from an array of `Int8` values, which a bare
/// `Vec<i8>` would represent.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[repr(transparent)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    #[inline]
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(buf: Vec<u8>) -> Self {
        Self(buf)
    }
}

impl From<&[u8]> for Bytes {
    fn from(buf: &[u8]) -> Self {
        Self(buf.to_vec())
    }
}

/// Dynamically-typed RDL value
#[derive(Clone, PartialEq, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Bytes(Vec<u8>),
    String(String),
    Symbol(Symbol),
    Timestamp(Timestamp),
    Uuid(Uuid),
    Array(Vec<Value>),
    Map(IndexMap<String, Value>),
    Struct(IndexMap<String, Value>),
}

impl Value {
    /// Constructs a `Value::Struct` from an iterator of name/value pairs.
    pub fn structure<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Constructs a `Value::Map` from an iterator of key/value pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn array<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::Array(items.into_iter().collect())
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the text of a `String` or `Symbol` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            Value::Symbol(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Returns the entries of either string-keyed container.
    pub fn as_entries(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(m) | Value::Struct(m) => Some(m),
            _ => None,
        }
    }

    /// Name of the variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int8(_) => "Int8",
            Value::Int16(_) => "Int16",
            Value::Int32(_) => "Int32",
            Value::Int64(_) => "Int64",
            Value::Float32(_) => "Float32",
            Value::Float64(_) => "Float64",
            Value::Bytes(_) => "Bytes",
            Value::String(_) => "String",
            Value::Symbol(_) => "Symbol",
            Value::Timestamp(_) => "Timestamp",
            Value::Uuid(_) => "UUID",
            Value::Array(_) => "Array",
            Value::Map(_) => "Map",
            Value::Struct(_) => "Struct",
        }
    }
}

macro_rules! value_from {
    ( $( $t:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$t> for Value {
                fn from(x: $t) -> Self {
                    Value::$variant(x)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    String => String,
    Symbol => Symbol,
    Timestamp => Timestamp,
    Uuid => Uuid,
    Vec<Value> => Array,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b.0)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(x: Option<T>) -> Self {
        x.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn representation_sensitive_equality() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_ne!(Value::Bool(true), Value::Bool(false));
        assert_eq!(Value::Int32(23), Value::Int32(23));
        assert_ne!(Value::Int32(23), Value::Int32(57));
        assert_ne!(Value::Float64(23.0), Value::Int32(23));
        assert_ne!(Value::Int8(23), Value::Int16(23));
        assert_ne!(Value::Float32(23.57), Value::Float64(23.57));
        assert_eq!(Value::from("foo"), Value::from("foo"));
        assert_ne!(Value::from("foo"), Value::Symbol(Symbol::from("foo")));
        assert_eq!(Value::Bytes(vec![1, 2]), Value::Bytes(vec![1, 2]));
        assert_ne!(Value::Bytes(vec![1, 2]), Value::Bytes(vec![1, 2, 3]));
    }

    #[test]
    fn timestamp_and_uuid_equality() {
        let ts1 = Timestamp::parse("2015-05-17T01:37:09.534Z").unwrap();
        let ts2 = Timestamp::parse("2015-05-17T01:37:09.534Z").unwrap();
        assert_eq!(Value::from(ts1), Value::from(ts2));
        assert_ne!(Value::from(ts1), Value::from("2015-05-17T01:37:09.534Z"));

        let u1 = parse_uuid("88cfd476-fc35-11e4-acaa-14109fe4729f").unwrap();
        let u2 = parse_uuid("9f57aa86-fc35-11e4-9a55-14109fe4729f").unwrap();
        assert_ne!(Value::from(u1), Value::from(u2));
        assert_ne!(Value::from(u2), Value::from("9f57aa86-fc35-11e4-9a55-14109fe4729f"));
    }

    #[test]
    fn container_equality_ignores_order() {
        let a = Value::structure([("x", Value::Int32(1)), ("y", Value::Int32(2))]);
        let b = Value::structure([("y", Value::Int32(2)), ("x", Value::Int32(1))]);
        assert_eq!(a, b);
        assert_ne!(a, Value::map([("x", Value::Int32(1)), ("y", Value::Int32(2))]));
    }

    #[test]
    fn option_into_value() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(5i64)), Value::Int64(5));
    }
}
