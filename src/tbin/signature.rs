//! Shapes of encoded values
//!
//! A [`Signature`] is the minimal description of a type that the wire
//! format needs: enough to lay values out untagged, and to reconstruct the
//! layout on the reading side. Its [`key`](Signature::key) is a compact flat
//! rendering (`Struct{x:Int32,y:Int32}`, `Array<String>`) under which a
//! session interns the shape, so two types of identical layout share a tag.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use lazy_static::lazy_static;

use super::tag;

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Signature {
    Null,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Bytes,
    String,
    Timestamp,
    Symbol,
    Uuid,
    /// Position whose values carry their own tags
    Any,
    /// `None` for the generic array of tagged items
    Array(Option<Arc<Signature>>),
    /// `None` for the generic map of tagged keys and items
    Map(Option<(Arc<Signature>, Arc<Signature>)>),
    /// `None` for the generic struct of symbol-named tagged fields
    Struct(Option<Vec<FieldSignature>>),
    Union(Vec<Arc<Signature>>),
    Enum(Vec<String>),
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct FieldSignature {
    pub name: String,
    /// For an optional field, the declared type of its values, which may
    /// be `Any`
    pub ty: Arc<Signature>,
    /// Optional fields are laid out as `Any`, so that absence is a `Null`
    pub optional: bool,
}

impl FieldSignature {
    pub fn new(name: impl Into<String>, ty: Signature) -> Self {
        Self {
            name: name.into(),
            ty: Arc::new(ty),
            optional: false,
        }
    }

    /// Optional field of undeclared type.
    pub fn optional(name: impl Into<String>) -> Self {
        Self::optional_of(name, Signature::Any)
    }

    /// Optional field holding values of shape `ty`.
    ///
    /// The field is laid out as `Any` all the same, but encoding defines
    /// `ty` ahead of the enclosing struct.
    pub fn optional_of(name: impl Into<String>, ty: Signature) -> Self {
        Self {
            name: name.into(),
            ty: Arc::new(ty),
            optional: true,
        }
    }
}

lazy_static! {
    static ref FIXED: Vec<Arc<Signature>> = [
        Signature::Null,
        Signature::Bool,
        Signature::Int8,
        Signature::Int16,
        Signature::Int32,
        Signature::Int64,
        Signature::Float32,
        Signature::Float64,
        Signature::Bytes,
        Signature::String,
        Signature::Timestamp,
        Signature::Symbol,
        Signature::Uuid,
        Signature::Array(None),
        Signature::Map(None),
        Signature::Struct(None),
        Signature::Any,
    ]
    .into_iter()
    .map(Arc::new)
    .collect();
}

impl Signature {
    pub fn array(items: Signature) -> Self {
        Self::Array(Some(Arc::new(items)))
    }

    pub fn map(keys: Signature, items: Signature) -> Self {
        Self::Map(Some((Arc::new(keys), Arc::new(items))))
    }

    pub fn structure(fields: Vec<FieldSignature>) -> Self {
        Self::Struct(Some(fields))
    }

    pub fn union(variants: Vec<Signature>) -> Self {
        Self::Union(variants.into_iter().map(Arc::new).collect())
    }

    pub fn enumeration<S: Into<String>>(symbols: impl IntoIterator<Item = S>) -> Self {
        Self::Enum(symbols.into_iter().map(Into::into).collect())
    }

    /// Shared instance for a fixed tag in `0x00..=0x10`.
    pub fn fixed(tag: u32) -> Option<Arc<Signature>> {
        FIXED.get(tag as usize).cloned()
    }

    /// The fixed tag of this shape's kind.
    #[must_use]
    pub fn tag(&self) -> u32 {
        match self {
            Signature::Null => tag::NULL,
            Signature::Bool => tag::BOOL,
            Signature::Int8 => tag::INT8,
            Signature::Int16 => tag::INT16,
            Signature::Int32 => tag::INT32,
            Signature::Int64 => tag::INT64,
            Signature::Float32 => tag::FLOAT32,
            Signature::Float64 => tag::FLOAT64,
            Signature::Bytes => tag::BYTES,
            Signature::String => tag::STRING,
            Signature::Timestamp => tag::TIMESTAMP,
            Signature::Symbol => tag::SYMBOL,
            Signature::Uuid => tag::UUID,
            Signature::Any => tag::ANY,
            Signature::Array(_) => tag::ARRAY,
            Signature::Map(_) => tag::MAP,
            Signature::Struct(_) => tag::STRUCT,
            Signature::Union(_) => tag::UNION,
            Signature::Enum(_) => tag::ENUM,
        }
    }

    /// Whether values of this shape are introduced by a user tag bound
    /// through a definition, rather than by a fixed tag.
    #[must_use]
    pub fn needs_definition(&self) -> bool {
        match self {
            Signature::Array(items) => items.is_some(),
            Signature::Map(entries) => entries.is_some(),
            Signature::Struct(fields) => fields.is_some(),
            Signature::Union(_) | Signature::Enum(_) => true,
            _ => false,
        }
    }

    /// Flat rendering of the shape, used to intern it within a session.
    pub fn key(&self) -> String {
        let mut s = String::new();
        self.write_key(&mut s, usize::MAX);
        s
    }

    /// The key cut short after `limit` bytes, for messages about shapes
    /// read from untrusted input.
    pub fn key_within(&self, limit: usize) -> String {
        let mut s = String::new();
        self.write_key(&mut s, limit);
        if s.len() > limit {
            let mut end = limit;
            while !s.is_char_boundary(end) {
                end -= 1;
            }
            s.truncate(end);
            s.push_str("...");
        }
        s
    }

    fn write_key(&self, out: &mut String, limit: usize) {
        if out.len() > limit {
            return;
        }
        match self {
            Signature::Array(Some(items)) => {
                out.push_str("Array<");
                items.write_key(out, limit);
                out.push('>');
            }
            Signature::Map(Some((keys, items))) => {
                out.push_str("Map<");
                keys.write_key(out, limit);
                out.push(',');
                items.write_key(out, limit);
                out.push('>');
            }
            Signature::Struct(Some(fields)) => {
                out.push_str("Struct{");
                for (i, f) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str(&f.name);
                    out.push(':');
                    f.ty.write_key(out, limit);
                }
                out.push('}');
            }
            Signature::Union(variants) => {
                out.push_str("Union<");
                for (i, v) in variants.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    v.write_key(out, limit);
                }
                out.push('>');
            }
            Signature::Enum(symbols) => {
                out.push_str("Enum<");
                out.push_str(&symbols.join(","));
                out.push('>');
            }
            other => out.push_str(&tag::tag_name(other.tag())),
        }
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}
