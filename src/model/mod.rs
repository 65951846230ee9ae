//! In-memory type graph of an RDL schema
//!
//! # Overview
//!
//! A [`Schema`] is an ordered collection of [`Type`] definitions and
//! [`Resource`] declarations. It is produced either by the textual
//! [parser](crate::schema::parse_rdl) or programmatically by the
//! [builder](crate::schema::builder), and is treated as immutable afterwards.
//!
//! Every user-defined type carries a [`TypeDef`] header naming its supertype,
//! which is either one of the eighteen [`BaseType`]s or a previously defined
//! user type. Restriction subtypes (`StringTypeDef`, `NumberTypeDef`, ...)
//! add the constraints appropriate to their base; the constraints of the
//! whole supertype chain apply to a value, not only those of the leaf.
//!
//! Type references are plain strings. Base-type keywords are matched without
//! regard to letter case through [`BaseType::from_keyword`], which is the
//! only place where that canonicalization happens.

pub mod resource;

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use indexmap::IndexMap;

use crate::tbin::{Decoder, DecodeResult, EncodeResult, Encoder, Parser, Signature, Target};
use crate::value::Value;
use crate::{Marshal, Unmarshal};

pub use self::resource::{ExceptionDef, Resource, ResourceAuth, ResourceInput, ResourceOutput};

/// Extended annotations, keyed by `x_`-prefixed names
pub type Annotations = IndexMap<String, String>;

/// The primitive and structural kinds every RDL type ultimately derives from
#[derive(Marshal, Unmarshal, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
pub enum BaseType {
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
    #[tbin(name = "UUID")]
    #[cfg_attr(feature = "serde_impls", serde(rename = "UUID"))]
    Uuid,
    Array,
    Map,
    Struct,
    Enum,
    Union,
    Any,
}

impl BaseType {
    pub const ALL: [BaseType; 18] = [
        BaseType::Bool,
        BaseType::Int8,
        BaseType::Int16,
        BaseType::Int32,
        BaseType::Int64,
        BaseType::Float32,
        BaseType::Float64,
        BaseType::Bytes,
        BaseType::String,
        BaseType::Timestamp,
        BaseType::Symbol,
        BaseType::Uuid,
        BaseType::Array,
        BaseType::Map,
        BaseType::Struct,
        BaseType::Enum,
        BaseType::Union,
        BaseType::Any,
    ];

    /// Canonical spelling of the keyword
    pub const fn name(self) -> &'static str {
        match self {
            BaseType::Bool => "Bool",
            BaseType::Int8 => "Int8",
            BaseType::Int16 => "Int16",
            BaseType::Int32 => "Int32",
            BaseType::Int64 => "Int64",
            BaseType::Float32 => "Float32",
            BaseType::Float64 => "Float64",
            BaseType::Bytes => "Bytes",
            BaseType::String => "String",
            BaseType::Timestamp => "Timestamp",
            BaseType::Symbol => "Symbol",
            BaseType::Uuid => "UUID",
            BaseType::Array => "Array",
            BaseType::Map => "Map",
            BaseType::Struct => "Struct",
            BaseType::Enum => "Enum",
            BaseType::Union => "Union",
            BaseType::Any => "Any",
        }
    }

    /// Matches a base-type keyword in any letter case.
    pub fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|b| b.name().eq_ignore_ascii_case(word))
    }

    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            BaseType::Int8 | BaseType::Int16 | BaseType::Int32 | BaseType::Int64
        )
    }

    pub const fn is_numeric(self) -> bool {
        self.is_integral() || matches!(self, BaseType::Float32 | BaseType::Float64)
    }
}

impl Display for BaseType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric bound of a [`NumberTypeDef`], tagged by width
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
pub enum Number {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
}

impl Number {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int8(x) => f64::from(x),
            Number::Int16(x) => f64::from(x),
            Number::Int32(x) => f64::from(x),
            Number::Int64(x) => x as f64,
            Number::Float32(x) => f64::from(x),
            Number::Float64(x) => x,
        }
    }

    /// The bound as an integer, for the integral widths only.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Number::Int8(x) => Some(i64::from(x)),
            Number::Int16(x) => Some(i64::from(x)),
            Number::Int32(x) => Some(i64::from(x)),
            Number::Int64(x) => Some(x),
            Number::Float32(_) | Number::Float64(_) => None,
        }
    }

    /// Orders two bounds, exactly when both are integral.
    pub fn compare(&self, other: &Number) -> Option<Ordering> {
        match (self.as_i64(), other.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }

    pub fn base_type(&self) -> BaseType {
        match self {
            Number::Int8(_) => BaseType::Int8,
            Number::Int16(_) => BaseType::Int16,
            Number::Int32(_) => BaseType::Int32,
            Number::Int64(_) => BaseType::Int64,
            Number::Float32(_) => BaseType::Float32,
            Number::Float64(_) => BaseType::Float64,
        }
    }

    /// Interprets numeric literal text at the width of `base`.
    ///
    /// Returns `None` when `base` is not numeric or the literal does not fit.
    pub fn parse_as(base: BaseType, text: &str) -> Option<Self> {
        Some(match base {
            BaseType::Int8 => Number::Int8(text.parse().ok()?),
            BaseType::Int16 => Number::Int16(text.parse().ok()?),
            BaseType::Int32 => Number::Int32(text.parse().ok()?),
            BaseType::Int64 => Number::Int64(text.parse().ok()?),
            BaseType::Float32 => Number::Float32(text.parse().ok()?),
            BaseType::Float64 => Number::Float64(text.parse().ok()?),
            _ => return None,
        })
    }
}

impl Display for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::Int8(x) => write!(f, "{x}"),
            Number::Int16(x) => write!(f, "{x}"),
            Number::Int32(x) => write!(f, "{x}"),
            Number::Int64(x) => write!(f, "{x}"),
            Number::Float32(x) => write!(f, "{x}"),
            Number::Float64(x) => write!(f, "{x}"),
        }
    }
}

/// Bounds travel as a union of the six widths. Reading also accepts a bare
/// number of any width, whose tag then decides the variant.
impl Marshal for Number {
    fn signature() -> Signature {
        Signature::union(vec![
            Signature::Int8,
            Signature::Int16,
            Signature::Int32,
            Signature::Int64,
            Signature::Float32,
            Signature::Float64,
        ])
    }

    fn marshal_value<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
        match *self {
            Number::Int8(x) => {
                enc.write_uvarint(1)?;
                enc.write_int8(x)
            }
            Number::Int16(x) => {
                enc.write_uvarint(2)?;
                enc.write_int16(x)
            }
            Number::Int32(x) => {
                enc.write_uvarint(3)?;
                enc.write_int32(x)
            }
            Number::Int64(x) => {
                enc.write_uvarint(4)?;
                enc.write_int64(x)
            }
            Number::Float32(x) => {
                enc.write_uvarint(5)?;
                enc.write_float32(x)
            }
            Number::Float64(x) => {
                enc.write_uvarint(6)?;
                enc.write_float64(x)
            }
        }
    }
}

impl Unmarshal for Number {
    fn unmarshal_value<P: Parser>(dec: &mut Decoder<'_, P>, sig: &Signature) -> DecodeResult<Self> {
        if let Some(n) = dec.read_indirect(sig, "Number")? {
            return Ok(n);
        }
        match sig {
            Signature::Union(_) => {
                let (_, variant) = dec.read_variant(sig, "Number")?;
                match variant.as_ref() {
                    Signature::Union(_) => Err(dec.mismatch("Number", &variant)),
                    shape => Self::unmarshal_value(dec, shape),
                }
            }
            Signature::Int8 => i8::unmarshal_value(dec, sig).map(Number::Int8),
            Signature::Int16 => i16::unmarshal_value(dec, sig).map(Number::Int16),
            Signature::Int32 => i32::unmarshal_value(dec, sig).map(Number::Int32),
            Signature::Int64 => i64::unmarshal_value(dec, sig).map(Number::Int64),
            Signature::Float32 => f32::unmarshal_value(dec, sig).map(Number::Float32),
            Signature::Float64 => f64::unmarshal_value(dec, sig).map(Number::Float64),
            _ => Err(dec.mismatch("Number", sig)),
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Int8(x) => Value::Int8(x),
            Number::Int16(x) => Value::Int16(x),
            Number::Int32(x) => Value::Int32(x),
            Number::Int64(x) => Value::Int64(x),
            Number::Float32(x) => Value::Float32(x),
            Number::Float64(x) => Value::Float64(x),
        }
    }
}

/// Header shared by every user-defined type
///
/// A type that adds nothing to its supertype beyond a new name (and possibly
/// a comment or annotations) is represented by this header alone, under the
/// name [`AliasTypeDef`].
#[derive(Marshal, Unmarshal, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeDef {
    #[tbin(name = "type")]
    #[cfg_attr(feature = "serde_impls", serde(rename = "type"))]
    pub supertype: String,
    pub name: String,
    #[cfg_attr(feature = "serde_impls", serde(default, skip_serializing_if = "Option::is_none"))]
    pub comment: Option<String>,
    #[cfg_attr(feature = "serde_impls", serde(default, skip_serializing_if = "IndexMap::is_empty"))]
    pub annotations: Annotations,
}

impl TypeDef {
    pub fn new(supertype: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            supertype: supertype.into(),
            name: name.into(),
            comment: None,
            annotations: Annotations::new(),
        }
    }
}

pub type AliasTypeDef = TypeDef;

#[derive(Marshal, Unmarshal, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde_impls", serde(rename_all = "camelCase"))]
pub struct StringTypeDef {
    #[cfg_attr(feature = "serde_impls", serde(flatten))]
    pub def: TypeDef,
    pub pattern: Option<String>,
    pub values: Option<Vec<String>>,
    #[tbin(name = "minSize")]
    pub min_size: Option<i32>,
    #[tbin(name = "maxSize")]
    pub max_size: Option<i32>,
}

#[derive(Marshal, Unmarshal, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde_impls", serde(rename_all = "camelCase"))]
pub struct BytesTypeDef {
    #[cfg_attr(feature = "serde_impls", serde(flatten))]
    pub def: TypeDef,
    pub size: Option<i32>,
    #[tbin(name = "minSize")]
    pub min_size: Option<i32>,
    #[tbin(name = "maxSize")]
    pub max_size: Option<i32>,
}

#[derive(Marshal, Unmarshal, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
pub struct NumberTypeDef {
    #[cfg_attr(feature = "serde_impls", serde(flatten))]
    pub def: TypeDef,
    pub min: Option<Number>,
    pub max: Option<Number>,
}

#[derive(Marshal, Unmarshal, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde_impls", serde(rename_all = "camelCase"))]
pub struct ArrayTypeDef {
    #[cfg_attr(feature = "serde_impls", serde(flatten))]
    pub def: TypeDef,
    pub items: String,
    pub size: Option<i32>,
    #[tbin(name = "minSize")]
    pub min_size: Option<i32>,
    #[tbin(name = "maxSize")]
    pub max_size: Option<i32>,
}

#[derive(Marshal, Unmarshal, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde_impls", serde(rename_all = "camelCase"))]
pub struct MapTypeDef {
    #[cfg_attr(feature = "serde_impls", serde(flatten))]
    pub def: TypeDef,
    pub keys: String,
    pub items: String,
    pub size: Option<i32>,
    #[tbin(name = "minSize")]
    pub min_size: Option<i32>,
    #[tbin(name = "maxSize")]
    pub max_size: Option<i32>,
}

/// One field of a struct type
///
/// For fields whose type is `Array` or `Map`, `items` and `keys` carry the
/// element types written as generic arguments (`Array<String> tags`).
#[derive(Marshal, Unmarshal, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
pub struct StructFieldDef {
    pub name: String,
    #[tbin(name = "type")]
    #[cfg_attr(feature = "serde_impls", serde(rename = "type"))]
    pub ty: String,
    pub optional: bool,
    pub default: Option<Value>,
    pub comment: Option<String>,
    pub items: Option<String>,
    pub keys: Option<String>,
    #[cfg_attr(feature = "serde_impls", serde(default, skip_serializing_if = "IndexMap::is_empty"))]
    pub annotations: Annotations,
}

impl StructFieldDef {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            ..Self::default()
        }
    }
}

#[derive(Marshal, Unmarshal, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
pub struct StructTypeDef {
    #[cfg_attr(feature = "serde_impls", serde(flatten))]
    pub def: TypeDef,
    pub fields: Vec<StructFieldDef>,
    pub closed: bool,
}

#[derive(Marshal, Unmarshal, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
pub struct EnumElementDef {
    pub symbol: String,
    pub comment: Option<String>,
    #[cfg_attr(feature = "serde_impls", serde(default, skip_serializing_if = "IndexMap::is_empty"))]
    pub annotations: Annotations,
}

#[derive(Marshal, Unmarshal, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
pub struct EnumTypeDef {
    #[cfg_attr(feature = "serde_impls", serde(flatten))]
    pub def: TypeDef,
    pub elements: Vec<EnumElementDef>,
}

#[derive(Marshal, Unmarshal, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
pub struct UnionTypeDef {
    #[cfg_attr(feature = "serde_impls", serde(flatten))]
    pub def: TypeDef,
    pub variants: Vec<String>,
}

/// A type definition, tagged by the shape of its restrictions
#[derive(Marshal, Unmarshal, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
pub enum Type {
    BaseType(BaseType),
    Alias(AliasTypeDef),
    String(StringTypeDef),
    Bytes(BytesTypeDef),
    Number(NumberTypeDef),
    Array(ArrayTypeDef),
    Map(MapTypeDef),
    Struct(StructTypeDef),
    Enum(EnumTypeDef),
    Union(UnionTypeDef),
}

impl Type {
    /// The common header, absent for base types.
    pub fn def(&self) -> Option<&TypeDef> {
        Some(match self {
            Type::BaseType(_) => return None,
            Type::Alias(t) => t,
            Type::String(t) => &t.def,
            Type::Bytes(t) => &t.def,
            Type::Number(t) => &t.def,
            Type::Array(t) => &t.def,
            Type::Map(t) => &t.def,
            Type::Struct(t) => &t.def,
            Type::Enum(t) => &t.def,
            Type::Union(t) => &t.def,
        })
    }

    pub fn def_mut(&mut self) -> Option<&mut TypeDef> {
        Some(match self {
            Type::BaseType(_) => return None,
            Type::Alias(t) => t,
            Type::String(t) => &mut t.def,
            Type::Bytes(t) => &mut t.def,
            Type::Number(t) => &mut t.def,
            Type::Array(t) => &mut t.def,
            Type::Map(t) => &mut t.def,
            Type::Struct(t) => &mut t.def,
            Type::Enum(t) => &mut t.def,
            Type::Union(t) => &mut t.def,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Type::BaseType(b) => b.name(),
            other => other.def().map_or("", |d| d.name.as_str()),
        }
    }

    /// Name of the supertype; a base type is its own supertype.
    pub fn supertype(&self) -> &str {
        match self {
            Type::BaseType(b) => b.name(),
            other => other.def().map_or("", |d| d.supertype.as_str()),
        }
    }

    pub fn comment(&self) -> Option<&str> {
        self.def().and_then(|d| d.comment.as_deref())
    }

    pub fn annotations(&self) -> Option<&Annotations> {
        self.def().map(|d| &d.annotations)
    }

    /// Name of the restriction shape, matching the RDL self-schema.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Type::BaseType(_) => "BaseType",
            Type::Alias(_) => "AliasTypeDef",
            Type::String(_) => "StringTypeDef",
            Type::Bytes(_) => "BytesTypeDef",
            Type::Number(_) => "NumberTypeDef",
            Type::Array(_) => "ArrayTypeDef",
            Type::Map(_) => "MapTypeDef",
            Type::Struct(_) => "StructTypeDef",
            Type::Enum(_) => "EnumTypeDef",
            Type::Union(_) => "UnionTypeDef",
        }
    }
}

/// Container for types and resources
#[derive(Marshal, Unmarshal, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
pub struct Schema {
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub version: Option<i32>,
    pub comment: Option<String>,
    pub types: Vec<Type>,
    pub resources: Vec<Resource>,
    pub base: Option<String>,
    #[cfg_attr(feature = "serde_impls", serde(default, skip_serializing_if = "IndexMap::is_empty"))]
    pub annotations: Annotations,
}

impl Schema {
    /// Linear lookup of a user-defined type by exact name.
    pub fn find_type(&self, name: &str) -> Option<&Type> {
        self.types.iter().find(|t| t.name() == name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keyword_canonicalization() {
        assert_eq!(BaseType::from_keyword("uuid"), Some(BaseType::Uuid));
        assert_eq!(BaseType::from_keyword("ARRAY"), Some(BaseType::Array));
        assert_eq!(BaseType::from_keyword("sTrInG"), Some(BaseType::String));
        assert_eq!(BaseType::from_keyword("Strings"), None);
        for b in BaseType::ALL {
            assert_eq!(BaseType::from_keyword(b.name()), Some(b));
        }
    }

    #[test]
    fn number_widths() {
        assert_eq!(Number::parse_as(BaseType::Int8, "127"), Some(Number::Int8(127)));
        assert_eq!(Number::parse_as(BaseType::Int8, "128"), None);
        assert_eq!(Number::parse_as(BaseType::Float32, "1.5"), Some(Number::Float32(1.5)));
        assert_eq!(Number::parse_as(BaseType::String, "1"), None);
        assert_eq!(Number::Float64(3.0).to_string(), "3");
    }

    #[test]
    fn number_ordering_is_exact_for_integers() {
        let hi = Number::Int64(9_007_199_254_740_993);
        let lo = Number::Int64(9_007_199_254_740_992);
        assert_eq!(hi.as_f64(), lo.as_f64());
        assert_eq!(lo.compare(&hi), Some(Ordering::Less));
        assert_eq!(Number::Int8(3).compare(&Number::Int64(3)), Some(Ordering::Equal));
        assert_eq!(Number::Float32(2.5).compare(&Number::Int32(2)), Some(Ordering::Greater));
        assert_eq!(Number::Float64(f64::NAN).compare(&Number::Int32(2)), None);
        assert_eq!(Number::Float64(1.0).as_i64(), None);
    }

    #[test]
    fn type_accessors() {
        let mut def = TypeDef::new("String", "Name");
        def.comment = Some("a name".into());
        let t = Type::String(StringTypeDef {
            def,
            pattern: Some("[a-z]+".into()),
            ..StringTypeDef::default()
        });
        assert_eq!(t.name(), "Name");
        assert_eq!(t.supertype(), "String");
        assert_eq!(t.comment(), Some("a name"));
        assert_eq!(t.variant_name(), "StringTypeDef");
        assert_eq!(Type::BaseType(BaseType::Uuid).name(), "UUID");
    }

    #[test]
    fn schemas_travel_as_tbin() {
        use crate::schema::rdl_schema;
        use crate::tbin::{marshal, unmarshal};

        let bytes = marshal(rdl_schema()).unwrap();
        assert_eq!(&unmarshal::<Schema>(&bytes).unwrap(), rdl_schema());

        let mut schema = Schema {
            name: Some("people".into()),
            ..Schema::default()
        };
        schema.types.push(Type::BaseType(BaseType::Uuid));
        for (name, base, min, max) in [
            ("Small", "Int8", Some(Number::Int8(-3)), Some(Number::Int8(7))),
            ("Ratio", "Float32", Some(Number::Float32(0.5)), None),
            ("Big", "Int64", None, Some(Number::Int64(9_007_199_254_740_993))),
        ] {
            schema.types.push(Type::Number(NumberTypeDef {
                def: TypeDef::new(base, name),
                min,
                max,
            }));
        }
        let mut id = StructFieldDef::new("id", "Big");
        id.optional = true;
        id.default = Some(Value::Int64(-1));
        let mut user = TypeDef::new("Struct", "User");
        user.annotations.insert("x_owner".into(), "accounts".into());
        schema.types.push(Type::Struct(StructTypeDef {
            def: user,
            fields: vec![StructFieldDef::new("name", "String"), id],
            closed: true,
        }));
        let mut r = Resource::new("User", "GET", "/users/{name}");
        r.is_async = Some(true);
        r.inputs.push(ResourceInput {
            name: "name".into(),
            ty: "String".into(),
            path_param: true,
            ..ResourceInput::default()
        });
        r.auth = Some(ResourceAuth {
            authenticate: true,
            action: Some("read".into()),
            ..ResourceAuth::default()
        });
        r.exceptions.insert(
            "NOT_FOUND".into(),
            ExceptionDef {
                ty: "User".into(),
                comment: None,
            },
        );
        schema.resources.push(r);

        let bytes = marshal(&schema).unwrap();
        assert_eq!(unmarshal::<Schema>(&bytes).unwrap(), schema);
    }

    #[test]
    fn numbers_read_from_bare_values() {
        use crate::tbin::{marshal, unmarshal};

        assert_eq!(unmarshal::<Number>(&marshal(&9i64).unwrap()).unwrap(), Number::Int64(9));
        assert_eq!(unmarshal::<Number>(&marshal(&1.5f64).unwrap()).unwrap(), Number::Float64(1.5));
        assert_eq!(unmarshal::<Number>(&marshal(&Number::Int16(-2)).unwrap()).unwrap(), Number::Int16(-2));
        assert!(unmarshal::<Number>(&marshal("7").unwrap()).is_err());
    }
}
