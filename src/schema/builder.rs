//! Programmatic schema construction
//!
//! Each kind of type has its own builder, and [`SchemaBuilder`] collects the
//! finished types and resources. Setters take `&mut self` and return
//! `&mut Self`, so builders can be used either by chaining or statement by
//! statement; `build` borrows and may be called more than once.
//!
//! ```
//! use rdl::schema::builder::{SchemaBuilder, StructTypeBuilder};
//!
//! let mut sb = SchemaBuilder::new("test");
//! let mut tb = StructTypeBuilder::new("Struct", "Point");
//! tb.field("x", "Int32", false, None, "").field("y", "Int32", false, None, "");
//! sb.add_type(tb.build());
//! let schema = sb.build_paranoid().unwrap();
//! assert_eq!(schema.types.len(), 1);
//! ```
//!
//! Supertype names are stored as given; base-type keywords in any letter
//! case resolve through [`BaseType::from_keyword`](crate::model::BaseType::from_keyword).

use tracing::debug;

use super::check::TypeChecker;
use crate::error::SchemaError;
use crate::model::{
    ArrayTypeDef, BytesTypeDef, EnumElementDef, EnumTypeDef, MapTypeDef, Number, NumberTypeDef,
    Resource, Schema, StringTypeDef, StructFieldDef, StructTypeDef, Type, TypeDef, UnionTypeDef,
};
use crate::value::Value;

/// How much checking `SchemaBuilder::build_with` performs
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum BuildMode {
    /// Assemble the schema as given
    #[default]
    Lenient,
    /// Run the full structural checker over types and resources
    Paranoid,
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_owned())
    }
}

#[derive(Clone, Debug, Default)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: Schema {
                name: Some(name.into()),
                ..Schema::default()
            },
        }
    }

    pub fn namespace(&mut self, ns: impl Into<String>) -> &mut Self {
        self.schema.namespace = Some(ns.into());
        self
    }

    pub fn version(&mut self, version: i32) -> &mut Self {
        self.schema.version = Some(version);
        self
    }

    pub fn comment(&mut self, comment: &str) -> &mut Self {
        self.schema.comment = non_empty(comment);
        self
    }

    pub fn base(&mut self, base: impl Into<String>) -> &mut Self {
        self.schema.base = Some(base.into());
        self
    }

    pub fn annotate(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.schema.annotations.insert(key.into(), value.into());
        self
    }

    pub fn add_type(&mut self, t: Type) -> &mut Self {
        self.schema.types.push(t);
        self
    }

    pub fn add_resource(&mut self, r: Resource) -> &mut Self {
        self.schema.resources.push(r);
        self
    }

    /// Assembles the schema without cross-checking anything.
    pub fn build(&self) -> Schema {
        self.schema.clone()
    }

    /// Assembles the schema, failing on the first structural violation.
    pub fn build_paranoid(&self) -> Result<Schema, SchemaError> {
        let mut checker = TypeChecker::new();
        for t in &self.schema.types {
            checker.admit(t)?;
        }
        for r in &self.schema.resources {
            checker.admit_resource(r)?;
        }
        debug!(
            types = self.schema.types.len(),
            resources = self.schema.resources.len(),
            "paranoid build passed"
        );
        Ok(self.schema.clone())
    }

    pub fn build_with(&self, mode: BuildMode) -> Result<Schema, SchemaError> {
        match mode {
            BuildMode::Lenient => Ok(self.build()),
            BuildMode::Paranoid => self.build_paranoid(),
        }
    }
}

macro_rules! common_setters {
    ($($path:ident).+) => {
        pub fn comment(&mut self, comment: &str) -> &mut Self {
            self.$($path).+.comment = non_empty(comment);
            self
        }

        pub fn annotate(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
            self.$($path).+.annotations.insert(key.into(), value.into());
            self
        }
    };
}

#[derive(Clone, Debug)]
pub struct AliasTypeBuilder {
    def: TypeDef,
}

impl AliasTypeBuilder {
    pub fn new(supertype: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            def: TypeDef::new(supertype, name),
        }
    }

    common_setters!(def);

    pub fn build(&self) -> Type {
        Type::Alias(self.def.clone())
    }
}

#[derive(Clone, Debug)]
pub struct StringTypeBuilder {
    t: StringTypeDef,
}

impl StringTypeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_supertype("String", name)
    }

    /// Restricts an existing string type.
    pub fn with_supertype(supertype: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            t: StringTypeDef {
                def: TypeDef::new(supertype, name),
                ..StringTypeDef::default()
            },
        }
    }

    common_setters!(t.def);

    pub fn pattern(&mut self, pattern: impl Into<String>) -> &mut Self {
        self.t.pattern = Some(pattern.into());
        self
    }

    pub fn value(&mut self, value: impl Into<String>) -> &mut Self {
        self.t.values.get_or_insert_with(Vec::new).push(value.into());
        self
    }

    pub fn min_size(&mut self, n: i32) -> &mut Self {
        self.t.min_size = Some(n);
        self
    }

    pub fn max_size(&mut self, n: i32) -> &mut Self {
        self.t.max_size = Some(n);
        self
    }

    pub fn build(&self) -> Type {
        Type::String(self.t.clone())
    }
}

#[derive(Clone, Debug)]
pub struct BytesTypeBuilder {
    t: BytesTypeDef,
}

impl BytesTypeBuilder {
    pub fn new(supertype: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            t: BytesTypeDef {
                def: TypeDef::new(supertype, name),
                ..BytesTypeDef::default()
            },
        }
    }

    common_setters!(t.def);

    pub fn size(&mut self, n: i32) -> &mut Self {
        self.t.size = Some(n);
        self
    }

    pub fn min_size(&mut self, n: i32) -> &mut Self {
        self.t.min_size = Some(n);
        self
    }

    pub fn max_size(&mut self, n: i32) -> &mut Self {
        self.t.max_size = Some(n);
        self
    }

    pub fn build(&self) -> Type {
        Type::Bytes(self.t.clone())
    }
}

#[derive(Clone, Debug)]
pub struct NumberTypeBuilder {
    t: NumberTypeDef,
}

impl NumberTypeBuilder {
    pub fn new(supertype: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            t: NumberTypeDef {
                def: TypeDef::new(supertype, name),
                min: None,
                max: None,
            },
        }
    }

    common_setters!(t.def);

    pub fn min(&mut self, n: Number) -> &mut Self {
        self.t.min = Some(n);
        self
    }

    pub fn max(&mut self, n: Number) -> &mut Self {
        self.t.max = Some(n);
        self
    }

    pub fn build(&self) -> Type {
        Type::Number(self.t.clone())
    }
}

#[derive(Clone, Debug)]
pub struct ArrayTypeBuilder {
    t: ArrayTypeDef,
}

impl ArrayTypeBuilder {
    pub fn new(supertype: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            t: ArrayTypeDef {
                def: TypeDef::new(supertype, name),
                items: String::from("Any"),
                ..ArrayTypeDef::default()
            },
        }
    }

    common_setters!(t.def);

    pub fn items(&mut self, items: impl Into<String>) -> &mut Self {
        self.t.items = items.into();
        self
    }

    pub fn size(&mut self, n: i32) -> &mut Self {
        self.t.size = Some(n);
        self
    }

    pub fn min_size(&mut self, n: i32) -> &mut Self {
        self.t.min_size = Some(n);
        self
    }

    pub fn max_size(&mut self, n: i32) -> &mut Self {
        self.t.max_size = Some(n);
        self
    }

    pub fn build(&self) -> Type {
        Type::Array(self.t.clone())
    }
}

#[derive(Clone, Debug)]
pub struct MapTypeBuilder {
    t: MapTypeDef,
}

impl MapTypeBuilder {
    pub fn new(supertype: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            t: MapTypeDef {
                def: TypeDef::new(supertype, name),
                keys: String::from("String"),
                items: String::from("Any"),
                ..MapTypeDef::default()
            },
        }
    }

    common_setters!(t.def);

    pub fn keys(&mut self, keys: impl Into<String>) -> &mut Self {
        self.t.keys = keys.into();
        self
    }

    pub fn items(&mut self, items: impl Into<String>) -> &mut Self {
        self.t.items = items.into();
        self
    }

    pub fn size(&mut self, n: i32) -> &mut Self {
        self.t.size = Some(n);
        self
    }

    pub fn min_size(&mut self, n: i32) -> &mut Self {
        self.t.min_size = Some(n);
        self
    }

    pub fn max_size(&mut self, n: i32) -> &mut Self {
        self.t.max_size = Some(n);
        self
    }

    pub fn build(&self) -> Type {
        Type::Map(self.t.clone())
    }
}

#[derive(Clone, Debug)]
pub struct StructTypeBuilder {
    t: StructTypeDef,
}

impl StructTypeBuilder {
    pub fn new(supertype: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            t: StructTypeDef {
                def: TypeDef::new(supertype, name),
                fields: Vec::new(),
                closed: false,
            },
        }
    }

    common_setters!(t.def);

    pub fn closed(&mut self, closed: bool) -> &mut Self {
        self.t.closed = closed;
        self
    }

    pub fn field(
        &mut self,
        name: &str,
        ty: &str,
        optional: bool,
        default: Option<Value>,
        comment: &str,
    ) -> &mut Self {
        let mut f = StructFieldDef::new(name, ty);
        f.optional = optional;
        f.default = default;
        f.comment = non_empty(comment);
        self.t.fields.push(f);
        self
    }

    /// Adds a field of type `Array<items>`.
    pub fn array_field(&mut self, name: &str, items: &str, optional: bool, comment: &str) -> &mut Self {
        let mut f = StructFieldDef::new(name, "Array");
        f.items = Some(items.to_owned());
        f.optional = optional;
        f.comment = non_empty(comment);
        self.t.fields.push(f);
        self
    }

    /// Adds a field of type `Map<keys,items>`.
    pub fn map_field(
        &mut self,
        name: &str,
        keys: &str,
        items: &str,
        optional: bool,
        comment: &str,
    ) -> &mut Self {
        let mut f = StructFieldDef::new(name, "Map");
        f.keys = Some(keys.to_owned());
        f.items = Some(items.to_owned());
        f.optional = optional;
        f.comment = non_empty(comment);
        self.t.fields.push(f);
        self
    }

    pub fn add_field(&mut self, field: StructFieldDef) -> &mut Self {
        self.t.fields.push(field);
        self
    }

    pub fn build(&self) -> Type {
        Type::Struct(self.t.clone())
    }
}

#[derive(Clone, Debug)]
pub struct EnumTypeBuilder {
    t: EnumTypeDef,
}

impl EnumTypeBuilder {
    pub fn new(supertype: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            t: EnumTypeDef {
                def: TypeDef::new(supertype, name),
                elements: Vec::new(),
            },
        }
    }

    common_setters!(t.def);

    pub fn element(&mut self, symbol: &str, comment: &str) -> &mut Self {
        self.t.elements.push(EnumElementDef {
            symbol: symbol.to_owned(),
            comment: non_empty(comment),
            annotations: Default::default(),
        });
        self
    }

    pub fn build(&self) -> Type {
        Type::Enum(self.t.clone())
    }
}

#[derive(Clone, Debug)]
pub struct UnionTypeBuilder {
    t: UnionTypeDef,
}

impl UnionTypeBuilder {
    pub fn new(supertype: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            t: UnionTypeDef {
                def: TypeDef::new(supertype, name),
                variants: Vec::new(),
            },
        }
    }

    common_setters!(t.def);

    pub fn variant(&mut self, variant: &str) -> &mut Self {
        self.t.variants.push(variant.to_owned());
        self
    }

    pub fn build(&self) -> Type {
        Type::Union(self.t.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::BaseType;
    use crate::registry::TypeRegistry;

    /// The spellings a base keyword is exercised under.
    fn spellings(word: &str) -> [String; 4] {
        let mixed: String = word
            .chars()
            .enumerate()
            .map(|(i, c)| {
                if i % 2 == 0 {
                    c.to_ascii_lowercase()
                } else {
                    c.to_ascii_uppercase()
                }
            })
            .collect();
        [
            word.to_owned(),
            word.to_ascii_uppercase(),
            word.to_ascii_lowercase(),
            mixed,
        ]
    }

    #[test]
    fn timestamp_and_uuid_fields() {
        let mut sb = SchemaBuilder::new("test");
        let mut tb = StructTypeBuilder::new("Struct", "foo");
        tb.comment("description")
            .field("field1", "Timestamp", false, None, "The timestamp field")
            .field("field2", "UUID", false, None, "The uuid field");
        sb.add_type(tb.build());
        let schema = sb.build_paranoid().unwrap();
        assert_eq!(schema.name.as_deref(), Some("test"));
        assert_eq!(schema.types[0].comment(), Some("description"));
    }

    #[test]
    fn base_type_case_insensitivity() {
        for base in BaseType::ALL {
            let mut sb = SchemaBuilder::new(base.name());
            let mut names = Vec::new();
            for (i, sup) in spellings(base.name()).iter().enumerate() {
                let name = format!("Test{}_{i}", base.name());
                let t = match base {
                    BaseType::Bool => AliasTypeBuilder::new(sup.as_str(), name.as_str()).build(),
                    b if b.is_numeric() => NumberTypeBuilder::new(sup.as_str(), name.as_str()).build(),
                    BaseType::String => StringTypeBuilder::with_supertype(sup.as_str(), name.as_str()).build(),
                    BaseType::Struct => StructTypeBuilder::new(sup.as_str(), name.as_str())
                        .field("field", "Any", false, None, "")
                        .build(),
                    BaseType::Array => ArrayTypeBuilder::new(sup.as_str(), name.as_str())
                        .items("Any")
                        .build(),
                    BaseType::Map => MapTypeBuilder::new(sup.as_str(), name.as_str())
                        .keys("Any")
                        .items("Any")
                        .build(),
                    BaseType::Union => UnionTypeBuilder::new(sup.as_str(), name.as_str())
                        .variant("Any")
                        .variant("Int8")
                        .build(),
                    BaseType::Enum => EnumTypeBuilder::new(sup.as_str(), name.as_str())
                        .element("Foo1", "")
                        .element("Foo2", "")
                        .build(),
                    _ => continue,
                };
                names.push(name);
                sb.add_type(t);
            }
            let schema = sb.build_paranoid().unwrap();
            let reg = TypeRegistry::new(&schema);
            for name in &names {
                assert!(reg.find_type(name).is_some(), "missing {name}");
                assert_eq!(reg.find_base_type(name), Some(base), "wrong base for {name}");
            }
        }
    }

    #[test]
    fn lenient_skips_checks() {
        let mut sb = SchemaBuilder::new("loose");
        sb.add_type(AliasTypeBuilder::new("Undefined", "Dangling").build());
        assert_eq!(sb.build().types.len(), 1);
        assert!(matches!(
            sb.build_with(BuildMode::Paranoid),
            Err(SchemaError::UnknownType { .. })
        ));
        assert!(sb.build_with(BuildMode::Lenient).is_ok());
    }
}
