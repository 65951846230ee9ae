//! Incremental structural checks over a growing type list
//!
//! [`TypeChecker`] admits types one at a time, in declaration order, and
//! rejects any that would break the invariants of a schema: unique names,
//! resolvable references with no forward references (save the optional
//! self-referential struct field), restriction shapes consistent with the
//! supertype's base, and well-formed annotations and options.
//!
//! The parser runs it as it goes; the builder runs it over a finished type
//! list when building in paranoid mode.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, trace};

use crate::error::SchemaError;
use crate::model::{
    Annotations, BaseType, Number, Resource, StructTypeDef, Type, TypeDef,
};
use crate::model::resource::METHODS;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[a-zA-Z_][a-zA-Z_0-9]*$").unwrap();
    static ref ANNOTATION: Regex = Regex::new(r"^x_[a-zA-Z_0-9]*$").unwrap();
}

/// Whether `s` is a legal simple identifier.
pub fn is_identifier(s: &str) -> bool {
    IDENTIFIER.is_match(s)
}

/// Whether `s` is a legal extended-annotation name.
pub fn is_annotation(s: &str) -> bool {
    ANNOTATION.is_match(s)
}

#[derive(Default, Debug, Clone)]
pub struct TypeChecker {
    kinds: HashMap<String, BaseType>,
    fields: HashMap<String, Vec<String>>,
}

impl TypeChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a type reference to its base type, if it is already known.
    pub fn resolve(&self, name: &str) -> Option<BaseType> {
        BaseType::from_keyword(name).or_else(|| self.kinds.get(name).copied())
    }

    /// Flattened field names of an admitted struct type.
    pub fn struct_fields(&self, name: &str) -> Option<&[String]> {
        self.fields.get(name).map(Vec::as_slice)
    }

    fn require(&self, context: &str, name: &str) -> Result<BaseType, SchemaError> {
        self.resolve(name).ok_or_else(|| SchemaError::UnknownType {
            context: context.to_owned(),
            name: name.to_owned(),
        })
    }

    /// Like `require`, but a reference to `own` (the type being admitted)
    /// is accepted, resolving to `own_base`.
    fn require_or_self(
        &self,
        context: &str,
        name: &str,
        own: &str,
        own_base: BaseType,
    ) -> Result<BaseType, SchemaError> {
        if name == own {
            Ok(own_base)
        } else {
            self.require(context, name)
        }
    }

    /// Checks `t` against everything admitted so far and records it.
    pub fn admit(&mut self, t: &Type) -> Result<(), SchemaError> {
        let def = match t.def() {
            Some(def) => def,
            None => return Ok(()),
        };
        let name = def.name.as_str();
        if !is_identifier(name) {
            return Err(SchemaError::BadIdentifier(name.to_owned()));
        }
        if BaseType::from_keyword(name).is_some() || self.kinds.contains_key(name) {
            return Err(SchemaError::DuplicateType(name.to_owned()));
        }
        check_annotations(&def.annotations)?;
        let base = self.require(name, &def.supertype)?;
        trace!(ty = name, %base, variant = t.variant_name(), "admitting type");

        match t {
            Type::BaseType(_) | Type::Alias(_) => {}
            Type::String(st) => {
                expect_kind(name, "String", base, |b| b == BaseType::String)?;
                if st.pattern.is_some() && st.values.is_some() {
                    return Err(conflict(name, "pattern and values are mutually exclusive"));
                }
                if let Some(pattern) = &st.pattern {
                    Regex::new(pattern).map_err(|err| SchemaError::InvalidPattern {
                        ty: name.to_owned(),
                        reason: err.to_string(),
                    })?;
                }
                check_sizes(name, None, st.min_size, st.max_size)?;
            }
            Type::Bytes(bt) => {
                expect_kind(name, "Bytes", base, |b| b == BaseType::Bytes)?;
                check_sizes(name, bt.size, bt.min_size, bt.max_size)?;
            }
            Type::Number(nt) => {
                expect_kind(name, "a number", base, BaseType::is_numeric)?;
                check_bounds(name, nt.min.as_ref(), nt.max.as_ref())?;
            }
            Type::Array(at) => {
                expect_kind(name, "Array", base, |b| b == BaseType::Array)?;
                self.require_or_self(name, &at.items, name, base)?;
                check_sizes(name, at.size, at.min_size, at.max_size)?;
            }
            Type::Map(mt) => {
                expect_kind(name, "Map", base, |b| b == BaseType::Map)?;
                self.require_or_self(name, &mt.keys, name, base)?;
                self.require_or_self(name, &mt.items, name, base)?;
                check_sizes(name, mt.size, mt.min_size, mt.max_size)?;
            }
            Type::Struct(st) => {
                expect_kind(name, "Struct", base, |b| b == BaseType::Struct)?;
                let flat = self.check_struct(def, st)?;
                self.fields.insert(name.to_owned(), flat);
            }
            Type::Enum(et) => {
                expect_kind(name, "Enum", base, |b| b == BaseType::Enum)?;
                let mut seen = HashSet::new();
                for elem in &et.elements {
                    if !is_identifier(&elem.symbol) {
                        return Err(SchemaError::BadIdentifier(elem.symbol.clone()));
                    }
                    check_annotations(&elem.annotations)?;
                    if !seen.insert(elem.symbol.as_str()) {
                        return Err(SchemaError::DuplicateElement {
                            ty: name.to_owned(),
                            symbol: elem.symbol.clone(),
                        });
                    }
                }
            }
            Type::Union(ut) => {
                expect_kind(name, "Union", base, |b| b == BaseType::Union)?;
                let mut seen = HashSet::new();
                for variant in &ut.variants {
                    if variant == name {
                        return Err(SchemaError::SelfReferentialUnion(name.to_owned()));
                    }
                    self.require(name, variant)?;
                    if !seen.insert(variant.as_str()) {
                        return Err(SchemaError::DuplicateVariant {
                            ty: name.to_owned(),
                            variant: variant.clone(),
                        });
                    }
                }
            }
        }
        self.kinds.insert(name.to_owned(), base);
        debug!(ty = name, %base, "type admitted");
        Ok(())
    }

    /// Returns the flattened field names of the struct, supertype first.
    fn check_struct(&self, def: &TypeDef, st: &StructTypeDef) -> Result<Vec<String>, SchemaError> {
        let name = def.name.as_str();
        let mut flat: Vec<String> = self
            .fields
            .get(&def.supertype)
            .cloned()
            .unwrap_or_default();
        for field in &st.fields {
            if !is_identifier(&field.name) {
                return Err(SchemaError::BadIdentifier(field.name.clone()));
            }
            check_annotations(&field.annotations)?;
            let context = format!("{name}.{}", field.name);
            if field.ty == name {
                if !field.optional {
                    return Err(SchemaError::RecursiveField {
                        ty: name.to_owned(),
                        field: field.name.clone(),
                    });
                }
            } else {
                self.require(&context, &field.ty)?;
            }
            if let Some(items) = &field.items {
                self.require_or_self(&context, items, name, BaseType::Struct)?;
            }
            if let Some(keys) = &field.keys {
                self.require_or_self(&context, keys, name, BaseType::Struct)?;
            }
            if flat.iter().any(|f| f == &field.name) {
                return Err(SchemaError::DuplicateField {
                    ty: name.to_owned(),
                    field: field.name.clone(),
                });
            }
            flat.push(field.name.clone());
        }
        Ok(flat)
    }

    /// Checks a resource against the admitted types.
    pub fn admit_resource(&self, r: &Resource) -> Result<(), SchemaError> {
        let label = match &r.name {
            Some(name) => name.clone(),
            None => format!("{} {}", r.method, r.path),
        };
        self.require(&label, &r.ty)?;
        if !METHODS.contains(&r.method.as_str()) {
            return Err(SchemaError::UnknownMethod {
                resource: label,
                method: r.method.clone(),
            });
        }
        check_annotations(&r.annotations)?;
        let mut names = HashSet::new();
        let params = r
            .inputs
            .iter()
            .map(|i| (&i.name, &i.ty, &i.annotations))
            .chain(r.outputs.iter().map(|o| (&o.name, &o.ty, &o.annotations)));
        for (name, ty, annotations) in params {
            self.require(&format!("{label} ({name})"), ty)?;
            check_annotations(annotations)?;
            if !names.insert(name.as_str()) {
                return Err(SchemaError::DuplicateParam {
                    resource: label,
                    name: name.clone(),
                });
            }
        }
        for param in r.path_params() {
            if r.find_input(param).is_none() {
                return Err(SchemaError::MissingPathParam {
                    resource: label,
                    param: param.to_owned(),
                });
            }
        }
        for exc in r.exceptions.values() {
            self.require(&label, &exc.ty)?;
        }
        debug!(resource = label.as_str(), "resource admitted");
        Ok(())
    }
}

fn conflict(ty: &str, detail: impl Into<String>) -> SchemaError {
    SchemaError::ConflictingOptions {
        ty: ty.to_owned(),
        detail: detail.into(),
    }
}

fn expect_kind(
    ty: &str,
    expected: &'static str,
    found: BaseType,
    pred: impl Fn(BaseType) -> bool,
) -> Result<(), SchemaError> {
    if pred(found) {
        Ok(())
    } else {
        Err(SchemaError::KindMismatch {
            ty: ty.to_owned(),
            expected,
            found,
        })
    }
}

pub(crate) fn check_annotations(annotations: &Annotations) -> Result<(), SchemaError> {
    match annotations.keys().find(|k| !is_annotation(k)) {
        Some(bad) => Err(SchemaError::BadAnnotation(bad.clone())),
        None => Ok(()),
    }
}

fn check_sizes(
    ty: &str,
    size: Option<i32>,
    min: Option<i32>,
    max: Option<i32>,
) -> Result<(), SchemaError> {
    if size.is_some() && (min.is_some() || max.is_some()) {
        return Err(conflict(ty, "size is mutually exclusive with minSize/maxSize"));
    }
    if [size, min, max].iter().flatten().any(|&n| n < 0) {
        return Err(conflict(ty, "sizes cannot be negative"));
    }
    match (min, max) {
        (Some(lo), Some(hi)) if lo > hi => Err(conflict(
            ty,
            format!("minSize {lo} exceeds maxSize {hi}"),
        )),
        _ => Ok(()),
    }
}

fn check_bounds(ty: &str, min: Option<&Number>, max: Option<&Number>) -> Result<(), SchemaError> {
    match (min, max) {
        (Some(lo), Some(hi)) if lo.compare(hi) == Some(Ordering::Greater) => {
            Err(conflict(ty, format!("min {lo} exceeds max {hi}")))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{
        ArrayTypeDef, EnumElementDef, EnumTypeDef, NumberTypeDef, StringTypeDef, StructFieldDef,
        UnionTypeDef,
    };

    fn structure(supertype: &str, name: &str, fields: Vec<StructFieldDef>) -> Type {
        Type::Struct(StructTypeDef {
            def: TypeDef::new(supertype, name),
            fields,
            closed: false,
        })
    }

    #[test]
    fn forward_reference_rejected() {
        let mut tc = TypeChecker::new();
        let t = structure("Struct", "A", vec![StructFieldDef::new("b", "B")]);
        assert!(matches!(tc.admit(&t), Err(SchemaError::UnknownType { .. })));
    }

    #[test]
    fn recursive_field_rule() {
        let mut tc = TypeChecker::new();
        let bad = structure("Struct", "Node", vec![StructFieldDef::new("next", "Node")]);
        assert!(matches!(tc.admit(&bad), Err(SchemaError::RecursiveField { .. })));

        let mut next = StructFieldDef::new("next", "Node");
        next.optional = true;
        let mut children = StructFieldDef::new("children", "Array");
        children.items = Some("Node".into());
        let good = structure("Struct", "Node", vec![next, children]);
        assert_eq!(tc.admit(&good), Ok(()));
        assert_eq!(tc.resolve("Node"), Some(BaseType::Struct));
    }

    #[test]
    fn inherited_duplicate_field() {
        let mut tc = TypeChecker::new();
        tc.admit(&structure("Struct", "Foo", vec![StructFieldDef::new("foo", "String")]))
            .unwrap();
        let bar = structure("Foo", "Bar", vec![StructFieldDef::new("foo", "String")]);
        assert!(matches!(tc.admit(&bar), Err(SchemaError::DuplicateField { .. })));
        let baz = structure("Foo", "Baz", vec![StructFieldDef::new("baz", "Int32")]);
        tc.admit(&baz).unwrap();
        assert_eq!(tc.struct_fields("Baz"), Some(&["foo".to_string(), "baz".to_string()][..]));
    }

    #[test]
    fn restriction_consistency() {
        let mut tc = TypeChecker::new();
        let both = Type::String(StringTypeDef {
            def: TypeDef::new("String", "S"),
            pattern: Some("a".into()),
            values: Some(vec!["a".into()]),
            ..StringTypeDef::default()
        });
        assert!(matches!(tc.admit(&both), Err(SchemaError::ConflictingOptions { .. })));

        let arr = Type::Array(ArrayTypeDef {
            def: TypeDef::new("Array", "A"),
            items: "Any".into(),
            size: Some(3),
            min_size: Some(1),
            ..ArrayTypeDef::default()
        });
        assert!(matches!(tc.admit(&arr), Err(SchemaError::ConflictingOptions { .. })));

        let mismatch = Type::String(StringTypeDef {
            def: TypeDef::new("Int32", "N"),
            ..StringTypeDef::default()
        });
        assert!(matches!(tc.admit(&mismatch), Err(SchemaError::KindMismatch { .. })));

        let wide = |name: &str, min: i64, max: i64| {
            Type::Number(NumberTypeDef {
                def: TypeDef::new("Int64", name),
                min: Some(Number::Int64(min)),
                max: Some(Number::Int64(max)),
            })
        };
        assert!(tc.admit(&wide("W", 9_007_199_254_740_992, 9_007_199_254_740_993)).is_ok());
        assert!(matches!(
            tc.admit(&wide("X", 9_007_199_254_740_993, 9_007_199_254_740_992)),
            Err(SchemaError::ConflictingOptions { .. })
        ));
    }

    #[test]
    fn enum_and_union_checks() {
        let mut tc = TypeChecker::new();
        let dup = Type::Enum(EnumTypeDef {
            def: TypeDef::new("Enum", "E"),
            elements: vec![
                EnumElementDef { symbol: "A".into(), ..Default::default() },
                EnumElementDef { symbol: "A".into(), ..Default::default() },
            ],
        });
        assert!(matches!(tc.admit(&dup), Err(SchemaError::DuplicateElement { .. })));

        let selfish = Type::Union(UnionTypeDef {
            def: TypeDef::new("Union", "U"),
            variants: vec!["Int32".into(), "U".into()],
        });
        assert!(matches!(tc.admit(&selfish), Err(SchemaError::SelfReferentialUnion(_))));

        let ok = Type::Union(UnionTypeDef {
            def: TypeDef::new("union", "U"),
            variants: vec!["Int32".into(), "string".into()],
        });
        assert_eq!(tc.admit(&ok), Ok(()));
        assert!(matches!(tc.admit(&ok), Err(SchemaError::DuplicateType(_))));
    }

    #[test]
    fn annotation_names() {
        assert!(is_annotation("x_foo"));
        assert!(is_annotation("x_"));
        assert!(!is_annotation("y_foo"));
        let mut tc = TypeChecker::new();
        let mut def = TypeDef::new("Bool", "Flag");
        def.annotations.insert("bad".into(), String::new());
        assert!(matches!(tc.admit(&Type::Alias(def)), Err(SchemaError::BadAnnotation(_))));
    }

    #[test]
    fn resource_checks() {
        let mut tc = TypeChecker::new();
        tc.admit(&structure("Struct", "Contact", vec![])).unwrap();

        let r = Resource::new("Contact", "GET", "/contacts/{id}");
        assert!(matches!(tc.admit_resource(&r), Err(SchemaError::MissingPathParam { .. })));

        let mut r = Resource::new("Contact", "GET", "/contacts/{id}");
        r.inputs.push(crate::model::ResourceInput {
            name: "id".into(),
            ty: "String".into(),
            path_param: true,
            ..Default::default()
        });
        assert_eq!(tc.admit_resource(&r), Ok(()));

        let mut r2 = r.clone();
        r2.outputs.push(crate::model::ResourceOutput {
            name: "id".into(),
            ty: "String".into(),
            header: "X-Id".into(),
            ..Default::default()
        });
        assert!(matches!(tc.admit_resource(&r2), Err(SchemaError::DuplicateParam { .. })));

        let mut r3 = r;
        r3.method = "FETCH".into();
        assert!(matches!(tc.admit_resource(&r3), Err(SchemaError::UnknownMethod { .. })));
    }
}
