//! Validation of data against schema types
//!
//! # Overview
//!
//! [`validate`] checks a value against a named type of a [`Schema`] and
//! reports the outcome as a [`Validation`] record; a failed validation is
//! data, not an `Err`. The value is anything implementing [`Validatable`],
//! which is usually a [`Value`].
//!
//! A type's restrictions are those of its entire supertype chain: a value
//! checked against `type Bar Foo (maxSize=4)` with
//! `type Foo String (pattern="[a-z]*")` must match the pattern *and* respect
//! the size limit.
//!
//! Numeric checks are by value rather than by representation: an integral
//! `Float64` passes as an `Int32` so long as it is in range, while a
//! fractional one does not. String sizes count characters. Timestamps and
//! UUIDs may also be given in their textual forms.
//!
//! For union targets, variants are tried in declaration order and the
//! first match is reported as the resolved `type_name`.

use std::borrow::Cow;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;

use regex::Regex;
use tracing::trace;

use crate::model::{BaseType, Number, Schema, StructFieldDef, Type};
use crate::registry::TypeRegistry;
use crate::value::{parse_uuid, Timestamp, Value};

/// Outcome of [`validate`]
///
/// On success `error` and `context` are empty and `type_name` is the type the
/// value was accepted as. On failure `type_name` names the type whose check
/// failed and `context` is the dotted path to the offending part of the value.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Validation {
    pub valid: bool,
    pub type_name: String,
    pub error: String,
    pub context: String,
}

/// Data that can be validated against a schema type
pub trait Validatable {
    /// Self-validation hook.
    ///
    /// When this returns `Some`, a struct-typed target accepts or rejects the
    /// value according to the result, without any structural checks.
    fn self_validate(&self) -> Option<Result<(), String>> {
        None
    }

    /// The dynamic view of the data used for structural checks.
    fn as_value(&self) -> Cow<'_, Value>;
}

impl Validatable for Value {
    fn as_value(&self) -> Cow<'_, Value> {
        Cow::Borrowed(self)
    }
}

#[derive(Debug)]
struct Failure {
    type_name: String,
    error: String,
    context: String,
}

type Check<T> = Result<T, Failure>;

fn fail<T>(type_name: &str, context: &str, error: impl Into<String>) -> Check<T> {
    Err(Failure {
        type_name: type_name.to_owned(),
        error: error.into(),
        context: context.to_owned(),
    })
}

/// Validates `data` against the type named `type_name` in `schema`.
pub fn validate<V: Validatable + ?Sized>(schema: &Schema, type_name: &str, data: &V) -> Validation {
    let v = Validator::new(schema);
    let outcome = v.check_root(type_name, data);
    match outcome {
        Ok(resolved) => Validation {
            valid: true,
            type_name: resolved,
            error: String::new(),
            context: String::new(),
        },
        Err(f) => {
            trace!(ty = type_name, error = f.error.as_str(), context = f.context.as_str(), "validation failed");
            Validation {
                valid: false,
                type_name: f.type_name,
                error: f.error,
                context: f.context,
            }
        }
    }
}

/// Element types supplied by a struct field's generic arguments
#[derive(Clone, Copy, Default)]
struct Elements<'s> {
    keys: Option<&'s str>,
    items: Option<&'s str>,
}

struct Validator<'a> {
    reg: TypeRegistry<'a>,
    patterns: RefCell<HashMap<String, Option<Regex>>>,
}

impl<'a> Validator<'a> {
    fn new(schema: &'a Schema) -> Self {
        Self {
            reg: TypeRegistry::new(schema),
            patterns: RefCell::new(HashMap::new()),
        }
    }

    fn check_root<V: Validatable + ?Sized>(&self, type_name: &str, data: &V) -> Check<String> {
        let t = match self.reg.find_type(type_name) {
            Some(t) => t,
            None => return fail(type_name, type_name, format!("Unknown type: {type_name}")),
        };
        if self.reg.base_type(t) == Some(BaseType::Struct) {
            if let Some(res) = data.self_validate() {
                return match res {
                    Ok(()) => Ok(t.name().to_owned()),
                    Err(msg) => fail(t.name(), type_name, msg),
                };
            }
        }
        self.check(t, &data.as_value(), type_name, Elements::default())
    }

    fn check_named(&self, name: &str, v: &Value, ctx: &str, elems: Elements<'_>) -> Check<String> {
        match self.reg.find_type(name) {
            Some(t) => self.check(t, v, ctx, elems),
            None => fail(name, ctx, format!("Unknown type: {name}")),
        }
    }

    fn matches(&self, pattern: &str, s: &str) -> Option<bool> {
        let mut cache = self.patterns.borrow_mut();
        let re = cache
            .entry(pattern.to_owned())
            .or_insert_with(|| Regex::new(&format!("^(?:{pattern})$")).ok());
        re.as_ref().map(|re| re.is_match(s))
    }

    /// Checks `v` against `t` and returns the name it was accepted as.
    fn check(&self, t: &'a Type, v: &Value, ctx: &str, elems: Elements<'_>) -> Check<String> {
        let name = t.name();
        let chain = self.reg.ancestry(t);
        let base = match self.reg.base_type(t) {
            Some(b) => b,
            None => return fail(name, ctx, format!("Cannot resolve base type of {name}")),
        };
        match base {
            BaseType::Any => {}
            BaseType::Bool => {
                if !matches!(v, Value::Bool(_)) {
                    return fail(name, ctx, format!("Not a Bool: {}", v.kind_name()));
                }
            }
            b if b.is_integral() => self.check_integer(name, b, v, ctx)?,
            BaseType::Float32 | BaseType::Float64 => {
                if as_number(v).is_none() {
                    return fail(name, ctx, format!("Not a {base}: {}", v.kind_name()));
                }
            }
            BaseType::Bytes => {
                if !matches!(v, Value::Bytes(_)) {
                    return fail(name, ctx, format!("Not Bytes: {}", v.kind_name()));
                }
            }
            BaseType::String | BaseType::Symbol | BaseType::Enum => {
                if v.as_str().is_none() {
                    return fail(name, ctx, format!("Not a {base}: {}", v.kind_name()));
                }
            }
            BaseType::Timestamp => {
                let ok = match v {
                    Value::Timestamp(_) => true,
                    Value::String(s) => Timestamp::parse(s).is_ok(),
                    _ => false,
                };
                if !ok {
                    return fail(name, ctx, "Not a valid Timestamp");
                }
            }
            BaseType::Uuid => {
                let ok = match v {
                    Value::Uuid(_) => true,
                    Value::String(s) => parse_uuid(s).is_some(),
                    _ => false,
                };
                if !ok {
                    return fail(name, ctx, "Not a valid UUID");
                }
            }
            BaseType::Array => {
                if v.as_array().is_none() {
                    return fail(name, ctx, format!("Not an Array: {}", v.kind_name()));
                }
            }
            BaseType::Map | BaseType::Struct => {
                if v.as_entries().is_none() {
                    return fail(name, ctx, format!("Not a {base}: {}", v.kind_name()));
                }
            }
            BaseType::Union => return self.check_union(t, &chain, v, ctx),
            _ => {}
        }

        for link in &chain {
            self.check_restrictions(link, v, ctx)?;
        }

        match base {
            BaseType::Array => self.check_array_items(&chain, v, ctx, elems)?,
            BaseType::Map => self.check_map_entries(&chain, v, ctx, elems)?,
            BaseType::Struct => self.check_struct(t, &chain, v, ctx)?,
            BaseType::Enum => {
                let sym = v.as_str().unwrap_or_default();
                if !self.reg.enum_elements(t).iter().any(|e| e.symbol == sym) {
                    return fail(name, ctx, format!("Not a valid symbol for {name}: {sym}"));
                }
            }
            _ => {}
        }
        Ok(name.to_owned())
    }

    fn check_integer(&self, name: &str, base: BaseType, v: &Value, ctx: &str) -> Check<()> {
        let (lo, hi) = match base {
            BaseType::Int8 => (i64::from(i8::MIN), i64::from(i8::MAX)),
            BaseType::Int16 => (i64::from(i16::MIN), i64::from(i16::MAX)),
            BaseType::Int32 => (i64::from(i32::MIN), i64::from(i32::MAX)),
            _ => (i64::MIN, i64::MAX),
        };
        match as_integer(v) {
            Some(n) if n >= lo && n <= hi => Ok(()),
            Some(n) => fail(name, ctx, format!("Value {n} out of range for {base}")),
            None => fail(name, ctx, format!("Not an {base}: {}", v.kind_name())),
        }
    }

    /// Checks the restriction options declared directly by `t`.
    fn check_restrictions(&self, t: &Type, v: &Value, ctx: &str) -> Check<()> {
        let name = t.name();
        match t {
            Type::String(st) => {
                let s = v.as_str().unwrap_or_default();
                if let Some(pattern) = &st.pattern {
                    match self.matches(pattern, s) {
                        Some(true) => {}
                        Some(false) => {
                            return fail(name, ctx, format!("String does not match pattern \"{pattern}\""))
                        }
                        None => return fail(name, ctx, format!("Bad pattern: {pattern}")),
                    }
                }
                if let Some(values) = &st.values {
                    if !values.iter().any(|x| x == s) {
                        return fail(name, ctx, format!("String not one of the allowed values: {s}"));
                    }
                }
                check_size(name, ctx, s.chars().count(), None, st.min_size, st.max_size)
            }
            Type::Bytes(bt) => {
                let len = match v {
                    Value::Bytes(b) => b.len(),
                    _ => 0,
                };
                check_size(name, ctx, len, bt.size, bt.min_size, bt.max_size)
            }
            Type::Number(nt) => {
                if let Some(min) = &nt.min {
                    if compare_bound(v, min) == Some(Ordering::Less) {
                        let x = number_text(v);
                        return fail(name, ctx, format!("Value {x} less than minimum {min}"));
                    }
                }
                if let Some(max) = &nt.max {
                    if compare_bound(v, max) == Some(Ordering::Greater) {
                        let x = number_text(v);
                        return fail(name, ctx, format!("Value {x} greater than maximum {max}"));
                    }
                }
                Ok(())
            }
            Type::Array(at) => {
                let len = v.as_array().map_or(0, <[Value]>::len);
                check_size(name, ctx, len, at.size, at.min_size, at.max_size)
            }
            Type::Map(mt) => {
                let len = v.as_entries().map_or(0, |m| m.len());
                check_size(name, ctx, len, mt.size, mt.min_size, mt.max_size)
            }
            _ => Ok(()),
        }
    }

    fn check_array_items(&self, chain: &[&Type], v: &Value, ctx: &str, elems: Elements<'_>) -> Check<()> {
        let items = elems.items.unwrap_or_else(|| {
            chain
                .iter()
                .find_map(|t| match t {
                    Type::Array(at) => Some(at.items.as_str()),
                    _ => None,
                })
                .unwrap_or("Any")
        });
        for (i, item) in v.as_array().unwrap_or_default().iter().enumerate() {
            self.check_named(items, item, &format!("{ctx}[{i}]"), Elements::default())?;
        }
        Ok(())
    }

    fn check_map_entries(&self, chain: &[&Type], v: &Value, ctx: &str, elems: Elements<'_>) -> Check<()> {
        let declared = chain.iter().find_map(|t| match t {
            Type::Map(mt) => Some((mt.keys.as_str(), mt.items.as_str())),
            _ => None,
        });
        let keys = elems
            .keys
            .or(declared.map(|d| d.0))
            .unwrap_or("String");
        let items = elems
            .items
            .or(declared.map(|d| d.1))
            .unwrap_or("Any");
        if let Some(entries) = v.as_entries() {
            for (k, item) in entries {
                let sub = format!("{ctx}.{k}");
                self.check_named(keys, &Value::String(k.clone()), &sub, Elements::default())?;
                self.check_named(items, item, &sub, Elements::default())?;
            }
        }
        Ok(())
    }

    fn check_struct(&self, t: &'a Type, chain: &[&Type], v: &Value, ctx: &str) -> Check<()> {
        let name = t.name();
        let entries = match v.as_entries() {
            Some(e) => e,
            None => return fail(name, ctx, "Not a Struct"),
        };
        let fields = self.reg.flattened_fields(t);
        for field in &fields {
            let sub = format!("{ctx}.{}", field.name);
            match entries.get(&field.name) {
                Some(val) if !val.is_null() => self.check_field(field, val, &sub)?,
                _ => {
                    if !field.optional && field.default.is_none() {
                        return fail(name, ctx, format!("Missing required field: {}", field.name));
                    }
                }
            }
        }
        let closed = chain.iter().any(|t| matches!(t, Type::Struct(st) if st.closed));
        if closed {
            if let Some(extra) = entries.keys().find(|k| !fields.iter().any(|f| &f.name == *k)) {
                return fail(name, ctx, format!("Unknown field in closed struct: {extra}"));
            }
        }
        Ok(())
    }

    fn check_field(&self, field: &StructFieldDef, v: &Value, ctx: &str) -> Check<()> {
        let elems = Elements {
            keys: field.keys.as_deref(),
            items: field.items.as_deref(),
        };
        self.check_named(&field.ty, v, ctx, elems).map(drop)
    }

    fn check_union(&self, t: &Type, chain: &[&Type], v: &Value, ctx: &str) -> Check<String> {
        let variants = chain
            .iter()
            .find_map(|t| match t {
                Type::Union(ut) => Some(ut.variants.as_slice()),
                _ => None,
            })
            .unwrap_or_default();
        for variant in variants {
            if let Ok(matched) = self.check_named(variant, v, ctx, Elements::default()) {
                return Ok(matched);
            }
        }
        fail(t.name(), ctx, format!("No variant of {} matches the value", t.name()))
    }
}

fn check_size(
    name: &str,
    ctx: &str,
    len: usize,
    size: Option<i32>,
    min: Option<i32>,
    max: Option<i32>,
) -> Check<()> {
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    if let Some(n) = size {
        if len_i != i64::from(n) {
            return fail(name, ctx, format!("Size {len} is not the required {n}"));
        }
    }
    if let Some(n) = min {
        if len_i < i64::from(n) {
            return fail(name, ctx, format!("Size {len} is less than minSize {n}"));
        }
    }
    if let Some(n) = max {
        if len_i > i64::from(n) {
            return fail(name, ctx, format!("Size {len} is greater than maxSize {n}"));
        }
    }
    Ok(())
}

fn as_integer(v: &Value) -> Option<i64> {
    match *v {
        Value::Int8(n) => Some(i64::from(n)),
        Value::Int16(n) => Some(i64::from(n)),
        Value::Int32(n) => Some(i64::from(n)),
        Value::Int64(n) => Some(n),
        Value::Float32(x) => integral(f64::from(x)),
        Value::Float64(x) => integral(x),
        _ => None,
    }
}

fn integral(x: f64) -> Option<i64> {
    // 2^63 is the first float above i64::MAX
    if x.is_finite() && x.fract() == 0.0 && x >= -9.223_372_036_854_775_808e18 && x < 9.223_372_036_854_775_808e18 {
        Some(x as i64)
    } else {
        None
    }
}

/// Orders a numeric value against a bound. Integer values meet integer
/// bounds as `i64`, so wide values do not round.
fn compare_bound(v: &Value, bound: &Number) -> Option<Ordering> {
    match (as_integer(v), bound.as_i64()) {
        (Some(n), Some(b)) => Some(n.cmp(&b)),
        _ => as_number(v)?.partial_cmp(&bound.as_f64()),
    }
}

fn number_text(v: &Value) -> String {
    match *v {
        Value::Float32(x) => x.to_string(),
        Value::Float64(x) => x.to_string(),
        _ => as_integer(v).map_or_else(String::new, |n| n.to_string()),
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match *v {
        Value::Int8(n) => Some(f64::from(n)),
        Value::Int16(n) => Some(f64::from(n)),
        Value::Int32(n) => Some(f64::from(n)),
        Value::Int64(n) => Some(n as f64),
        Value::Float32(x) => Some(f64::from(x)),
        Value::Float64(x) => Some(x),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::builder::{AliasTypeBuilder, SchemaBuilder, StringTypeBuilder, StructTypeBuilder};
    use crate::schema::parse_rdl;

    #[test]
    fn string_subtype_restrictions_accumulate() {
        let schema = parse_rdl(
            r#"
type Foo String (pattern="[a-z]*")
type Bar Foo (maxSize=4);
"#,
        )
        .unwrap();
        let v = validate(&schema, "Bar", &Value::from("1"));
        assert!(!v.valid, "non-alpha characters accepted: {v:?}");
        assert_eq!(v.type_name, "Foo");
        let v = validate(&schema, "Bar", &Value::from("abcdef"));
        assert!(!v.valid, "over-long string accepted: {v:?}");
        assert_eq!(v.type_name, "Bar");
        let v = validate(&schema, "Bar", &Value::from("abcd"));
        assert!(v.valid, "{v:?}");
        assert_eq!(v.type_name, "Bar");
        assert!(v.error.is_empty());
    }

    struct Custom;

    impl Validatable for Custom {
        fn self_validate(&self) -> Option<Result<(), String>> {
            Some(Ok(()))
        }

        fn as_value(&self) -> Cow<'_, Value> {
            Cow::Owned(Value::Null)
        }
    }

    #[test]
    fn custom_and_aliased_types() {
        let mut sb = SchemaBuilder::new("test");
        let mut tb = StructTypeBuilder::new("Struct", "foo");
        tb.comment("description")
            .field("field1", "Timestamp", false, None, "The timestamp field")
            .field("field2", "UUID", false, None, "The uuid field");
        sb.add_type(tb.build());
        sb.add_type(AliasTypeBuilder::new("Timestamp", "mytimestamp").build());
        sb.add_type(AliasTypeBuilder::new("string", "mystring").build());
        let mut ident = StringTypeBuilder::new("Identifier");
        ident.pattern("[a-zA-Z_]+[a-zA-Z_0-9]*");
        sb.add_type(ident.build());
        sb.add_type(AliasTypeBuilder::new("Identifier", "TypeName").build());
        let schema = sb.build_paranoid().unwrap();

        assert!(validate(&schema, "string", &Value::from("basic string")).valid);
        assert!(validate(&schema, "mytimestamp", &Value::from("2017-04-20T15:04:05.999Z")).valid);
        assert!(validate(&schema, "foo", &Custom).valid);
        assert!(validate(&schema, "TypeName", &Value::from("valid_name")).valid);

        assert!(!validate(&schema, "mytimestamp", &Value::from("20170420T15:04:05.999Z")).valid);
        assert!(!validate(&schema, "foo", &Value::Int32(4587)).valid);
        assert!(!validate(&schema, "string", &Custom).valid);
        assert!(!validate(&schema, "TypeName", &Value::from("9lives")).valid);

        let good = Value::structure([
            ("field1", Value::from("2015-05-17T01:37:09.534Z")),
            ("field2", Value::from("88cfd476-fc35-11e4-acaa-14109fe4729f")),
        ]);
        assert!(validate(&schema, "foo", &good).valid);
    }

    #[test]
    fn numbers_by_value() {
        let schema = parse_rdl("type Small Int8 (min=-5, max=5); type Ratio Float64 (min=0, max=1);").unwrap();
        assert!(validate(&schema, "Int32", &Value::Float64(23.0)).valid);
        assert!(!validate(&schema, "Int32", &Value::Float64(23.5)).valid);
        assert!(!validate(&schema, "Int8", &Value::Int32(300)).valid);
        assert!(validate(&schema, "Small", &Value::Int64(-5)).valid);
        let v = validate(&schema, "Small", &Value::Int32(6));
        assert!(!v.valid);
        assert_eq!(v.type_name, "Small");
        assert!(validate(&schema, "Ratio", &Value::Int32(1)).valid);
        assert!(!validate(&schema, "Ratio", &Value::Float32(1.5)).valid);
        assert!(!validate(&schema, "Int64", &Value::from("12")).valid);
    }

    #[test]
    fn wide_integer_bounds_are_exact() {
        let schema = parse_rdl("type Big Int64 (min=-9007199254740992, max=9007199254740992);").unwrap();
        assert!(validate(&schema, "Big", &Value::Int64(9_007_199_254_740_992)).valid);
        let v = validate(&schema, "Big", &Value::Int64(9_007_199_254_740_993));
        assert!(!v.valid);
        assert_eq!(v.error, "Value 9007199254740993 greater than maximum 9007199254740992");
        assert!(!validate(&schema, "Big", &Value::Int64(-9_007_199_254_740_993)).valid);
        assert!(validate(&schema, "Big", &Value::Float64(9_007_199_254_740_992.0)).valid);
    }

    #[test]
    fn structs_arrays_maps() {
        let schema = parse_rdl(
            r#"
type Tag String (values=["a", "b"]);
type Point Struct (closed) { Int32 x; Int32 y; }
type Shape Struct {
    String name;
    Array<Point> points (optional);
    Map<String,Tag> tags (optional);
    Int32 weight (default=1);
}
type Points Array<Point> (maxSize=2);
"#,
        )
        .unwrap();
        let point = |x: i32, y: i32| Value::structure([("x", Value::Int32(x)), ("y", Value::Int32(y))]);

        let ok = Value::structure([
            ("name", Value::from("tri")),
            ("points", Value::array([point(0, 0), point(1, 1)])),
            ("tags", Value::map([("k", Value::from("a"))])),
            ("extra", Value::Bool(true)),
        ]);
        assert!(validate(&schema, "Shape", &ok).valid);

        let missing = Value::structure([("points", Value::array([]))]);
        let v = validate(&schema, "Shape", &missing);
        assert!(!v.valid);
        assert!(v.error.contains("name"), "{v:?}");

        let bad_point = Value::structure([
            ("name", Value::from("tri")),
            ("points", Value::array([point(0, 0), Value::structure([("x", Value::Int32(1))])])),
        ]);
        let v = validate(&schema, "Shape", &bad_point);
        assert!(!v.valid);
        assert_eq!(v.type_name, "Point");
        assert_eq!(v.context, "Shape.points[1]");

        let bad_tag = Value::structure([
            ("name", Value::from("tri")),
            ("tags", Value::map([("k", Value::from("c"))])),
        ]);
        let v = validate(&schema, "Shape", &bad_tag);
        assert_eq!(v.type_name, "Tag");
        assert_eq!(v.context, "Shape.tags.k");

        let closed = Value::structure([("x", Value::Int32(1)), ("y", Value::Int32(2)), ("z", Value::Int32(3))]);
        assert!(!validate(&schema, "Point", &closed).valid);

        assert!(validate(&schema, "Points", &Value::array([point(0, 0)])).valid);
        assert!(!validate(&schema, "Points", &Value::array([point(0, 0), point(1, 1), point(2, 2)])).valid);
    }

    #[test]
    fn enums_and_unions() {
        let schema = parse_rdl(
            r#"
type Color Enum { RED GREEN }
type Shade Color { DARK }
type Choice Union<Int32, Color, String>;
"#,
        )
        .unwrap();
        assert!(validate(&schema, "Color", &Value::from("RED")).valid);
        assert!(!validate(&schema, "Color", &Value::from("red")).valid);
        assert!(validate(&schema, "Shade", &Value::from("GREEN")).valid);
        assert!(validate(&schema, "Shade", &Value::from("DARK")).valid);

        assert_eq!(validate(&schema, "Choice", &Value::Int32(3)).type_name, "Int32");
        assert_eq!(validate(&schema, "Choice", &Value::from("GREEN")).type_name, "Color");
        assert_eq!(validate(&schema, "Choice", &Value::from("blue")).type_name, "String");
        let v = validate(&schema, "Choice", &Value::Bool(true));
        assert!(!v.valid);
        assert_eq!(v.type_name, "Choice");
    }

    #[test]
    fn unknown_type() {
        let schema = Schema::default();
        let v = validate(&schema, "Missing", &Value::Null);
        assert!(!v.valid);
        assert!(v.error.contains("Unknown type"));
    }

    /// Interprets an `x_example` annotation as a scalar value.
    fn example_value(text: &str) -> Value {
        if let Ok(n) = text.parse::<i64>() {
            Value::Int64(n)
        } else if let Ok(x) = text.parse::<f64>() {
            Value::Float64(x)
        } else if let Ok(b) = text.parse::<bool>() {
            Value::Bool(b)
        } else {
            Value::from(text)
        }
    }

    #[test]
    fn annotated_examples() {
        let schema = parse_rdl(
            r#"
type Age Int32 (min=0, max=150, x_example="42");
type Old Int32 (min=0, max=150, x_example="200", x_expectfail="true");
type Name String (pattern="[A-Z][a-z]+", x_example="Alice");
type Person Struct {
    Name name (x_example="bob", x_expectfail="true");
    Age age (x_example="7");
}
"#,
        )
        .unwrap();
        let reg = TypeRegistry::new(&schema);
        let mut checked = 0;
        for t in &schema.types {
            let mut cases: Vec<(String, &crate::model::Annotations)> = Vec::new();
            if let Some(annos) = t.annotations() {
                cases.push((t.name().to_owned(), annos));
            }
            if reg.base_type(t) == Some(BaseType::Struct) {
                for f in reg.flattened_fields(t) {
                    cases.push((f.ty.clone(), &f.annotations));
                }
            }
            for (ty, annos) in cases {
                let Some(example) = annos.get("x_example") else { continue };
                let expect_fail = annos.get("x_expectfail").map_or(false, |s| s == "true");
                let v = validate(&schema, &ty, &example_value(example));
                assert_eq!(v.valid, !expect_fail, "example for {ty}: {v:?}");
                checked += 1;
            }
        }
        assert_eq!(checked, 5);
    }
}
