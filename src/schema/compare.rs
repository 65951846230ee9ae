//! Structural comparison of two schemas
//!
//! An alias of a restrictable base type and the same type declared with no
//! restrictions are equivalent (`type T String;` reads back as a string
//! definition either way); otherwise types compare field by field.

use std::borrow::Cow;
use std::fmt::Debug;

use crate::model::{
    ArrayTypeDef, BaseType, BytesTypeDef, EnumTypeDef, MapTypeDef, NumberTypeDef, Resource,
    Schema, StringTypeDef, StructTypeDef, Type, UnionTypeDef,
};

fn differ<T: PartialEq + Debug>(what: &str, a: &T, b: &T) -> Option<String> {
    if a == b {
        None
    } else {
        Some(format!("{what} differs: {a:?} vs {b:?}"))
    }
}

macro_rules! first_difference {
    ($($diff:expr),+ $(,)?) => {
        $(
            if let Some(d) = $diff {
                return Some(d);
            }
        )+
    };
}

/// Describes the first difference between `a` and `b`, or `None` if the
/// schemas are equivalent.
pub fn compare_schemas(a: &Schema, b: &Schema) -> Option<String> {
    first_difference!(
        differ("schema name", &a.name, &b.name),
        differ("schema namespace", &a.namespace, &b.namespace),
        differ("schema version", &a.version, &b.version),
        differ("schema base", &a.base, &b.base),
        differ("schema comment", &a.comment, &b.comment),
        differ("schema annotations", &a.annotations, &b.annotations),
    );
    let names = |s: &Schema| s.types.iter().map(|t| t.name().to_owned()).collect::<Vec<_>>();
    if a.types.len() != b.types.len() {
        return differ("type list", &names(a), &names(b));
    }
    for (ta, tb) in a.types.iter().zip(&b.types) {
        first_difference!(compare_types(ta, tb));
    }
    if a.resources.len() != b.resources.len() {
        return differ("resource count", &a.resources.len(), &b.resources.len());
    }
    for (ra, rb) in a.resources.iter().zip(&b.resources) {
        first_difference!(compare_resources(ra, rb));
    }
    None
}

/// Expands an alias of a restrictable base type to its unrestricted form.
fn normalized(t: &Type) -> Cow<'_, Type> {
    let def = match t {
        Type::Alias(def) => def,
        _ => return Cow::Borrowed(t),
    };
    let def = def.clone();
    Cow::Owned(match BaseType::from_keyword(&def.supertype) {
        Some(BaseType::String) => Type::String(StringTypeDef {
            def,
            ..Default::default()
        }),
        Some(BaseType::Bytes) => Type::Bytes(BytesTypeDef {
            def,
            ..Default::default()
        }),
        Some(b) if b.is_numeric() => Type::Number(NumberTypeDef {
            def,
            ..Default::default()
        }),
        Some(BaseType::Array) => Type::Array(ArrayTypeDef {
            def,
            items: String::from("Any"),
            ..Default::default()
        }),
        Some(BaseType::Map) => Type::Map(MapTypeDef {
            def,
            keys: String::from("String"),
            items: String::from("Any"),
            ..Default::default()
        }),
        Some(BaseType::Struct) => Type::Struct(StructTypeDef {
            def,
            ..Default::default()
        }),
        Some(BaseType::Enum) => Type::Enum(EnumTypeDef {
            def,
            ..Default::default()
        }),
        Some(BaseType::Union) => Type::Union(UnionTypeDef {
            def,
            ..Default::default()
        }),
        _ => Type::Alias(def),
    })
}

fn compare_types(a: &Type, b: &Type) -> Option<String> {
    let name = a.name();
    if name != b.name() {
        return differ("type name", &name, &b.name());
    }
    let (a, b) = (normalized(a), normalized(b));
    if a.variant_name() != b.variant_name() {
        return Some(format!(
            "type {name}: kind differs: {} vs {}",
            a.variant_name(),
            b.variant_name()
        ));
    }
    if let (Some(da), Some(db)) = (a.def(), b.def()) {
        first_difference!(
            differ(&format!("type {name}: supertype"), &da.supertype, &db.supertype),
            differ(&format!("type {name}: comment"), &da.comment, &db.comment),
            differ(&format!("type {name}: annotations"), &da.annotations, &db.annotations),
        );
    }
    match (&*a, &*b) {
        (Type::Struct(sa), Type::Struct(sb)) => {
            first_difference!(differ(&format!("type {name}: closed"), &sa.closed, &sb.closed));
            let fields = |s: &StructTypeDef| s.fields.iter().map(|f| f.name.clone()).collect::<Vec<_>>();
            if sa.fields.len() != sb.fields.len() {
                return differ(&format!("type {name}: fields"), &fields(sa), &fields(sb));
            }
            for (fa, fb) in sa.fields.iter().zip(&sb.fields) {
                first_difference!(differ(&format!("field {name}.{}", fa.name), fa, fb));
            }
            None
        }
        (Type::Enum(ea), Type::Enum(eb)) => differ(&format!("type {name}: elements"), &ea.elements, &eb.elements),
        (a, b) => differ(&format!("type {name}"), a, b),
    }
}

fn compare_resources(a: &Resource, b: &Resource) -> Option<String> {
    let label = format!("resource {} {}", a.method, a.path);
    first_difference!(
        differ(&format!("{label}: type"), &a.ty, &b.ty),
        differ(&format!("{label}: method"), &a.method, &b.method),
        differ(&format!("{label}: path"), &a.path, &b.path),
        differ(&format!("{label}: name"), &a.name, &b.name),
        differ(&format!("{label}: comment"), &a.comment, &b.comment),
        differ(&format!("{label}: inputs"), &a.inputs, &b.inputs),
        differ(&format!("{label}: outputs"), &a.outputs, &b.outputs),
        differ(&format!("{label}: auth"), &a.auth, &b.auth),
        differ(&format!("{label}: expected"), &a.expected, &b.expected),
        differ(&format!("{label}: alternatives"), &a.alternatives, &b.alternatives),
        differ(&format!("{label}: exceptions"), &a.exceptions, &b.exceptions),
        differ(&format!("{label}: async"), &a.is_async, &b.is_async),
        differ(&format!("{label}: annotations"), &a.annotations, &b.annotations),
        differ(&format!("{label}: consumes"), &a.consumes, &b.consumes),
        differ(&format!("{label}: produces"), &a.produces, &b.produces),
    );
    None
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::builder::{AliasTypeBuilder, SchemaBuilder, StringTypeBuilder};
    use crate::schema::parse_rdl;

    #[test]
    fn alias_matches_unrestricted() {
        let mut sb = SchemaBuilder::new("s");
        sb.add_type(AliasTypeBuilder::new("String", "Name").build());
        let built = sb.build();
        let parsed = parse_rdl("name s; type Name String;").unwrap();
        assert!(matches!(parsed.types[0], Type::String(_)));
        assert_eq!(compare_schemas(&built, &parsed), None);
    }

    #[test]
    fn reports_first_difference() {
        let a = parse_rdl("type A String (maxSize=3); type B Struct { A a; }").unwrap();
        let b = parse_rdl("type A String (maxSize=3); type B Struct { A a (optional); }").unwrap();
        let diff = compare_schemas(&a, &b).unwrap();
        assert!(diff.starts_with("field B.a differs"), "{diff}");

        let mut sb = SchemaBuilder::new("s");
        let mut st = StringTypeBuilder::new("A");
        st.max_size(4);
        sb.add_type(st.build());
        let c = sb.build();
        let diff = compare_schemas(&a, &c).unwrap();
        assert!(diff.starts_with("schema name"), "{diff}");
    }
}
