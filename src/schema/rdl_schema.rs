//! The schema that describes RDL schemas

use lazy_static::lazy_static;

use super::builder::{
    AliasTypeBuilder, EnumTypeBuilder, SchemaBuilder, StringTypeBuilder, StructTypeBuilder,
    UnionTypeBuilder,
};
use crate::model::{BaseType, Schema};
use crate::value::Value;

lazy_static! {
    static ref RDL_SCHEMA: Schema = schema_builder().build();
}

/// The `rdl` schema (version 3): the types of a parsed schema, expressed in RDL.
pub fn rdl_schema() -> &'static Schema {
    &RDL_SCHEMA
}

const ANNOTATIONS_COMMENT: &str = "additional annotations starting with \"x_\"";

fn annotations(tb: &mut StructTypeBuilder) {
    tb.map_field("annotations", "ExtendedAnnotation", "String", true, ANNOTATIONS_COMMENT);
}

fn struct_type(
    sb: &mut SchemaBuilder,
    supertype: &str,
    name: &str,
    comment: &str,
    fields: impl FnOnce(&mut StructTypeBuilder),
) {
    let mut tb = StructTypeBuilder::new(supertype, name);
    tb.comment(comment);
    fields(&mut tb);
    sb.add_type(tb.build());
}

fn schema_builder() -> SchemaBuilder {
    let no = || Some(Value::Bool(false));
    let mut sb = SchemaBuilder::new("rdl");
    sb.version(3);
    sb.comment("This defines the schema for a schema, the output of the RDL parser. This can be used to represent schemas in JSON, Protobuf, Avro, etc, from a single definition.");

    let mut t = StringTypeBuilder::new("Identifier");
    t.comment("All names need to be of this restricted string type")
        .pattern("[a-zA-Z_]+[a-zA-Z_0-9]*");
    sb.add_type(t.build());

    let mut t = StringTypeBuilder::new("NamespacedIdentifier");
    t.comment("A Namespace is a dotted compound name, using reverse domain name order (i.e. \"com.yahoo.auth\")")
        .pattern("([a-zA-Z_]+[a-zA-Z_0-9]*)(\\.[a-zA-Z_]+[a-zA-Z_0-9])*");
    sb.add_type(t.build());

    let mut t = AliasTypeBuilder::new("Identifier", "TypeName");
    t.comment("The identifier for an already-defined type");
    sb.add_type(t.build());

    let mut t = AliasTypeBuilder::new("NamespacedIdentifier", "TypeRef");
    t.comment("A type reference can be a simple name, or also a namespaced name.");
    sb.add_type(t.build());

    let mut t = EnumTypeBuilder::new("Enum", "BaseType");
    for base in BaseType::ALL {
        t.element(base.name(), "");
    }
    sb.add_type(t.build());

    let mut t = StringTypeBuilder::new("ExtendedAnnotation");
    t.comment("ExtendedAnnotation - parsed and preserved, but has no defined meaning in RDL. Such annotations must begin with \"x_\", and may have an associated string literal value (the value will be \"\" if the annotation is just a flag).")
        .pattern("x_[a-zA-Z_0-9]*");
    sb.add_type(t.build());

    struct_type(&mut sb, "Struct", "TypeDef", "TypeDef is the basic type definition.", |tb| {
        tb.field("type", "TypeRef", false, None, "The type this type is derived from. For base types, it is the same as the name")
            .field("name", "TypeName", false, None, "The name of the type")
            .field("comment", "String", true, None, "The comment for the type");
        annotations(tb);
    });

    struct_type(
        &mut sb,
        "TypeDef",
        "AliasTypeDef",
        "AliasTypeDef is used for type definitions that add no additional attributes, and thus just create an alias",
        |_| {},
    );

    struct_type(&mut sb, "TypeDef", "BytesTypeDef", "Bytes allow the restriction by fixed size, or min/max size.", |tb| {
        tb.field("size", "Int32", true, None, "Fixed size")
            .field("minSize", "Int32", true, None, "Min size")
            .field("maxSize", "Int32", true, None, "Max size");
    });

    struct_type(
        &mut sb,
        "TypeDef",
        "StringTypeDef",
        "Strings allow the restriction by regular expression pattern or by an explicit set of values. An optional maximum size may be asserted",
        |tb| {
            tb.field("pattern", "String", true, None, "A regular expression that must be matched. Mutually exclusive with values")
                .array_field("values", "String", true, "A set of allowable values")
                .field("minSize", "Int32", true, None, "Min size")
                .field("maxSize", "Int32", true, None, "Max size");
        },
    );

    let mut t = UnionTypeBuilder::new("Union", "Number");
    t.comment("A numeric is any of the primitive numeric types");
    for base in BaseType::ALL.iter().filter(|b| b.is_numeric()) {
        t.variant(base.name());
    }
    sb.add_type(t.build());

    struct_type(
        &mut sb,
        "TypeDef",
        "NumberTypeDef",
        "A number type definition allows the restriction of numeric values.",
        |tb| {
            tb.field("min", "Number", true, None, "Min value")
                .field("max", "Number", true, None, "Max value");
        },
    );

    struct_type(&mut sb, "TypeDef", "ArrayTypeDef", "Array types can be restricted by item type and size", |tb| {
        tb.field("items", "TypeRef", false, Some(Value::from("Any")), "The type of the items, default to any type")
            .field("size", "Int32", true, None, "If present, indicate the fixed size.")
            .field("minSize", "Int32", true, None, "If present, indicate the min size")
            .field("maxSize", "Int32", true, None, "If present, indicate the max size");
    });

    struct_type(
        &mut sb,
        "TypeDef",
        "MapTypeDef",
        "Map types can be restricted by key type, item type and size",
        |tb| {
            tb.field("keys", "TypeRef", false, Some(Value::from("String")), "The type of the keys, default to String.")
                .field("items", "TypeRef", false, Some(Value::from("Any")), "The type of the items, default to Any type")
                .field("size", "Int32", true, None, "If present, indicates the fixed size.")
                .field("minSize", "Int32", true, None, "If present, indicate the min size")
                .field("maxSize", "Int32", true, None, "If present, indicate the max size");
        },
    );

    struct_type(
        &mut sb,
        "Struct",
        "StructFieldDef",
        "Each field in a struct_field_spec is defined by this type",
        |tb| {
            tb.field("name", "Identifier", false, None, "The name of the field")
                .field("type", "TypeRef", false, None, "The type of the field")
                .field("optional", "Bool", false, no(), "The field may be omitted even if specified")
                .field("default", "Any", true, None, "If field is absent, what default value should be assumed.")
                .field("comment", "String", true, None, "The comment for the field")
                .field("items", "TypeRef", true, None, "For map or array fields, the type of the items")
                .field("keys", "TypeRef", true, None, "For map type fields, the type of the keys");
            annotations(tb);
        },
    );

    struct_type(
        &mut sb,
        "TypeDef",
        "StructTypeDef",
        "A struct can restrict specific named fields to specific types. By default, any field not specified is allowed, and can be of any type. Specifying closed means only those fields explicitly",
        |tb| {
            tb.array_field("fields", "StructFieldDef", false, "The fields in this struct. By default, open Structs can have any fields in addition to these")
                .field("closed", "Bool", false, no(), "indicates that only the specified fields are acceptable. Default is open (any fields)");
        },
    );

    struct_type(
        &mut sb,
        "Struct",
        "EnumElementDef",
        "EnumElementDef defines one of the elements of an Enum",
        |tb| {
            tb.field("symbol", "Identifier", false, None, "The identifier representing the value")
                .field("comment", "String", true, None, "the comment for the element");
            annotations(tb);
        },
    );

    struct_type(
        &mut sb,
        "TypeDef",
        "EnumTypeDef",
        "Define an enumerated type. Each value of the type is represented by a symbolic identifier.",
        |tb| {
            tb.array_field("elements", "EnumElementDef", false, "The enumeration of the possible elements");
        },
    );

    struct_type(
        &mut sb,
        "TypeDef",
        "UnionTypeDef",
        "Define a type as one of any other specified type.",
        |tb| {
            tb.array_field("variants", "TypeRef", false, "The type names of constituent types. Union types get expanded, this is a flat list");
        },
    );

    let mut t = UnionTypeBuilder::new("Union", "Type");
    t.comment("A Type can be specified by any of the above specialized Types, determined by the value of the the 'type' field");
    for variant in [
        "BaseType",
        "StructTypeDef",
        "MapTypeDef",
        "ArrayTypeDef",
        "EnumTypeDef",
        "UnionTypeDef",
        "StringTypeDef",
        "BytesTypeDef",
        "NumberTypeDef",
        "AliasTypeDef",
    ] {
        t.variant(variant);
    }
    sb.add_type(t.build());

    struct_type(
        &mut sb,
        "Struct",
        "ResourceInput",
        "ResourceOutput defines input characteristics of a Resource",
        |tb| {
            tb.field("name", "Identifier", false, None, "the formal name of the input")
                .field("type", "TypeRef", false, None, "The type of the input")
                .field("comment", "String", true, None, "The optional comment")
                .field("pathParam", "Bool", false, no(), "true of this input is a path parameter")
                .field("queryParam", "String", true, None, "if present, the name of the query param name")
                .field("header", "String", true, None, "If present, the name of the header the input is associated with")
                .field("pattern", "String", true, None, "If present, the pattern associated with the pathParam (i.e. wildcard path matches)")
                .field("default", "Any", true, None, "If present, the default value for optional params")
                .field("optional", "Bool", false, no(), "If present, indicates that the input is optional")
                .field("flag", "Bool", false, no(), "If present, indicates the queryparam is of flag style (no value)")
                .field("context", "String", true, None, "If present, indicates the parameter comes form the implementation context");
            annotations(tb);
        },
    );

    struct_type(
        &mut sb,
        "Struct",
        "ResourceOutput",
        "ResourceOutput defines output characteristics of a Resource",
        |tb| {
            tb.field("name", "Identifier", false, None, "the formal name of the output")
                .field("type", "TypeRef", false, None, "The type of the output")
                .field("header", "String", false, None, "the name of the header associated with this output")
                .field("comment", "String", true, None, "The optional comment for the output")
                .field("optional", "Bool", false, no(), "If present, indicates that the output is optional (the server decides)");
            annotations(tb);
        },
    );

    struct_type(
        &mut sb,
        "Struct",
        "ResourceAuth",
        "ResourceAuth defines authentication and authorization attributes of a resource. Presence of action, resource, or domain implies authentication; the authentication flag alone is required only when no authorization is done.",
        |tb| {
            tb.field("authenticate", "Bool", false, no(), "if present and true, then the requester must be authenticated")
                .field("action", "String", true, None, "the action to authorize access to. This forces authentication")
                .field("resource", "String", true, None, "the resource identity to authorize access to")
                .field("domain", "String", true, None, "if present, the alternate domain to check access to. This is rare.");
        },
    );

    struct_type(
        &mut sb,
        "Struct",
        "ExceptionDef",
        "ExceptionDef describes the exception a symbolic response code maps to.",
        |tb| {
            tb.field("type", "String", false, None, "The type of the exception")
                .field("comment", "String", true, None, "the optional comment for the exception");
        },
    );

    struct_type(&mut sb, "Struct", "Resource", "A Resource of a REST service", |tb| {
        tb.field("type", "TypeRef", false, None, "The type of the resource")
            .field("method", "String", false, None, "The method for the action (typically GET, POST, etc for HTTP access)")
            .field("path", "String", false, None, "The resource path template")
            .field("comment", "String", true, None, "The optional comment")
            .array_field("inputs", "ResourceInput", true, "An Array named inputs")
            .array_field("outputs", "ResourceOutput", true, "An Array of named outputs")
            .field("auth", "ResourceAuth", true, None, "The optional authentication or authorization directive")
            .field("expected", "String", false, Some(Value::from("OK")), "The expected symbolic response code")
            .array_field("alternatives", "String", true, "The set of alternative but non-error response codes")
            .map_field("exceptions", "String", "ExceptionDef", true, "A map of symbolic response code to Exception definitions")
            .field("async", "Bool", true, None, "A hint to server implementations that this resource would be better implemented with async I/O");
        annotations(tb);
        tb.array_field("consumes", "String", true, "Optional hint for resource acceptable input types")
            .array_field("produces", "String", true, "Optional hint for resource output content types")
            .field("name", "Identifier", true, None, "The optional name of the resource");
    });

    struct_type(
        &mut sb,
        "Struct",
        "Schema",
        "A Schema is a container for types and resources. It is self-contained (no external references). and is the output of the RDL parser.",
        |tb| {
            tb.field("namespace", "NamespacedIdentifier", true, None, "The namespace for the schema")
                .field("name", "Identifier", true, None, "The name of the schema")
                .field("version", "Int32", true, None, "The version of the schema")
                .field("comment", "String", true, None, "The comment for the entire schema")
                .array_field("types", "Type", true, "The types this schema defines.")
                .array_field("resources", "Resource", true, "The resources for a service this schema defines")
                .field("base", "String", true, None, "the base path for resources in the schema.");
        },
    );

    sb
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::Type;
    use crate::registry::TypeRegistry;
    use crate::validate::validate;

    #[test]
    fn self_schema_is_consistent() {
        let checked = schema_builder().build_paranoid().unwrap();
        assert_eq!(&checked, rdl_schema());
        let schema = rdl_schema();
        assert_eq!(schema.name.as_deref(), Some("rdl"));
        assert_eq!(schema.version, Some(3));
        assert_eq!(schema.types.len(), 26);
        match schema.find_type("BaseType") {
            Some(Type::Enum(et)) => {
                assert_eq!(et.elements.len(), 18);
                assert_eq!(et.elements[11].symbol, "UUID");
            }
            other => panic!("unexpected {other:?}"),
        }
        let reg = TypeRegistry::new(schema);
        let fields = reg.flattened_fields(reg.find_type("ArrayTypeDef").unwrap());
        assert_eq!(fields.len(), 8);
        assert_eq!(fields[4].default, Some(Value::from("Any")));
    }

    #[test]
    fn validates_schema_values() {
        let schema = rdl_schema();
        let good = Value::structure([
            ("name", Value::from("sample")),
            ("version", Value::Int32(1)),
            (
                "types",
                Value::array([Value::structure([
                    ("type", Value::from("String")),
                    ("name", Value::from("Name")),
                    ("pattern", Value::from("[a-z]+")),
                ])]),
            ),
        ]);
        let v = validate(schema, "Schema", &good);
        assert!(v.valid, "{v:?}");

        let bad = Value::structure([("name", Value::from("9lives"))]);
        let v = validate(schema, "Schema", &bad);
        assert!(!v.valid);
        assert_eq!(v.type_name, "Identifier");
        assert_eq!(v.context, "Schema.name");

        let v = validate(schema, "BaseType", &Value::from("UUID"));
        assert!(v.valid);
    }
}
