//! Printing a [`Schema`] back to RDL text
//!
//! The output parses back to an equivalent schema. Comments are written as
//! leading `//` lines; path and query parameter flags are not written since
//! the parser derives them from the resource path.

use std::fmt::{self, Write};

use crate::model::{
    Annotations, EnumElementDef, Resource, Schema, StructFieldDef, Type, TypeDef,
};
use crate::value::Value;

/// Renders `schema` as RDL text.
pub fn unparse_rdl(schema: &Schema) -> String {
    let mut out = String::new();
    // writing to a String cannot fail
    let _ = write_rdl(schema, &mut out);
    out
}

/// Writes `schema` as RDL text to `out`.
pub fn write_rdl<W: Write>(schema: &Schema, out: &mut W) -> fmt::Result {
    let has_header = schema.name.is_some()
        || schema.namespace.is_some()
        || schema.version.is_some()
        || schema.base.is_some();
    if let Some(comment) = &schema.comment {
        if has_header {
            write_comment(out, "", comment)?;
        } else {
            writeln!(out, "comment {};", quote(comment))?;
        }
    }
    if let Some(ns) = &schema.namespace {
        writeln!(out, "namespace {ns};")?;
    }
    if let Some(name) = &schema.name {
        writeln!(out, "name {name};")?;
    }
    if let Some(version) = schema.version {
        writeln!(out, "version {version};")?;
    }
    if let Some(base) = &schema.base {
        writeln!(out, "base {};", quote(base))?;
    }
    for (key, value) in &schema.annotations {
        writeln!(out, "{key} = {};", quote(value))?;
    }
    for t in &schema.types {
        if matches!(t, Type::BaseType(_)) {
            continue;
        }
        writeln!(out)?;
        write_type(out, t)?;
    }
    for r in &schema.resources {
        writeln!(out)?;
        write_resource(out, r)?;
    }
    Ok(())
}

fn write_comment<W: Write>(out: &mut W, indent: &str, comment: &str) -> fmt::Result {
    for line in comment.lines() {
        writeln!(out, "{indent}// {}", line.trim())?;
    }
    Ok(())
}

fn quote(s: &str) -> String {
    let mut q = String::with_capacity(s.len() + 2);
    q.push('"');
    for c in s.chars() {
        match c {
            '"' => q.push_str("\\\""),
            '\\' => q.push_str("\\\\"),
            '\n' => q.push_str("\\n"),
            '\t' => q.push_str("\\t"),
            '\r' => q.push_str("\\r"),
            c if c.is_control() => {
                let _ = write!(q, "\\u{:04x}", u32::from(c));
            }
            c => q.push(c),
        }
    }
    q.push('"');
    q
}

/// Literal text for a default value; `None` when RDL has no literal for it.
fn literal(v: &Value) -> Option<String> {
    Some(match v {
        Value::Bool(b) => b.to_string(),
        Value::Int8(n) => n.to_string(),
        Value::Int16(n) => n.to_string(),
        Value::Int32(n) => n.to_string(),
        Value::Int64(n) => n.to_string(),
        Value::Float32(x) if x.is_finite() => x.to_string(),
        Value::Float64(x) if x.is_finite() => x.to_string(),
        Value::String(s) => quote(s),
        Value::Symbol(s) => quote(s.as_str()),
        Value::Timestamp(ts) => quote(&ts.to_string()),
        Value::Uuid(u) => quote(&u.to_string()),
        Value::Array(items) => {
            let parts = items.iter().map(literal).collect::<Option<Vec<_>>>()?;
            format!("[{}]", parts.join(", "))
        }
        _ => return None,
    })
}

fn push_annotations(opts: &mut Vec<String>, annotations: &Annotations) {
    for (key, value) in annotations {
        opts.push(format!("{key}={}", quote(value)));
    }
}

fn push_sizes(opts: &mut Vec<String>, size: Option<i32>, min: Option<i32>, max: Option<i32>) {
    if let Some(n) = size {
        opts.push(format!("size={n}"));
    }
    if let Some(n) = min {
        opts.push(format!("minSize={n}"));
    }
    if let Some(n) = max {
        opts.push(format!("maxSize={n}"));
    }
}

fn options(opts: &[String]) -> String {
    if opts.is_empty() {
        String::new()
    } else {
        format!(" ({})", opts.join(", "))
    }
}

fn type_header<W: Write>(out: &mut W, def: &TypeDef, supertype: &str, opts: &[String]) -> fmt::Result {
    if let Some(c) = &def.comment {
        write_comment(out, "", c)?;
    }
    write!(out, "type {} {supertype}{}", def.name, options(opts))
}

fn write_type<W: Write>(out: &mut W, t: &Type) -> fmt::Result {
    let mut opts = Vec::new();
    match t {
        Type::BaseType(_) => return Ok(()),
        Type::Alias(def) => {
            push_annotations(&mut opts, &def.annotations);
            type_header(out, def, &def.supertype, &opts)?;
        }
        Type::String(st) => {
            if let Some(p) = &st.pattern {
                opts.push(format!("pattern={}", quote(p)));
            }
            if let Some(values) = &st.values {
                let quoted: Vec<String> = values.iter().map(|v| quote(v)).collect();
                opts.push(format!("values=[{}]", quoted.join(", ")));
            }
            push_sizes(&mut opts, None, st.min_size, st.max_size);
            push_annotations(&mut opts, &st.def.annotations);
            type_header(out, &st.def, &st.def.supertype, &opts)?;
        }
        Type::Bytes(bt) => {
            push_sizes(&mut opts, bt.size, bt.min_size, bt.max_size);
            push_annotations(&mut opts, &bt.def.annotations);
            type_header(out, &bt.def, &bt.def.supertype, &opts)?;
        }
        Type::Number(nt) => {
            if let Some(min) = &nt.min {
                opts.push(format!("min={min}"));
            }
            if let Some(max) = &nt.max {
                opts.push(format!("max={max}"));
            }
            push_annotations(&mut opts, &nt.def.annotations);
            type_header(out, &nt.def, &nt.def.supertype, &opts)?;
        }
        Type::Array(at) => {
            push_sizes(&mut opts, at.size, at.min_size, at.max_size);
            push_annotations(&mut opts, &at.def.annotations);
            let sup = if at.def.supertype == "Array" {
                format!("Array<{}>", at.items)
            } else {
                at.def.supertype.clone()
            };
            type_header(out, &at.def, &sup, &opts)?;
        }
        Type::Map(mt) => {
            push_sizes(&mut opts, mt.size, mt.min_size, mt.max_size);
            push_annotations(&mut opts, &mt.def.annotations);
            let sup = if mt.def.supertype == "Map" {
                format!("Map<{},{}>", mt.keys, mt.items)
            } else {
                mt.def.supertype.clone()
            };
            type_header(out, &mt.def, &sup, &opts)?;
        }
        Type::Union(ut) => {
            push_annotations(&mut opts, &ut.def.annotations);
            let sup = if ut.def.supertype == "Union" {
                format!("Union<{}>", ut.variants.join(","))
            } else {
                ut.def.supertype.clone()
            };
            type_header(out, &ut.def, &sup, &opts)?;
        }
        Type::Struct(st) => {
            if st.closed {
                opts.push(String::from("closed"));
            }
            push_annotations(&mut opts, &st.def.annotations);
            type_header(out, &st.def, &st.def.supertype, &opts)?;
            writeln!(out, " {{")?;
            for f in &st.fields {
                write_field(out, f)?;
            }
            return writeln!(out, "}}");
        }
        Type::Enum(et) => {
            push_annotations(&mut opts, &et.def.annotations);
            type_header(out, &et.def, &et.def.supertype, &opts)?;
            writeln!(out, " {{")?;
            for e in &et.elements {
                write_element(out, e)?;
            }
            return writeln!(out, "}}");
        }
    }
    writeln!(out, ";")
}

fn field_type(f: &StructFieldDef) -> String {
    match (f.ty.as_str(), &f.keys, &f.items) {
        ("Array", _, Some(items)) => format!("Array<{items}>"),
        ("Map", Some(keys), Some(items)) => format!("Map<{keys},{items}>"),
        ("Map", Some(keys), None) => format!("Map<{keys}>"),
        ("Map", None, Some(items)) => format!("Map<String,{items}>"),
        _ => f.ty.clone(),
    }
}

fn write_field<W: Write>(out: &mut W, f: &StructFieldDef) -> fmt::Result {
    if let Some(c) = &f.comment {
        write_comment(out, "    ", c)?;
    }
    let mut opts = Vec::new();
    if f.optional {
        opts.push(String::from("optional"));
    }
    if let Some(lit) = f.default.as_ref().and_then(literal) {
        opts.push(format!("default={lit}"));
    }
    push_annotations(&mut opts, &f.annotations);
    writeln!(out, "    {} {}{};", field_type(f), f.name, options(&opts))
}

fn write_element<W: Write>(out: &mut W, e: &EnumElementDef) -> fmt::Result {
    if let Some(c) = &e.comment {
        write_comment(out, "    ", c)?;
    }
    let mut opts = Vec::new();
    push_annotations(&mut opts, &e.annotations);
    writeln!(out, "    {}{}", e.symbol, options(&opts))
}

fn write_resource<W: Write>(out: &mut W, r: &Resource) -> fmt::Result {
    if let Some(c) = &r.comment {
        write_comment(out, "", c)?;
    }
    let mut opts = Vec::new();
    if let Some(name) = &r.name {
        opts.push(format!("name={}", quote(name)));
    }
    match r.is_async {
        Some(true) => opts.push(String::from("async")),
        Some(false) => opts.push(String::from("async=false")),
        None => {}
    }
    push_annotations(&mut opts, &r.annotations);
    writeln!(out, "resource {} {} {}{} {{", r.ty, r.method, quote(&r.path), options(&opts))?;

    for input in &r.inputs {
        if let Some(c) = &input.comment {
            write_comment(out, "    ", c)?;
        }
        let mut opts = Vec::new();
        if input.optional {
            opts.push(String::from("optional"));
        }
        if let Some(lit) = input.default.as_ref().and_then(literal) {
            opts.push(format!("default={lit}"));
        }
        if let Some(h) = &input.header {
            opts.push(format!("header={}", quote(h)));
        }
        if let Some(p) = &input.pattern {
            opts.push(format!("pattern={}", quote(p)));
        }
        if input.flag {
            opts.push(String::from("flag"));
        }
        if let Some(ctx) = &input.context {
            opts.push(format!("context={}", quote(ctx)));
        }
        push_annotations(&mut opts, &input.annotations);
        writeln!(out, "    {} {}{};", input.ty, input.name, options(&opts))?;
    }
    for output in &r.outputs {
        if let Some(c) = &output.comment {
            write_comment(out, "    ", c)?;
        }
        let mut opts = Vec::new();
        if !output.header.is_empty() {
            opts.push(format!("header={}", quote(&output.header)));
        }
        if output.optional {
            opts.push(String::from("optional"));
        }
        opts.push(String::from("out"));
        push_annotations(&mut opts, &output.annotations);
        writeln!(out, "    {} {}{};", output.ty, output.name, options(&opts))?;
    }
    if let Some(auth) = &r.auth {
        if auth.authenticate {
            writeln!(out, "    authenticate;")?;
        }
        if let (Some(action), Some(resource)) = (&auth.action, &auth.resource) {
            write!(out, "    authorize ({}, {}", quote(action), quote(resource))?;
            if let Some(domain) = &auth.domain {
                write!(out, ", domain={}", quote(domain))?;
            }
            writeln!(out, ");")?;
        }
    }
    if r.expected != "OK" || !r.alternatives.is_empty() {
        write!(out, "    expected {}", r.expected)?;
        for alt in &r.alternatives {
            write!(out, ", {alt}")?;
        }
        writeln!(out, ";")?;
    }
    if !r.exceptions.is_empty() {
        writeln!(out, "    exceptions {{")?;
        for (code, exc) in &r.exceptions {
            if let Some(c) = &exc.comment {
                write_comment(out, "        ", c)?;
            }
            writeln!(out, "        {} {code};", exc.ty)?;
        }
        writeln!(out, "    }}")?;
    }
    if !r.consumes.is_empty() {
        writeln!(out, "    consumes {};", r.consumes.join(", "))?;
    }
    if !r.produces.is_empty() {
        writeln!(out, "    produces {};", r.produces.join(", "))?;
    }
    writeln!(out, "}}")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::{compare_schemas, parse_rdl};

    fn round_trip(text: &str) {
        let first = parse_rdl(text).unwrap();
        let printed = unparse_rdl(&first);
        let second = parse_rdl(&printed).unwrap_or_else(|err| panic!("{err}\n{printed}"));
        assert_eq!(compare_schemas(&first, &second), None, "{printed}");
    }

    #[test]
    fn types_round_trip() {
        round_trip(
            r#"
// A sample
name sample;
version 4;
x_owner = "me";

// A name
type Name String (pattern="[a-z]+\"?", x_a="b");
type Choice String (values=["one", "two"], maxSize=3);
type Blob Bytes (size=16);
type Ratio Float64 (min=-0.5, max=1);
type Names Array<Name> (maxSize=4);
type Index Map<Name,Int64>;
type Nick Name;
type When Timestamp;
type Pick Union<Name, Int32>;
type Base Struct {
    // the name
    Name name;
    Int32 count (optional, default=7);
    Array<String> tags (optional);
    Map<String,Int32> counts (optional);
    Base next (optional);
}
type Derived Base (closed) {
    Float64 weight (default=1.5, x_unit="kg");
}
type Empty Base {}
type Color Enum {
    RED // warm
    BLUE (x_hex="00f")
}
type Inline Struct {
    String code (pattern="[A-Z]{3}");
}
"#,
        );
    }

    #[test]
    fn resources_round_trip() {
        round_trip(
            r#"
type User Struct { String name; }
type Problem Struct { String message; }

// fetch
resource User GET "/users/{name}?v={verbose}" (name=GetUser, async) {
    // who
    String name;
    Bool verbose (optional, default=false);
    String etag (header="If-None-Match");
    String tag (header="ETag", out);
    authenticate;
    authorize ("read", "user", domain="sports");
    expected OK, NOT_MODIFIED;
    exceptions {
        // missing
        Problem NOT_FOUND;
    }
    consumes application/json, text/plain
    produces application/json
}
"#,
        );
    }

    #[test]
    fn quoting() {
        assert_eq!(quote("a\"b\\c\n"), "\"a\\\"b\\\\c\\n\"");
        assert_eq!(literal(&Value::array([Value::Int32(1), Value::from("x")])).as_deref(), Some("[1, \"x\"]"));
        assert_eq!(literal(&Value::Null), None);
    }

    #[test]
    fn self_schema_round_trip() {
        let schema = crate::schema::rdl_schema();
        let printed = unparse_rdl(schema);
        let reparsed = parse_rdl(&printed).unwrap_or_else(|err| panic!("{err}\n{printed}"));
        assert_eq!(compare_schemas(schema, &reparsed), None);
    }
}
