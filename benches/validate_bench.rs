use criterion::{black_box, criterion_group, criterion_main, Criterion};

use rdl::prelude::*;

const SCHEMA: &str = r#"
type Tag String (values=["a", "b", "c"]);
type Name String (pattern="[A-Z][a-z]+", maxSize=32);
type Point Struct (closed) { Int32 x; Int32 y; }
type Shape Struct {
    Name name;
    Array<Point> points (optional);
    Map<String,Tag> tags (optional);
    Int32 weight (default=1);
}
"#;

fn shape() -> Value {
    Value::structure([
        ("name", Value::from("Polygon")),
        (
            "points",
            Value::array((0..64).map(|i| Value::structure([("x", Value::Int32(i)), ("y", Value::Int64(-i as i64))]))),
        ),
        ("tags", Value::map([("kind", Value::from("a")), ("fill", Value::from("c"))])),
    ])
}

fn parse_bench(c: &mut Criterion) {
    c.bench_function("parse_rdl", |b| b.iter(|| black_box(parse_rdl(SCHEMA))));
}

fn validate_bench(c: &mut Criterion) {
    let schema = parse_rdl(SCHEMA).unwrap();
    let value = shape();

    c.bench_function("validate_struct", |b| {
        b.iter(|| black_box(validate(&schema, "Shape", &value)))
    });
    c.bench_function("validate_pattern", |b| {
        b.iter(|| black_box(validate(&schema, "Name", &Value::from("Triangle"))))
    });
}

criterion_group! {
    name = validate_benches;
    config = Criterion::default();
    targets = parse_bench, validate_bench
}

criterion_main!(validate_benches);
