use criterion::{black_box, criterion_group, criterion_main, Criterion};

use rdl::prelude::*;
use rdl::tbin;

#[derive(Marshal, Unmarshal, Default, Clone, PartialEq, Debug)]
struct Point {
    x: i32,
    y: i32,
}

#[derive(Marshal, Unmarshal, Default, Clone, PartialEq, Debug)]
struct Polyline {
    name: String,
    #[tbin(name = "z")]
    depth: Option<i64>,
    points: Vec<Point>,
}

fn sample() -> Polyline {
    Polyline {
        name: String::from("sample polyline with a name past the tiny-string limit"),
        depth: Some(-12),
        points: (0..256).map(|i| Point { x: i * 37, y: -i * 1013 }).collect(),
    }
}

fn generic_sample() -> Value {
    Value::structure([
        ("name", Value::from("generic")),
        (
            "points",
            Value::array((0..256).map(|i| {
                Value::structure([("x", Value::Int32(i * 37)), ("y", Value::Int32(-i * 1013))])
            })),
        ),
    ])
}

fn encode_bench(c: &mut Criterion) {
    let line = sample();
    let value = generic_sample();

    c.bench_function("marshal_typed", |b| b.iter(|| black_box(tbin::marshal(&line))));
    c.bench_function("marshal_generic", |b| b.iter(|| black_box(tbin::marshal(&value))));
    c.bench_function("encoded_len_typed", |b| b.iter(|| black_box(tbin::encoded_len(&line))));
}

fn decode_bench(c: &mut Criterion) {
    let typed = tbin::marshal(&sample()).unwrap();
    let generic = tbin::marshal(&generic_sample()).unwrap();

    c.bench_function("unmarshal_typed", |b| {
        b.iter(|| black_box(tbin::unmarshal::<Polyline>(&typed)))
    });
    c.bench_function("unmarshal_typed_as_value", |b| {
        b.iter(|| black_box(tbin::unmarshal_value(&typed)))
    });
    c.bench_function("unmarshal_generic", |b| {
        b.iter(|| black_box(tbin::unmarshal_value(&generic)))
    });
}

criterion_group! {
    name = codec_benches;
    config = Criterion::default();
    targets = encode_bench, decode_bench
}

criterion_main!(codec_benches);
