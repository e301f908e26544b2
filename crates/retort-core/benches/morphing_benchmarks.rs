//! Benchmarks for building and running loaders, dumpers and converters
//!
//! Copyright (c) 2025 Retort Team
//! Licensed under the Apache-2.0 license

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use retort_core::types::{ClassDef, ClassRef, RecordField, TypeExpr};
use retort_core::{name_mapping, DebugTrail, NameMappingProvider, NameStyle, Retort, Value};

fn person() -> ClassRef {
    ClassDef::record("Person")
        .field("name", TypeExpr::str())
        .field("age", TypeExpr::int())
        .build()
}

fn book(person: &ClassRef) -> ClassRef {
    ClassDef::record("Book")
        .field("title", TypeExpr::str())
        .field("price", TypeExpr::int())
        .field("author", person)
        .field("tags", TypeExpr::list(TypeExpr::str()))
        .field_def(RecordField::new("isbn", TypeExpr::optional(TypeExpr::str())).default(Value::None))
        .build()
}

fn book_data(i: i64) -> Value {
    Value::dict([
        ("title", Value::str(format!("Book {}", i))),
        ("price", Value::Int(i * 10)),
        ("author", Value::dict([("name", Value::str("Ray")), ("age", Value::Int(40 + i % 50))])),
        ("tags", Value::list([Value::str("fiction"), Value::str("classic")])),
    ])
}

fn create_library(size: i64) -> Value {
    Value::list((0..size).map(book_data))
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    let person = person();
    let book = book(&person);

    group.bench_function("loader_uncached", |b| {
        b.iter(|| {
            let retort = Retort::new();
            black_box(retort.get_loader(&book).unwrap())
        })
    });

    let retort = Retort::new();
    retort.get_loader(&book).unwrap();
    group.bench_function("loader_cached", |b| b.iter(|| black_box(retort.get_loader(&book).unwrap())));

    group.bench_function("dumper_with_name_style", |b| {
        b.iter(|| {
            let retort = Retort::with_recipe([name_mapping(&book, NameMappingProvider::new().name_style(NameStyle::Camel))]);
            black_box(retort.get_dumper(&book).unwrap())
        })
    });

    group.finish();
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");
    let person = person();
    let book = book(&person);
    let ty = TypeExpr::list(TypeExpr::from(&book));

    for size in [1, 100, 1000] {
        let data = create_library(size);
        for mode in [DebugTrail::Disable, DebugTrail::First, DebugTrail::All] {
            let loader = Retort::new().debug_trail(mode).get_loader(ty.clone()).unwrap();
            group.bench_with_input(BenchmarkId::new(format!("{:?}", mode), size), &data, |b, data| {
                b.iter(|| black_box(loader.call(data).unwrap()))
            });
        }
    }

    group.finish();
}

fn bench_dump(c: &mut Criterion) {
    let mut group = c.benchmark_group("dump");
    let person = person();
    let book = book(&person);
    let ty = TypeExpr::list(TypeExpr::from(&book));
    let retort = Retort::new();

    for size in [1, 100, 1000] {
        let models = retort.load(&create_library(size), ty.clone()).unwrap();
        let dumper = retort.get_dumper(ty.clone()).unwrap();
        group.bench_with_input(BenchmarkId::new("dump", size), &models, |b, models| {
            b.iter(|| black_box(dumper.call(models).unwrap()))
        });
    }

    group.finish();
}

fn bench_errors(c: &mut Criterion) {
    let mut group = c.benchmark_group("error_handling");
    let person = person();
    let book = book(&person);
    let invalid = Value::dict([("title", Value::Int(1)), ("author", Value::dict([("age", Value::str("x"))]))]);

    for mode in [DebugTrail::Disable, DebugTrail::All] {
        let loader = Retort::new().debug_trail(mode).get_loader(&book).unwrap();
        group.bench_with_input(BenchmarkId::new("invalid", format!("{:?}", mode)), &invalid, |b, data| {
            b.iter(|| black_box(loader.call(data).unwrap_err()))
        });
    }

    group.finish();
}

fn bench_convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert");
    let person = person();
    let book = book(&person);
    let card = ClassDef::record("Card")
        .field("title", TypeExpr::str())
        .field("price", TypeExpr::int())
        .build();
    let retort = Retort::new();
    let model = retort.load(&book_data(1), &book).unwrap();
    let converter = retort.get_converter(&book, &card).unwrap();

    group.bench_function("book_to_card", |b| b.iter(|| black_box(converter.convert(&model).unwrap())));
    group.finish();
}

criterion_group!(benches, bench_build, bench_load, bench_dump, bench_errors, bench_convert);
criterion_main!(benches);
