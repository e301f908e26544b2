//! Behavioural guarantees of produced loaders and dumpers


use retort_core::morphing::{DumpErrorKind, LoadErrorKind, TrailElement};
use retort_core::types::{ClassDef, RecordField, TypeExpr};
use retort_core::{name_mapping, DebugTrail, Error, ExtraIn, ExtraOut, NameMapEntry, NameMappingProvider, Retort, Value};
use test_support::*;

fn load_error(err: Error) -> retort_core::LoadError {
    match err {
        Error::Load(err) => err,
        other => panic!("expected load error, got {:?}", other),
    }
}

#[test]
fn test_round_trip_with_absorbed_extra() {
    let book = ClassDef::record("Book")
        .field("title", TypeExpr::str())
        .field_def(
            RecordField::new("extra", TypeExpr::dict(TypeExpr::str(), TypeExpr::Any))
                .default_factory(|| Value::Dict(Default::default())),
        )
        .build();
    let retort = Retort::with_recipe([name_mapping(
        &book,
        NameMappingProvider::new()
            .extra_in(ExtraIn::field("extra"))
            .extra_out(ExtraOut::field("extra")),
    )]);
    let data = Value::dict([("title", Value::str("F451")), ("isbn", Value::str("978-0"))]);

    let model = retort.load(&data, &book).unwrap();
    assert_eq!(
        model.get_attr("extra"),
        Some(&Value::dict([("isbn", Value::str("978-0"))]))
    );
    assert_eq!(retort.dump(&model, &book).unwrap(), data);
}

#[test]
fn test_round_trip_drops_skipped_extra() {
    let book = book();
    let retort = Retort::new();
    let data = Value::dict([
        ("title", Value::str("F451")),
        ("price", Value::Int(100)),
        ("author", Value::str("Ray")),
        ("isbn", Value::str("978-0")),
    ]);
    let dumped = retort.dump(&retort.load(&data, &book).unwrap(), &book).unwrap();
    assert_eq!(dumped.get_item("isbn"), None);
    assert_eq!(dumped.get_item("author"), Some(&Value::str("Ray")));
}

#[test]
fn test_second_dump_of_dumped_data_is_rejected() {
    let book = book();
    let retort = Retort::new();
    let model = retort.load(&book_data("F451", 100), &book).unwrap();
    let dumped = retort.dump(&model, &book).unwrap();

    let err = retort.dump(&dumped, &book).unwrap_err();
    assert!(matches!(err, Error::Dump(ref e) if matches!(e.kind, DumpErrorKind::Type { .. })), "{:?}", err);
    assert_eq!(retort.dump(&model, &book).unwrap(), dumped);
}

#[test]
fn test_strict_list_excludes_str_and_mapping() {
    let retort = Retort::new();
    let ty = TypeExpr::list(TypeExpr::int());
    for data in [Value::str("123"), Value::dict([("a", Value::Int(1))])] {
        let err = load_error(retort.load(&data, ty.clone()).unwrap_err());
        assert!(matches!(err.kind, LoadErrorKind::ExcludedType { .. }), "{:?}", err);
    }
}

#[test]
fn test_union_prefers_first_valid_member() {
    let first = ClassDef::record("First").field("x", TypeExpr::int()).build();
    let second = ClassDef::record("Second").field("y", TypeExpr::str()).build();
    let union = TypeExpr::union(vec![TypeExpr::from(&first), TypeExpr::from(&second)]);
    let retort = Retort::new();

    let only_second = retort.load(&Value::dict([("y", Value::str("s"))]), union.clone()).unwrap();
    assert_eq!(only_second, second.instance([("y", Value::str("s"))]));

    let both = retort
        .load(&Value::dict([("x", Value::Int(1)), ("y", Value::str("s"))]), union.clone())
        .unwrap();
    assert_eq!(both, first.instance([("x", Value::Int(1))]));

    let err = load_error(retort.load(&Value::dict([("z", Value::Int(1))]), union).unwrap_err());
    assert!(matches!(err.kind, LoadErrorKind::Union { ref errors, .. } if errors.len() == 2));
}

#[test]
fn test_recursive_model_three_levels() {
    let (node, namespace) = node();
    let retort = Retort::new().with_namespace(namespace);
    let data = Value::dict([
        ("value", Value::Int(1)),
        (
            "next",
            Value::dict([
                ("value", Value::Int(2)),
                ("next", Value::dict([("value", Value::Int(3)), ("next", Value::None)])),
            ]),
        ),
    ]);

    let model = retort.load(&data, &node).unwrap();
    let third = model.get_attr("next").and_then(|n| n.get_attr("next")).unwrap();
    assert_eq!(third.get_attr("value"), Some(&Value::Int(3)));
    assert_eq!(retort.dump(&model, &node).unwrap(), data);
}

#[test]
fn test_same_alias_fails_at_build_time() {
    let book = book();
    let retort = Retort::with_recipe([name_mapping(
        &book,
        NameMappingProvider::new().map(NameMapEntry::renames([("title", "name"), ("price", "name")]).unwrap()),
    )]);
    let err = retort.get_loader(&book).unwrap_err();
    assert!(!err.is_runtime(), "{:?}", err);
    assert!(retort.get_dumper(&book).is_err());
}

fn nested() -> (retort_core::ClassRef, Value) {
    let inner = ClassDef::record("Inner").field("g", TypeExpr::list(TypeExpr::int())).build();
    let outer = ClassDef::record("Outer").field("f", &inner).build();
    let data = Value::dict([(
        "f",
        Value::dict([(
            "g",
            Value::list([Value::Int(0), Value::Int(1), Value::Int(2), Value::str("three")]),
        )]),
    )]);
    (outer, data)
}

#[test]
fn test_trail_points_to_failing_item() {
    let (outer, data) = nested();
    let expected = [TrailElement::key("f"), TrailElement::key("g"), TrailElement::Index(3)];

    let err = load_error(Retort::new().load(&data, &outer).unwrap_err());
    let leaves = err.flatten();
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0].trail.elements(), &expected);
    assert!(matches!(leaves[0].kind, LoadErrorKind::Type { .. }));

    let err = load_error(Retort::new().debug_trail(DebugTrail::First).load(&data, &outer).unwrap_err());
    assert_eq!(err.trail.elements(), &expected);
    assert_eq!(err.to_string(), "Expected int, got str at $.f.g[3]");

    let err = load_error(Retort::new().debug_trail(DebugTrail::Disable).load(&data, &outer).unwrap_err());
    assert!(err.trail.is_empty());
}
