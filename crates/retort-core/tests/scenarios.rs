//! End-to-end loading and dumping through a default retort


use chrono::{DateTime, NaiveDate};
use retort_core::morphing::{LoadErrorKind, TrailElement};
use retort_core::types::TypeExpr;
use retort_core::{name_mapping, Error, NameMapEntry, NameMappingProvider, Retort, Value};
use test_support::*;

#[test]
fn test_default_field_is_filled_and_dumped() {
    let book = book();
    let retort = Retort::new();
    let model = retort.load(&book_data("F451", 100), &book).unwrap();
    assert_eq!(
        model,
        book.instance([
            ("title", Value::str("F451")),
            ("price", Value::Int(100)),
            ("author", Value::str("Unknown")),
        ])
    );
    assert_eq!(
        retort.dump(&model, &book).unwrap(),
        Value::dict([
            ("title", Value::str("F451")),
            ("price", Value::Int(100)),
            ("author", Value::str("Unknown")),
        ])
    );
}

#[test]
fn test_nested_model_round_trip() {
    let person = person();
    let book = authored_book(&person);
    let retort = Retort::new();
    let json = r#"{"title": "F451", "price": 100, "author": {"name": "Ray"}}"#;

    let model = retort.load_json(json, &book).unwrap();
    assert_eq!(
        model.get_attr("author"),
        Some(&person.instance([("name", Value::str("Ray"))]))
    );

    let dumped = retort.dump_json(&model, &book).unwrap();
    let expected: serde_json::Value = serde_json::from_str(json).unwrap();
    assert_eq!(serde_json::from_str::<serde_json::Value>(&dumped).unwrap(), expected);
}

#[test]
fn test_renamed_field_keeps_wire_key() {
    let event = event();
    let retort = Retort::with_recipe([name_mapping(
        &event,
        NameMappingProvider::new().map(NameMapEntry::renames([("timestamp", "ts")]).unwrap()),
    )]);
    let data = Value::dict([("name", Value::str("S")), ("ts", Value::str("2023-05-14T00:06:33+00:00"))]);

    let model = retort.load(&data, &event).unwrap();
    let expected_ts = DateTime::parse_from_rfc3339("2023-05-14T00:06:33+00:00").unwrap();
    assert_eq!(model.get_attr("timestamp"), Some(&Value::DateTime(expected_ts)));
    assert_eq!(retort.dump(&model, &event).unwrap(), data);
}

#[test]
fn test_positional_list_layout() {
    let action = action();
    let retort = Retort::with_recipe([name_mapping(&action, NameMappingProvider::new().as_list(true))]);
    let data = Value::list([Value::Int(23), Value::str("click"), Value::str("2023-05-20T15:58:23")]);

    let model = retort.load(&data, &action).unwrap();
    let timestamp = NaiveDate::from_ymd_opt(2023, 5, 20).unwrap().and_hms_opt(15, 58, 23).unwrap();
    assert_eq!(
        model,
        action.instance([
            ("user_id", Value::Int(23)),
            ("kind", Value::str("click")),
            ("timestamp", Value::NaiveDateTime(timestamp)),
        ])
    );
    assert_eq!(retort.dump(&model, &action).unwrap(), data);
}

#[test]
fn test_discriminated_union_dispatches_by_tag() {
    let created = user_created();
    let changed = user_changed();
    let union = TypeExpr::union(vec![TypeExpr::from(&created), TypeExpr::from(&changed)]);
    let retort = Retort::new();

    let model = retort
        .load(
            &Value::dict([("tag", Value::str("user_created")), ("id", Value::Int(1)), ("name", Value::str("ann"))]),
            union.clone(),
        )
        .unwrap();
    assert_eq!(
        model,
        created.instance([
            ("tag", Value::str("user_created")),
            ("id", Value::Int(1)),
            ("name", Value::str("ann")),
        ])
    );

    let changes = Value::dict([("name", Value::str("bob"))]);
    let model = retort
        .load(
            &Value::dict([("tag", Value::str("user_changed")), ("id", Value::Int(1)), ("changes", changes)]),
            union.clone(),
        )
        .unwrap();
    assert_eq!(model.as_instance().map(|i| i.class().name().to_string()), Some("UserChanged".to_string()));

    let err = retort
        .load(&Value::dict([("tag", Value::str("user_deleted")), ("id", Value::Int(1))]), union)
        .unwrap_err();
    let err = match err {
        Error::Load(err) => err,
        other => panic!("expected load error, got {:?}", other),
    };
    match &err.kind {
        LoadErrorKind::BadVariant { allowed, input_value } => {
            assert_eq!(allowed, &vec![Value::str("user_changed"), Value::str("user_created")]);
            assert_eq!(input_value, &Value::str("user_deleted"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(err.trail.elements(), &[TrailElement::key("tag")]);
}

#[test]
fn test_strict_literal_keeps_int_and_bool_apart() {
    let literal = TypeExpr::literal(vec![Value::Int(0), Value::Int(1)]);
    let retort = Retort::new();

    let err = retort.load(&Value::Bool(false), literal.clone()).unwrap_err();
    assert!(matches!(err, Error::Load(ref e) if matches!(e.kind, LoadErrorKind::BadVariant { .. })));

    assert_eq!(retort.load(&Value::Int(0), literal.clone()).unwrap(), Value::Int(0));

    let lax = retort.strict_coercion(false);
    assert_eq!(lax.load(&Value::Bool(false), literal).unwrap(), Value::Int(0));
}
