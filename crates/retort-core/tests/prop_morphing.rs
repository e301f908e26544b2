//! Property-based tests for produced loaders and dumpers


use proptest::prelude::*;
use retort_core::morphing::{LoadErrorKind, TrailElement};
use retort_core::types::TypeExpr;
use retort_core::{Error, Retort, Value};
use test_support::*;

/// Strategy for JSON-like scalars
fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::None),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        "[a-zA-Z0-9 _-]{0,24}".prop_map(Value::str),
    ]
}

/// One level of nesting: a dict key or a list position
#[derive(Debug, Clone)]
enum Step {
    Key(String),
    Index(usize),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        "[a-z]{1,8}".prop_map(Step::Key),
        (0usize..4).prop_map(Step::Index),
    ]
}

/// Nested `dict[str, ...]`/`list[...]` type around `int` with a string at `path`.
/// Every sibling of the path holds a valid value.
fn nested_with_bad_leaf(path: &[Step]) -> (TypeExpr, Value) {
    let mut ty = TypeExpr::int();
    let mut valid = Value::Int(0);
    let mut data = Value::str("not an int");
    for step in path.iter().rev() {
        match step {
            Step::Key(key) => {
                ty = TypeExpr::dict(TypeExpr::str(), ty);
                data = Value::dict([(key.clone(), data), ("0".to_string(), valid.clone())]);
                valid = Value::dict([("0", valid)]);
            }
            Step::Index(index) => {
                ty = TypeExpr::list(ty);
                let mut items = vec![valid.clone(); index + 1];
                items[*index] = data;
                data = Value::list(items);
                valid = Value::list([valid]);
            }
        }
    }
    (ty, data)
}

proptest! {
    #[test]
    fn book_round_trips(title in "[a-zA-Z0-9 .,!?]{0,64}", price in any::<i64>(), author in proptest::option::of("[a-zA-Z ]{1,32}")) {
        let book = book();
        let retort = Retort::new();
        let mut entries = vec![("title", Value::str(title.as_str())), ("price", Value::Int(price))];
        if let Some(author) = &author {
            entries.push(("author", Value::str(author.as_str())));
        }
        let data = Value::dict(entries.clone());

        let dumped = retort.dump(&retort.load(&data, &book).unwrap(), &book).unwrap();
        if author.is_none() {
            entries.push(("author", Value::str("Unknown")));
        }
        prop_assert_eq!(dumped, Value::dict(entries));
    }

    #[test]
    fn int_list_round_trips(items in proptest::collection::vec(any::<i64>(), 0..32)) {
        let retort = Retort::new();
        let ty = TypeExpr::list(TypeExpr::int());
        let data = Value::list(items.into_iter().map(Value::Int));
        let loaded = retort.load(&data, ty.clone()).unwrap();
        prop_assert_eq!(retort.dump(&loaded, ty).unwrap(), data);
    }

    #[test]
    fn strict_list_rejects_any_string(text in ".{0,32}") {
        let retort = Retort::new();
        let err = retort.load(&Value::str(text), TypeExpr::list(TypeExpr::str())).unwrap_err();
        prop_assert!(
            matches!(err, Error::Load(ref e) if matches!(e.kind, LoadErrorKind::ExcludedType { .. })),
            "expected ExcludedType, got {:?}",
            err
        );
    }

    #[test]
    fn any_passes_scalars_through(value in scalar_strategy()) {
        let retort = Retort::new();
        prop_assert_eq!(retort.load(&value, TypeExpr::Any).unwrap(), value.clone());
        prop_assert_eq!(retort.dump(&value, TypeExpr::Any).unwrap(), value);
    }

    #[test]
    fn nested_error_trail_follows_path(path in proptest::collection::vec(step_strategy(), 1..6)) {
        let (ty, data) = nested_with_bad_leaf(&path);
        let err = match Retort::new().load(&data, ty) {
            Err(Error::Load(err)) => err,
            other => panic!("expected load error, got {:?}", other),
        };
        let expected: Vec<TrailElement> = path
            .iter()
            .map(|step| match step {
                Step::Key(key) => TrailElement::key(key.as_str()),
                Step::Index(index) => TrailElement::Index(*index),
            })
            .collect();

        let leaves = err.flatten();
        prop_assert_eq!(leaves.len(), 1);
        prop_assert_eq!(leaves[0].trail.elements(), expected.as_slice());
        prop_assert!(
            matches!(leaves[0].kind, LoadErrorKind::Type { .. }),
            "expected a type error, got {:?}",
            leaves[0].kind
        );
    }
}
