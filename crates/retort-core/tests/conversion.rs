//! Model-to-model conversion through a retort


use retort_core::predicate::P;
use retort_core::types::{ClassDef, ClassRef, RecordField, TypeExpr};
use retort_core::{coercer, link, ConverterBuilder, Error, Retort, Value};
use test_support::*;

fn person_dto() -> ClassRef {
    ClassDef::record("PersonDTO").field("name", TypeExpr::str()).build()
}

#[test]
fn test_nested_models_and_lists_are_coerced() {
    let person = person();
    let source = ClassDef::record("Library")
        .field("name", TypeExpr::str())
        .field("members", TypeExpr::list(TypeExpr::from(&person)))
        .build();
    let dto = person_dto();
    let target = ClassDef::record("LibraryDTO")
        .field("name", TypeExpr::str())
        .field("members", TypeExpr::list(TypeExpr::from(&dto)))
        .build();

    let library = source.instance([
        ("name", Value::str("City")),
        (
            "members",
            Value::list([
                person.instance([("name", Value::str("Ann"))]),
                person.instance([("name", Value::str("Bob"))]),
            ]),
        ),
    ]);
    let converted = Retort::new().convert(&library, &source, &target).unwrap();
    assert_eq!(
        converted,
        target.instance([
            ("name", Value::str("City")),
            (
                "members",
                Value::list([
                    dto.instance([("name", Value::str("Ann"))]),
                    dto.instance([("name", Value::str("Bob"))]),
                ]),
            ),
        ])
    );
}

#[test]
fn test_converter_is_cached_per_type_pair() {
    let book = book();
    let target = ClassDef::record("Card").field("title", TypeExpr::str()).build();
    let retort = Retort::new();
    let first = retort.get_converter(&book, &target).unwrap();
    let second = retort.get_converter(&book, &target).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_user_coercer_and_link() {
    let book = book();
    let target = ClassDef::record("Listing")
        .field("headline", TypeExpr::str())
        .field("price", TypeExpr::str())
        .build();
    let retort = Retort::new().extend([
        link(P::field("title"), P::field("headline"), None),
        coercer(TypeExpr::int(), TypeExpr::str(), |value| {
            Ok(Value::str(value.as_int().map(|i| i.to_string()).unwrap_or_default()))
        }),
    ]);
    let value = book.instance([
        ("title", Value::str("F451")),
        ("price", Value::Int(100)),
        ("author", Value::str("Ray")),
    ]);
    assert_eq!(
        retort.convert(&value, &book, &target).unwrap(),
        target.instance([("headline", Value::str("F451")), ("price", Value::str("100"))])
    );
}

#[test]
fn test_unlinked_required_field_is_a_build_error() {
    let book = book();
    let target = ClassDef::record("Card")
        .field("title", TypeExpr::str())
        .field("isbn", TypeExpr::str())
        .build();
    let err = ConverterBuilder::new(&book, &target).build(&Retort::new()).unwrap_err();
    assert!(matches!(err, Error::ProviderNotFound { .. }), "{:?}", err);
    assert!(err.to_string().contains("isbn"), "{}", err);
}

#[test]
fn test_optional_destination_accepts_present_value() {
    let book = book();
    let target = ClassDef::record("Card")
        .field("title", TypeExpr::str())
        .field_def(RecordField::new("author", TypeExpr::optional(TypeExpr::str())).default(Value::None))
        .build();
    let value = book.instance([
        ("title", Value::str("F451")),
        ("price", Value::Int(100)),
        ("author", Value::str("Ray")),
    ]);
    assert_eq!(
        Retort::new().convert(&value, &book, &target).unwrap(),
        target.instance([("title", Value::str("F451")), ("author", Value::str("Ray"))])
    );
}
