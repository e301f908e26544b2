use super::*;
use crate::introspection::{Introspector, RecordIntrospector};
use crate::location::LocStack;
use crate::name_layout::crown::{InpCrown, ListExtraPolicy};
use crate::name_layout::overlay::path;
use crate::name_layout::{ExtraIn, OutExtraMove, PathElem};
use crate::predicate::P;
use crate::provider::{BoundProvider, CannotProvide, Recipe};
use crate::types::{ClassDef, ClassRef, Namespace, RecordField, TypeExpr};
use crate::value::Value;
use std::sync::Arc;

fn book() -> ClassRef {
    ClassDef::record("Book")
        .field("title", TypeExpr::str())
        .field("price", TypeExpr::int())
        .field_def(RecordField::new("author", TypeExpr::str()).default("Unknown"))
        .build()
}

fn recipe_for(class: &ClassRef, settings: Vec<NameMappingProvider>) -> Recipe {
    let mut recipe: Recipe = settings
        .into_iter()
        .map(|provider| Arc::new(BoundProvider::new(class, Arc::new(provider))) as Arc<dyn Provider>)
        .collect();
    recipe.push(Arc::new(BuiltinNameLayoutProvider));
    recipe
}

fn input_layout(class: &ClassRef, recipe: &Recipe) -> ProvideResult<InputNameLayout> {
    let ns = Namespace::new();
    let mediator = Mediator::new(recipe, &ns);
    let shape = RecordIntrospector.input_shape(class).unwrap().unwrap();
    mediator.provide(&InputNameLayoutRequest::new(
        LocStack::from_type(TypeExpr::from(class)),
        shape,
    ))
}

fn output_layout(class: &ClassRef, recipe: &Recipe) -> ProvideResult<OutputNameLayout> {
    let ns = Namespace::new();
    let mediator = Mediator::new(recipe, &ns);
    let shape = RecordIntrospector.output_shape(class).unwrap().unwrap();
    mediator.provide(&OutputNameLayoutRequest::new(
        LocStack::from_type(TypeExpr::from(class)),
        shape,
    ))
}

fn refusal(err: ProvideError) -> CannotProvide {
    match err {
        ProvideError::CannotProvide(cause) => cause,
        ProvideError::Fatal(err) => panic!("unexpected fatal error: {}", err),
    }
}

fn dict_keys(crown: &InpCrown) -> Vec<String> {
    match crown {
        InpCrown::Dict(dict) => dict.map.keys().cloned().collect(),
        other => panic!("expected dict crown, got {:?}", other),
    }
}

#[test]
fn test_default_layout() {
    let book = book();
    let recipe = recipe_for(&book, vec![]);
    let layout = input_layout(&book, &recipe).unwrap();
    assert_eq!(dict_keys(&layout.crown), ["title", "price", "author"]);
    assert!(matches!(&layout.crown, InpCrown::Dict(dict) if dict.extra_policy == DictExtraPolicy::Skip));
    assert_eq!(layout.extra_move, None);

    let layout = output_layout(&book, &recipe).unwrap();
    assert_eq!(layout.crown.field_ids(), ["title", "price", "author"]);
    assert!(matches!(&layout.crown, OutCrown::Dict(dict) if dict.sieves.is_empty()));
}

#[test]
fn test_rename() {
    let event = ClassDef::record("Event")
        .field("name", TypeExpr::str())
        .field("timestamp", TypeExpr::datetime())
        .build();
    let mapping = NameMappingProvider::new().map(NameMapEntry::renames([("timestamp", "ts")]).unwrap());
    let recipe = recipe_for(&event, vec![mapping]);
    let layout = input_layout(&event, &recipe).unwrap();
    assert_eq!(dict_keys(&layout.crown), ["name", "ts"]);
    let layout = output_layout(&event, &recipe).unwrap();
    let OutCrown::Dict(dict) = &layout.crown else {
        panic!("expected dict crown");
    };
    assert_eq!(dict.map.get("ts"), Some(&OutCrown::Field("timestamp".to_string())));
}

#[test]
fn test_as_list() {
    let action = ClassDef::record("Action")
        .field("user_id", TypeExpr::int())
        .field("kind", TypeExpr::str())
        .field("timestamp", TypeExpr::datetime())
        .build();
    let recipe = recipe_for(&action, vec![NameMappingProvider::new().as_list(true)]);
    let layout = input_layout(&action, &recipe).unwrap();
    let InpCrown::List(list) = &layout.crown else {
        panic!("expected list crown");
    };
    assert_eq!(layout.crown.field_ids(), ["user_id", "kind", "timestamp"]);
    assert_eq!(list.extra_policy, ListExtraPolicy::Skip);
    assert!(output_layout(&action, &recipe).unwrap().crown.is_list());
}

#[test]
fn test_optional_field_in_list_is_rejected() {
    let book = book();
    let recipe = recipe_for(&book, vec![NameMappingProvider::new().as_list(true)]);
    let cause = refusal(input_layout(&book, &recipe).unwrap_err());
    let rendered = cause.render().join("\n");
    assert!(rendered.contains("Optional fields cannot be mapped to list elements"), "{}", rendered);
    assert!(rendered.contains("Field \"author\" points to (2)"), "{}", rendered);
}

#[test]
fn test_same_alias_is_rejected() {
    let book = book();
    let mapping = NameMappingProvider::new().map(NameMapEntry::renames([("title", "name"), ("price", "name")]).unwrap());
    let recipe = recipe_for(&book, vec![mapping]);
    let cause = refusal(input_layout(&book, &recipe).unwrap_err());
    assert!(cause
        .render()
        .join("\n")
        .contains("Some fields point to the same path (have same alias)"));
}

#[test]
fn test_prefix_path_is_rejected() {
    let book = book();
    let mapping = NameMappingProvider::new().map(
        NameMapEntry::dict([
            ("title", Some(path(["meta"]))),
            ("price", Some(path(["meta", "price"]))),
        ])
        .unwrap(),
    );
    let recipe = recipe_for(&book, vec![mapping]);
    let cause = refusal(output_layout(&book, &recipe).unwrap_err());
    let rendered = cause.render().join("\n");
    assert!(rendered.contains("must not be a prefix of another path"), "{}", rendered);
}

#[test]
fn test_skipping_required_field_is_rejected() {
    let book = book();
    let recipe = recipe_for(&book, vec![NameMappingProvider::new().skip(P::field("price").build())]);
    let cause = refusal(input_layout(&book, &recipe).unwrap_err());
    assert!(cause.render().join("\n").contains("Required fields [\"price\"] are skipped"));

    let layout = output_layout(&book, &recipe).unwrap();
    assert_eq!(layout.crown.field_ids(), ["title", "author"]);
}

#[test]
fn test_nested_path_and_generated_key() {
    let book = book();
    let mapping = NameMappingProvider::new().map(
        NameMapEntry::dict([("author", Some(vec![PathElem::from("meta"), PathElem::Generated]))]).unwrap(),
    );
    let recipe = recipe_for(&book, vec![mapping]);
    let layout = input_layout(&book, &recipe).unwrap();
    assert_eq!(dict_keys(&layout.crown), ["title", "price", "meta"]);
    let InpCrown::Dict(root) = &layout.crown else {
        panic!("expected dict crown");
    };
    assert_eq!(dict_keys(&root.map["meta"]), ["author"]);
}

#[test]
fn test_name_style_and_trailing_underscore() {
    let user = ClassDef::record("User")
        .field("user_id", TypeExpr::int())
        .field("from_", TypeExpr::str())
        .build();
    let recipe = recipe_for(&user, vec![NameMappingProvider::new().name_style(NameStyle::Camel)]);
    let layout = input_layout(&user, &recipe).unwrap();
    assert_eq!(dict_keys(&layout.crown), ["userId", "from"]);
}

#[test]
fn test_private_fields_are_not_dumped() {
    let cached = ClassDef::record("Cached")
        .field("value", TypeExpr::int())
        .field_def(RecordField::new("_hits", TypeExpr::int()).default(0))
        .build();
    let recipe = recipe_for(&cached, vec![]);
    assert_eq!(input_layout(&cached, &recipe).unwrap().crown.field_ids(), ["value", "_hits"]);
    assert_eq!(output_layout(&cached, &recipe).unwrap().crown.field_ids(), ["value"]);
}

#[test]
fn test_omit_default_sieves() {
    let book = book();
    let recipe = recipe_for(&book, vec![NameMappingProvider::new().omit_default(true)]);
    let layout = output_layout(&book, &recipe).unwrap();
    let OutCrown::Dict(dict) = &layout.crown else {
        panic!("expected dict crown");
    };
    let sieved: Vec<&String> = dict.sieves.keys().collect();
    assert_eq!(sieved, ["author"]);
    assert!(!dict.sieves["author"].keeps(&Value::None, &Value::str("Unknown")));
}

#[test]
fn test_extra_policies() {
    let book = book();
    let recipe = recipe_for(&book, vec![NameMappingProvider::new().extra_in(ExtraIn::Forbid)]);
    let layout = input_layout(&book, &recipe).unwrap();
    assert!(matches!(&layout.crown, InpCrown::Dict(dict) if dict.extra_policy == DictExtraPolicy::Forbid));

    let recipe = recipe_for(&book, vec![NameMappingProvider::new().extra_in(ExtraIn::Kwargs)]);
    let cause = refusal(input_layout(&book, &recipe).unwrap_err());
    assert!(cause.render().join("\n").contains("does not accept extra keyword arguments"));
}

#[test]
fn test_extra_targets_are_not_mapped() {
    let loose = ClassDef::record("Loose")
        .field("name", TypeExpr::str())
        .field_def(RecordField::new("rest", TypeExpr::dict(TypeExpr::str(), TypeExpr::Any)).default_factory(|| Value::Dict(Default::default())))
        .build();
    let mapping = NameMappingProvider::new()
        .extra_in(ExtraIn::field("rest"))
        .extra_out(ExtraOut::field("rest"));
    let recipe = recipe_for(&loose, vec![mapping]);

    let layout = input_layout(&loose, &recipe).unwrap();
    assert_eq!(layout.crown.field_ids(), ["name"]);
    assert!(matches!(&layout.crown, InpCrown::Dict(dict) if dict.extra_policy == DictExtraPolicy::Collect));

    let layout = output_layout(&loose, &recipe).unwrap();
    assert_eq!(layout.extra_move, Some(OutExtraMove::Targets(vec!["rest".to_string()])));
}

#[test]
fn test_collecting_extra_with_list_is_rejected() {
    let point = ClassDef::record("Point")
        .field("x", TypeExpr::int())
        .kwargs(TypeExpr::int())
        .build();
    let mapping = NameMappingProvider::new().as_list(true).extra_in(ExtraIn::Kwargs);
    let recipe = recipe_for(&point, vec![mapping]);
    let cause = refusal(input_layout(&point, &recipe).unwrap_err());
    assert!(cause.render().join("\n").contains("with mapping to list"));
}

#[test]
fn test_settings_stack_in_recipe_order() {
    let book = book();
    let first = NameMappingProvider::new().name_style(NameStyle::Upper);
    let second = NameMappingProvider::new()
        .name_style(NameStyle::Camel)
        .map(NameMapEntry::renames([("title", "name")]).unwrap());
    let recipe = recipe_for(&book, vec![first, second]);
    let layout = input_layout(&book, &recipe).unwrap();
    assert_eq!(dict_keys(&layout.crown), ["name", "PRICE", "AUTHOR"]);
}

#[test]
fn test_unchained_settings_stop_the_stack() {
    let book = book();
    let first = NameMappingProvider::new().name_style(NameStyle::Upper).chain(None);
    let second = NameMappingProvider::new().map(NameMapEntry::renames([("title", "name")]).unwrap());
    let recipe = recipe_for(&book, vec![first, second]);
    let layout = input_layout(&book, &recipe).unwrap();
    assert_eq!(dict_keys(&layout.crown), ["TITLE", "PRICE", "AUTHOR"]);
}

#[test]
fn test_base_class_settings_apply_to_subclasses() {
    let base = ClassDef::record("Base").field("created_at", TypeExpr::int()).build();
    let child = ClassDef::record("Child").base(&base).field("item_name", TypeExpr::str()).build();
    let recipe = recipe_for(&base, vec![NameMappingProvider::new().name_style(NameStyle::Pascal)]);
    let layout = input_layout(&child, &recipe).unwrap();
    assert_eq!(dict_keys(&layout.crown), ["CreatedAt", "ItemName"]);
}

#[test]
fn test_map_function() {
    let book = book();
    let entry = NameMapEntry::Func(
        LocStackChecker::Any,
        crate::name_layout::NameMapFn::new(|_shape, field| {
            (field.id() != "price").then(|| vec![PathElem::Key(field.id().to_uppercase())])
        }),
    );
    let recipe = recipe_for(&book, vec![NameMappingProvider::new().map(entry)]);
    let layout = output_layout(&book, &recipe).unwrap();
    let OutCrown::Dict(dict) = &layout.crown else {
        panic!("expected dict crown");
    };
    let keys: Vec<&String> = dict.map.keys().collect();
    assert_eq!(keys, ["TITLE", "AUTHOR"]);
    assert_eq!(layout.crown.field_ids(), ["title", "author"]);
}
