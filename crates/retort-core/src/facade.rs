//! Recipe entries for shapes, name layouts and nested providers
//!
//! The morphing and conversion entries live in their modules and are
//! re-exported at the crate root next to these.

use crate::name_layout::NameMappingProvider;
use crate::predicate::LocStackChecker;
use crate::provider::{BoundProvider, Provider};
use crate::shape::{ConstructorProvider, PropertyProvider};
use std::sync::Arc;

/// Restrict `provider` to the locations matching `pred`
pub fn bound(pred: impl Into<LocStackChecker>, provider: Arc<dyn Provider>) -> Arc<dyn Provider> {
    Arc::new(BoundProvider::new(pred, provider))
}

/// Name layout settings for the models matching `pred`
pub fn name_mapping(pred: impl Into<LocStackChecker>, mapping: NameMappingProvider) -> Arc<dyn Provider> {
    bound(pred, Arc::new(mapping))
}

/// Build the models matching `pred` through an explicit signature
pub fn constructor(pred: impl Into<LocStackChecker>, constructor: ConstructorProvider) -> Arc<dyn Provider> {
    bound(pred, Arc::new(constructor))
}

/// Dump an extra computed field for the models matching `pred`
pub fn with_property(pred: impl Into<LocStackChecker>, property: PropertyProvider) -> Arc<dyn Provider> {
    bound(pred, Arc::new(property))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morphing::LoadError;
    use crate::name_layout::{NameMapEntry, NameStyle};
    use crate::shape::{AccessFailure, CallArgs, Constructor, Getter, InputField, ParamKind};
    use crate::types::{ClassDef, ClassRef, TypeExpr};
    use crate::value::Value;
    use crate::Retort;

    fn event() -> ClassRef {
        ClassDef::record("Event")
            .field("event_id", TypeExpr::int())
            .field("kind", TypeExpr::str())
            .build()
    }

    #[test]
    fn test_name_mapping_is_bound_to_model() {
        let class = event();
        let retort = Retort::with_recipe([name_mapping(
            &class,
            NameMappingProvider::new()
                .name_style(NameStyle::Camel)
                .map(NameMapEntry::renames([("kind", "type")]).unwrap()),
        )]);
        let value = class.instance([("event_id", Value::Int(1)), ("kind", Value::str("click"))]);
        assert_eq!(
            retort.dump(&value, &class).unwrap(),
            Value::dict([("eventId", Value::Int(1)), ("type", Value::str("click"))])
        );
    }

    #[test]
    fn test_with_property_is_dumped() {
        let class = event();
        let getter = Getter::new(|model| {
            model
                .get_attr("kind")
                .and_then(Value::as_str)
                .map(|kind| Value::Bool(kind == "click"))
                .ok_or(AccessFailure::Custom("no kind".to_string()))
        });
        let retort = Retort::with_recipe([with_property(
            &class,
            PropertyProvider::new("is_click", TypeExpr::bool(), getter),
        )]);
        let value = class.instance([("event_id", Value::Int(1)), ("kind", Value::str("click"))]);
        assert_eq!(
            retort.dump(&value, &class).unwrap(),
            Value::dict([
                ("event_id", Value::Int(1)),
                ("kind", Value::str("click")),
                ("is_click", Value::Bool(true)),
            ])
        );
    }

    #[test]
    fn test_constructor_replaces_signature() {
        let class = event();
        let built = class.clone();
        let make = Constructor::new(move |args: CallArgs| {
            let id = args.keyword.get("id").cloned().ok_or_else(|| LoadError::msg("id is missing"))?;
            Ok(built.instance([("event_id", id), ("kind", Value::str("generated"))]))
        });
        let retort = Retort::with_recipe([constructor(
            &class,
            ConstructorProvider::new(make).param(InputField::new("id", TypeExpr::int()), ParamKind::KwOnly),
        )]);
        let loaded = retort.load(&Value::dict([("id", Value::Int(5))]), &class).unwrap();
        assert_eq!(
            loaded,
            class.instance([("event_id", Value::Int(5)), ("kind", Value::str("generated"))])
        );
    }
}
