//! User-level conversion providers

use crate::conversion::{
    Coercer, ConstantLinkingProvider, ConversionError, FunctionLinkingProvider, LinkFunction,
    MatchingCoercerProvider, MatchingLinkingProvider, UnlinkedOptionalPolicyProvider,
};
use crate::location::LocKind;
use crate::predicate::LocStackChecker;
use crate::provider::{BoundProvider, Provider};
use crate::shape::FieldDefault;
use crate::value::Value;
use std::sync::Arc;

/// Coerce values at locations matching `src` into locations matching `dst` with `func`
pub fn coercer(
    src: impl Into<LocStackChecker>,
    dst: impl Into<LocStackChecker>,
    func: impl Fn(&Value) -> Result<Value, ConversionError> + Send + Sync + 'static,
) -> Arc<dyn Provider> {
    Arc::new(MatchingCoercerProvider::new(src, dst, Coercer::unary(func)))
}

/// Feed the destination field matching `dst` from the source matching `src`.
///
/// Without `coercer` the value goes through the coercer the recipe picks
/// for the two field types.
pub fn link(
    src: impl Into<LocStackChecker>,
    dst: impl Into<LocStackChecker>,
    coercer: Option<Coercer>,
) -> Arc<dyn Provider> {
    Arc::new(MatchingLinkingProvider::new(src, dst, coercer))
}

/// Older name of [`link`]
pub fn bind(
    src: impl Into<LocStackChecker>,
    dst: impl Into<LocStackChecker>,
    coercer: Option<Coercer>,
) -> Arc<dyn Provider> {
    link(src, dst, coercer)
}

pub fn link_constant(dst: impl Into<LocStackChecker>, value: impl Into<Value>) -> Arc<dyn Provider> {
    Arc::new(ConstantLinkingProvider::new(dst, FieldDefault::Value(value.into())))
}

/// Like [`link_constant`], calling `factory` on each conversion
pub fn link_constant_factory(
    dst: impl Into<LocStackChecker>,
    factory: impl Fn() -> Value + Send + Sync + 'static,
) -> Arc<dyn Provider> {
    Arc::new(ConstantLinkingProvider::new(dst, FieldDefault::factory(factory)))
}

pub fn link_function(func: LinkFunction, dst: impl Into<LocStackChecker>) -> Arc<dyn Provider> {
    Arc::new(FunctionLinkingProvider::new(func, dst))
}

/// Predicate selecting the converter parameter `name` as a linking source
pub fn from_param(name: impl Into<String>) -> LocStackChecker {
    LocStackChecker::ExactFieldName(name.into())
        & !LocStackChecker::HasFacet(LocKind::OutputField)
        & !LocStackChecker::HasFacet(LocKind::InputField)
}

/// Let optional destination fields matching `pred` stay unlinked
pub fn allow_unlinked_optional(pred: impl Into<LocStackChecker>) -> Arc<dyn Provider> {
    Arc::new(BoundProvider::new(pred, Arc::new(UnlinkedOptionalPolicyProvider::new(true))))
}

pub fn forbid_unlinked_optional(pred: impl Into<LocStackChecker>) -> Arc<dyn Provider> {
    Arc::new(BoundProvider::new(pred, Arc::new(UnlinkedOptionalPolicyProvider::new(false))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::ConverterBuilder;
    use crate::predicate::P;
    use crate::types::{ClassDef, ClassRef, RecordField, TypeExpr};
    use crate::Retort;

    fn book() -> ClassRef {
        ClassDef::record("Book")
            .field("title", TypeExpr::str())
            .field("price", TypeExpr::int())
            .build()
    }

    fn sample() -> Value {
        book().instance([("title", Value::str("F451")), ("price", Value::Int(100))])
    }

    #[test]
    fn test_link_renamed_field() {
        let dst = ClassDef::record("Card").field("name", TypeExpr::str()).build();
        let converter = ConverterBuilder::new(&book(), &dst)
            .recipe([link(P::field("title"), P::field("name"), None)])
            .build(&Retort::new())
            .unwrap();
        assert_eq!(converter.convert(&sample()).unwrap(), dst.instance([("name", Value::str("F451"))]));
    }

    #[test]
    fn test_link_with_coercer() {
        let dst = ClassDef::record("Card").field("cost", TypeExpr::int()).build();
        let double = Coercer::unary(|value| match value {
            Value::Int(i) => Ok(Value::Int(i * 2)),
            other => Err(ConversionError::type_error("int", other)),
        });
        let converter = ConverterBuilder::new(&book(), &dst)
            .recipe([link(P::field("price"), P::field("cost"), Some(double))])
            .build(&Retort::new())
            .unwrap();
        assert_eq!(converter.convert(&sample()).unwrap(), dst.instance([("cost", Value::Int(200))]));
    }

    #[test]
    fn test_link_constant_and_factory() {
        let dst = ClassDef::record("Card")
            .field("title", TypeExpr::str())
            .field("stock", TypeExpr::int())
            .field("tags", TypeExpr::list(TypeExpr::str()))
            .build();
        let converter = ConverterBuilder::new(&book(), &dst)
            .recipe([
                link_constant(P::field("stock"), Value::Int(0)),
                link_constant_factory(P::field("tags"), || Value::list([])),
            ])
            .build(&Retort::new())
            .unwrap();
        assert_eq!(
            converter.convert(&sample()).unwrap(),
            dst.instance([
                ("title", Value::str("F451")),
                ("stock", Value::Int(0)),
                ("tags", Value::list([])),
            ])
        );
    }

    #[test]
    fn test_from_param_feeds_renamed_field() {
        let dst = ClassDef::record("Card")
            .field("title", TypeExpr::str())
            .field("owner", TypeExpr::str())
            .build();
        let converter = ConverterBuilder::new(&book(), &dst)
            .param("user", TypeExpr::str())
            .recipe([link(from_param("user"), P::field("owner"), None)])
            .build(&Retort::new())
            .unwrap();
        let result = converter.call(&sample(), &[Value::str("ann")]).unwrap();
        assert_eq!(
            result,
            dst.instance([("title", Value::str("F451")), ("owner", Value::str("ann"))])
        );
    }

    #[test]
    fn test_allow_unlinked_optional() {
        let dst = ClassDef::record("Card")
            .field("title", TypeExpr::str())
            .field_def(RecordField::new("note", TypeExpr::str()).default(""))
            .build();
        assert!(ConverterBuilder::new(&book(), &dst).build(&Retort::new()).is_err());

        let converter = ConverterBuilder::new(&book(), &dst)
            .recipe([allow_unlinked_optional(P::field("note"))])
            .build(&Retort::new())
            .unwrap();
        assert_eq!(
            converter.convert(&sample()).unwrap(),
            dst.instance([("title", Value::str("F451")), ("note", Value::str(""))])
        );
    }
}
