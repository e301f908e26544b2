//! `Literal[...]`
//!
//! Plain literal values are compared with the input directly: exact
//! (type-aware) equality under strict coercion, numeric equality otherwise.
//! Enum members inside a literal go through the loader and dumper of their
//! enum class, so `enum_by_name` and friends apply to them as well.

use crate::morphing::{sub_dumper, sub_loader, DumpError, Dumper, DumperRequest, LoadError, LoadErrorKind, Loader, LoaderRequest};
use crate::provider::{Mediator, ProvideError, ProvideResult, Provider};
use crate::types::{ClassRef, Origin, TypeExpr};
use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct LiteralProvider;

fn literal_values(mediator: &Mediator<'_>, ty: &TypeExpr) -> ProvideResult<Vec<Value>> {
    let norm = mediator.normalize(ty)?;
    if norm.origin() != &Origin::Literal {
        return Err(ProvideError::skip());
    }
    Ok(norm.literal_values().into_iter().cloned().collect())
}

/// Enum classes of the members appearing among `values`, in order
fn enum_classes(values: &[Value]) -> Vec<ClassRef> {
    let mut classes: Vec<ClassRef> = Vec::new();
    for value in values {
        if let Value::Enum(member) = value {
            if !classes.contains(&member.class) {
                classes.push(member.class.clone());
            }
        }
    }
    classes
}

impl Provider for LiteralProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        let allowed = literal_values(mediator, request.last_type())?;
        let enum_loaders = enum_classes(&allowed)
            .into_iter()
            .map(|class| sub_loader(mediator, request, TypeExpr::Class(class)))
            .collect::<ProvideResult<Vec<Loader>>>()?;
        let plain: Vec<Value> = allowed.iter().filter(|v| !matches!(v, Value::Enum(_))).cloned().collect();
        let strict = request.strict_coercion;

        Ok(Loader::new(move |data| {
            let found = if strict {
                plain.iter().find(|v| *v == data)
            } else {
                plain.iter().find(|v| v.loose_eq(data))
            };
            if let Some(value) = found {
                return Ok(value.clone());
            }
            for loader in &enum_loaders {
                if let Ok(member) = loader.call(data) {
                    if allowed.contains(&member) {
                        return Ok(member);
                    }
                }
            }
            Err(LoadError::new(LoadErrorKind::BadVariant {
                allowed: allowed.iter().map(literal_wire_value).collect(),
                input_value: data.clone(),
            }))
        }))
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        let allowed = literal_values(mediator, request.last_type())?;
        let enum_dumpers = enum_classes(&allowed)
            .into_iter()
            .map(|class| Ok((class.clone(), sub_dumper(mediator, request, TypeExpr::Class(class))?)))
            .collect::<ProvideResult<Vec<(ClassRef, Dumper)>>>()?;

        Ok(Dumper::new(move |value| match value {
            Value::Enum(member) => match enum_dumpers.iter().find(|(class, _)| *class == member.class) {
                Some((_, dumper)) => dumper.call(value),
                None => Err(DumpError::type_error("literal value", value.type_name())),
            },
            other => Ok(other.clone()),
        }))
    }
}

fn literal_wire_value(value: &Value) -> Value {
    match value {
        Value::Enum(member) => member.value.as_ref().clone(),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::LocStack;
    use crate::morphing::{DebugTrail, EnumExactValueProvider};
    use crate::provider::Recipe;
    use crate::types::{ClassDef, Namespace};
    use std::sync::Arc;

    fn loader(ty: TypeExpr, strict: bool) -> Loader {
        let recipe: Recipe = vec![Arc::new(LiteralProvider), Arc::new(EnumExactValueProvider)];
        let ns = Namespace::new();
        let mediator = Mediator::new(&recipe, &ns);
        mediator
            .provide(&LoaderRequest::new(LocStack::from_type(ty), strict, DebugTrail::All))
            .unwrap()
    }

    #[test]
    fn test_strict_literal_is_type_exact() {
        let loader = loader(TypeExpr::literal(vec![Value::Int(0), Value::Int(1)]), true);
        assert_eq!(loader.call(&Value::Int(0)).unwrap(), Value::Int(0));
        let err = loader.call(&Value::Bool(false)).unwrap_err();
        match err.kind {
            LoadErrorKind::BadVariant { allowed, input_value } => {
                assert_eq!(allowed, vec![Value::Int(0), Value::Int(1)]);
                assert_eq!(input_value, Value::Bool(false));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_lax_literal_returns_canonical_value() {
        let loader = loader(TypeExpr::literal(vec![Value::Int(0), Value::Int(1)]), false);
        assert_eq!(loader.call(&Value::Bool(true)).unwrap(), Value::Int(1));
        assert!(loader.call(&Value::Int(2)).is_err());
    }

    #[test]
    fn test_enum_member_in_literal() {
        let color = ClassDef::enumeration("Color").member("RED", "red").member("BLUE", "blue").build();
        let red = color.member("RED").unwrap();
        let ty = TypeExpr::literal(vec![red.clone(), Value::str("none")]);
        let loader = loader(ty.clone(), true);
        assert_eq!(loader.call(&Value::str("red")).unwrap(), red);
        assert_eq!(loader.call(&Value::str("none")).unwrap(), Value::str("none"));
        assert!(loader.call(&Value::str("blue")).is_err());

        let recipe: Recipe = vec![Arc::new(LiteralProvider), Arc::new(EnumExactValueProvider)];
        let ns = Namespace::new();
        let mediator = Mediator::new(&recipe, &ns);
        let dumper = mediator
            .provide(&DumperRequest::new(LocStack::from_type(ty), DebugTrail::All))
            .unwrap();
        assert_eq!(dumper.call(&red).unwrap(), Value::str("red"));
    }
}
