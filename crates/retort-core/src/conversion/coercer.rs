//! Built-in coercer providers
//!
//! Trivial coercions (same type, `Any` destination, subclass, union
//! subcase) pass the value through unchanged. Containers get element-wise
//! coercers built from the coercers of their arguments.

use crate::conversion::{Coercer, CoercerRequest, ConversionError};
use crate::location::Loc;
use crate::morphing::TrailElement;
use crate::predicate::LocStackChecker;
use crate::provider::{CannotProvide, Mediator, ProvideError, ProvideResult, Provider};
use crate::types::{NormType, Origin, TypeExpr};
use crate::value::Value;

fn norm_pair(mediator: &Mediator<'_>, request: &CoercerRequest) -> ProvideResult<(NormType, NormType)> {
    Ok((
        mediator.normalize(request.src.last_type())?,
        mediator.normalize(request.dst.last_type())?,
    ))
}

#[derive(Debug, Clone, Default)]
pub struct SameTypeCoercerProvider;

impl Provider for SameTypeCoercerProvider {
    fn provide_coercer(&self, mediator: &Mediator<'_>, request: &CoercerRequest) -> ProvideResult<Coercer> {
        let (src, dst) = norm_pair(mediator, request)?;
        if src == dst {
            Ok(Coercer::as_is())
        } else {
            Err(ProvideError::skip())
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DstAnyCoercerProvider;

impl Provider for DstAnyCoercerProvider {
    fn provide_coercer(&self, mediator: &Mediator<'_>, request: &CoercerRequest) -> ProvideResult<Coercer> {
        if mediator.normalize(request.dst.last_type())?.origin() == &Origin::Any {
            Ok(Coercer::as_is())
        } else {
            Err(ProvideError::skip())
        }
    }
}

/// Instances of a subclass are valid instances of the base class
#[derive(Debug, Clone, Default)]
pub struct SubclassCoercerProvider;

impl Provider for SubclassCoercerProvider {
    fn provide_coercer(&self, mediator: &Mediator<'_>, request: &CoercerRequest) -> ProvideResult<Coercer> {
        let (src, dst) = norm_pair(mediator, request)?;
        match (src.class(), dst.class()) {
            (Some(src_class), Some(dst_class))
                if src.args().is_empty() && dst.args().is_empty() && src_class.is_subclass_of(dst_class) =>
            {
                Ok(Coercer::as_is())
            }
            _ => Err(ProvideError::skip()),
        }
    }
}

/// User coercer applied when both sides match their predicates
#[derive(Debug, Clone)]
pub struct MatchingCoercerProvider {
    src: LocStackChecker,
    dst: LocStackChecker,
    coercer: Coercer,
}

impl MatchingCoercerProvider {
    pub fn new(src: impl Into<LocStackChecker>, dst: impl Into<LocStackChecker>, coercer: Coercer) -> Self {
        MatchingCoercerProvider {
            src: src.into(),
            dst: dst.into(),
            coercer,
        }
    }
}

impl Provider for MatchingCoercerProvider {
    fn provide_coercer(&self, mediator: &Mediator<'_>, request: &CoercerRequest) -> ProvideResult<Coercer> {
        if mediator.check(&self.src, &request.src)? && mediator.check(&self.dst, &request.dst)? {
            Ok(self.coercer.clone())
        } else {
            Err(ProvideError::skip())
        }
    }
}

/// A union destination accepts every source whose members it contains
#[derive(Debug, Clone, Default)]
pub struct UnionSubcaseCoercerProvider;

impl Provider for UnionSubcaseCoercerProvider {
    fn provide_coercer(&self, mediator: &Mediator<'_>, request: &CoercerRequest) -> ProvideResult<Coercer> {
        let (src, dst) = norm_pair(mediator, request)?;
        if dst.origin() != &Origin::Union {
            return Err(ProvideError::skip());
        }
        let dst_members: Vec<&NormType> = dst.type_args().collect();
        let covered = if src.origin() == &Origin::Union {
            src.type_args().all(|member| dst_members.contains(&member))
        } else {
            dst_members.iter().any(|member| member.origin() == src.origin())
        };
        if covered {
            Ok(Coercer::as_is())
        } else {
            Err(ProvideError::skip())
        }
    }
}

/// `Optional[A]` to `Optional[B]` through the coercer from `A` to `B`
#[derive(Debug, Clone, Default)]
pub struct OptionalCoercerProvider;

impl Provider for OptionalCoercerProvider {
    fn provide_coercer(&self, mediator: &Mediator<'_>, request: &CoercerRequest) -> ProvideResult<Coercer> {
        let (src, dst) = norm_pair(mediator, request)?;
        let (Some(src_inner), Some(dst_inner)) = (src.optional_inner(), dst.optional_inner()) else {
            return Err(ProvideError::skip());
        };
        let inner = mediator.mandatory_provide(
            &request.append_loc(
                Loc::generic_param(src_inner.source().clone(), 0),
                Loc::generic_param(dst_inner.source().clone(), 0),
            ),
            |_| "Cannot create coercer for optionals. Coercer for wrapped value cannot be created".to_string(),
        )?;
        Ok(Coercer::new(move |value, ctx| match value {
            Value::None => Ok(Value::None),
            other => inner.call(other, ctx),
        }))
    }
}

fn strip_tags(ty: &TypeExpr) -> &TypeExpr {
    match ty {
        TypeExpr::Annotated(inner, _) | TypeExpr::Tagged(_, inner) => strip_tags(inner),
        other => other,
    }
}

/// Looks through `Annotated` and qualifier tags on either side
#[derive(Debug, Clone, Default)]
pub struct TypeTagsUnwrappingProvider;

impl Provider for TypeTagsUnwrappingProvider {
    fn provide_coercer(&self, mediator: &Mediator<'_>, request: &CoercerRequest) -> ProvideResult<Coercer> {
        let src = request.src.last_type();
        let dst = request.dst.last_type();
        let (bare_src, bare_dst) = (strip_tags(src), strip_tags(dst));
        if bare_src == src && bare_dst == dst {
            return Err(ProvideError::skip());
        }
        mediator.delegating_provide(&request.with_last_types(bare_src.clone(), bare_dst.clone()))
    }
}

fn collection_item(norm: &NormType) -> ProvideResult<TypeExpr> {
    match norm.origin() {
        Origin::Tuple => Err(CannotProvide::new("Constant-length tuple is not supported yet").into()),
        origin if origin.is_iterable() => Ok(norm.type_arg(0).map_or(TypeExpr::Any, |arg| arg.source().clone())),
        _ => Err(ProvideError::skip()),
    }
}

fn build_collection(origin: &Origin, items: Vec<Value>) -> Value {
    match origin {
        Origin::Set | Origin::FrozenSet => Value::Set(items.into_iter().collect()),
        Origin::Sequence | Origin::VarTuple => Value::Tuple(items),
        _ => Value::List(items),
    }
}

/// Collection to collection, element by element
#[derive(Debug, Clone, Default)]
pub struct IterableCoercerProvider;

impl Provider for IterableCoercerProvider {
    fn provide_coercer(&self, mediator: &Mediator<'_>, request: &CoercerRequest) -> ProvideResult<Coercer> {
        let (src, dst) = norm_pair(mediator, request)?;
        let src_item = collection_item(&src)?;
        let dst_item = collection_item(&dst)?;
        let element = mediator.mandatory_provide(
            &request.append_loc(Loc::generic_param(src_item, 0), Loc::generic_param(dst_item, 0)),
            |_| "Cannot create coercer for iterables. Coercer for element cannot be created".to_string(),
        )?;
        let origin = dst.origin().clone();
        let expected = src.to_string();
        Ok(Coercer::new(move |value, ctx| {
            let items: Vec<&Value> = match value {
                Value::List(items) | Value::Tuple(items) => items.iter().collect(),
                Value::Set(items) => items.iter().collect(),
                other => return Err(ConversionError::type_error(&expected, other.type_name())),
            };
            let coerced = items
                .into_iter()
                .enumerate()
                .map(|(index, item)| element.call(item, ctx).map_err(|e| e.at(TrailElement::Index(index))))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(build_collection(&origin, coerced))
        }))
    }
}

fn mapping_args(norm: &NormType) -> ProvideResult<(TypeExpr, TypeExpr)> {
    if !matches!(norm.origin(), Origin::Dict | Origin::Mapping) {
        return Err(ProvideError::skip());
    }
    let arg = |pos: usize| norm.type_arg(pos).map_or(TypeExpr::Any, |arg| arg.source().clone());
    Ok((arg(0), arg(1)))
}

/// Mapping to mapping, keys and values coerced separately
#[derive(Debug, Clone, Default)]
pub struct DictCoercerProvider;

impl Provider for DictCoercerProvider {
    fn provide_coercer(&self, mediator: &Mediator<'_>, request: &CoercerRequest) -> ProvideResult<Coercer> {
        let (src, dst) = norm_pair(mediator, request)?;
        let (src_key, src_value) = mapping_args(&src)?;
        let (dst_key, dst_value) = mapping_args(&dst)?;
        let key_coercer = mediator.mandatory_provide(
            &request.append_loc(Loc::generic_param(src_key, 0), Loc::generic_param(dst_key, 0)),
            |_| "Cannot create coercer for dicts. Coercer for key cannot be created".to_string(),
        )?;
        let value_coercer = mediator.mandatory_provide(
            &request.append_loc(Loc::generic_param(src_value, 1), Loc::generic_param(dst_value, 1)),
            |_| "Cannot create coercer for dicts. Coercer for value cannot be created".to_string(),
        )?;
        let expected = src.to_string();
        Ok(Coercer::new(move |value, ctx| {
            let Value::Dict(entries) = value else {
                return Err(ConversionError::type_error(&expected, value.type_name()));
            };
            entries
                .iter()
                .map(|(key, item)| {
                    let trail = TrailElement::Key(key.clone());
                    Ok((
                        key_coercer.call(key, ctx).map_err(|e| e.at(trail.clone()))?,
                        value_coercer.call(item, ctx).map_err(|e| e.at(trail))?,
                    ))
                })
                .collect::<Result<_, ConversionError>>()
                .map(Value::Dict)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::ConversionContext;
    use crate::location::LocStack;
    use crate::provider::Recipe;
    use crate::types::{ClassDef, Namespace};
    use std::sync::Arc;

    fn recipe() -> Recipe {
        vec![
            Arc::new(IterableCoercerProvider),
            Arc::new(DictCoercerProvider),
            Arc::new(OptionalCoercerProvider),
            Arc::new(TypeTagsUnwrappingProvider),
            Arc::new(SameTypeCoercerProvider),
            Arc::new(DstAnyCoercerProvider),
            Arc::new(UnionSubcaseCoercerProvider),
            Arc::new(SubclassCoercerProvider),
        ]
    }

    fn coercer(recipe: &Recipe, src: TypeExpr, dst: TypeExpr) -> ProvideResult<Coercer> {
        let ns = Namespace::new();
        let mediator = Mediator::new(recipe, &ns);
        mediator.provide(&CoercerRequest::new(
            LocStack::from_type(src),
            ConversionContext::default(),
            LocStack::from_type(dst),
        ))
    }

    #[test]
    fn test_trivial_coercions() {
        let recipe = recipe();
        assert!(coercer(&recipe, TypeExpr::int(), TypeExpr::int()).is_ok());
        assert!(coercer(&recipe, TypeExpr::int(), TypeExpr::Any).is_ok());
        assert!(coercer(&recipe, TypeExpr::int(), TypeExpr::optional(TypeExpr::int())).is_ok());
        assert!(coercer(
            &recipe,
            TypeExpr::annotated(TypeExpr::str(), vec![Value::str("meta")]),
            TypeExpr::str()
        )
        .is_ok());
        assert!(coercer(&recipe, TypeExpr::int(), TypeExpr::str()).is_err());
    }

    #[test]
    fn test_subclass() {
        let base = ClassDef::record("Base").build();
        let child = ClassDef::record("Child").base(&base).build();
        let recipe = recipe();
        assert!(coercer(&recipe, TypeExpr::from(&child), TypeExpr::from(&base)).is_ok());
        assert!(coercer(&recipe, TypeExpr::from(&base), TypeExpr::from(&child)).is_err());
    }

    #[test]
    fn test_iterable_with_user_element_coercer() {
        let mut recipe: Recipe = vec![Arc::new(MatchingCoercerProvider::new(
            crate::types::Prim::Int,
            crate::types::Prim::Str,
            Coercer::unary(|value| match value {
                Value::Int(i) => Ok(Value::Str(i.to_string())),
                other => Err(ConversionError::type_error("int", other.type_name())),
            }),
        ))];
        recipe.extend(self::recipe());

        let to_set = coercer(&recipe, TypeExpr::list(TypeExpr::int()), TypeExpr::set(TypeExpr::str())).unwrap();
        let result = to_set.call(&Value::List(vec![Value::Int(1), Value::Int(2)]), &[]).unwrap();
        assert_eq!(result, Value::Set([Value::str("1"), Value::str("2")].into_iter().collect()));

        let dict = coercer(
            &recipe,
            TypeExpr::dict(TypeExpr::str(), TypeExpr::int()),
            TypeExpr::dict(TypeExpr::str(), TypeExpr::str()),
        )
        .unwrap();
        let result = dict.call(&Value::dict([("a", Value::Int(1))]), &[]).unwrap();
        assert_eq!(result, Value::dict([("a", Value::str("1"))]));
    }

    #[test]
    fn test_optional_keeps_none() {
        let recipe = recipe();
        let optional = coercer(
            &recipe,
            TypeExpr::optional(TypeExpr::list(TypeExpr::int())),
            TypeExpr::optional(TypeExpr::var_tuple(TypeExpr::int())),
        )
        .unwrap();
        assert_eq!(optional.call(&Value::None, &[]).unwrap(), Value::None);
        assert_eq!(
            optional.call(&Value::List(vec![Value::Int(1)]), &[]).unwrap(),
            Value::Tuple(vec![Value::Int(1)])
        );
    }

    #[test]
    fn test_fixed_tuple_is_reported() {
        let err = coercer(
            &recipe(),
            TypeExpr::tuple(vec![TypeExpr::int()]),
            TypeExpr::list(TypeExpr::int()),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Constant-length tuple"));
    }
}
