//! `Union[...]` and `Optional[...]`
//!
//! Members are tried in normalised order and the first loader that accepts
//! the data wins. When every member is a model whose input crown shares a
//! top-level key typed as a `Literal`, the loader dispatches on that key
//! directly. Dumpers pick the first member whose type matches the value.

use crate::location::Loc;
use crate::morphing::{DumpError, Dumper, DumperRequest, LoadError, LoadErrorKind, Loader, LoaderRequest, TrailElement};
use crate::name_layout::{InpCrown, InputNameLayoutRequest};
use crate::provider::{Mediator, ProvideError, ProvideResult, Provider};
use crate::shape::InputShapeRequest;
use crate::types::{NormType, Origin, Prim, TypeExpr};
use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct UnionProvider;

fn union_members(mediator: &Mediator<'_>, ty: &TypeExpr) -> ProvideResult<NormType> {
    let norm = mediator.normalize(ty)?;
    if norm.origin() != &Origin::Union {
        return Err(ProvideError::skip());
    }
    Ok(norm)
}

/// Wire key and per-member tag values of a discriminated union
struct Discriminator {
    key: String,
    tags: Vec<(Value, usize)>,
}

impl Discriminator {
    fn find(mediator: &Mediator<'_>, request: &LoaderRequest, members: &[NormType]) -> ProvideResult<Option<Self>> {
        if members.iter().any(|m| m.class().is_none()) {
            return Ok(None);
        }
        let mut per_member = Vec::with_capacity(members.len());
        for (pos, member) in members.iter().enumerate() {
            let loc_stack = request.append_loc(Loc::generic_param(member.source().clone(), pos)).loc_stack;
            let shape = match mediator.provide(&InputShapeRequest::new(loc_stack.clone())) {
                Ok(shape) => shape,
                Err(ProvideError::CannotProvide(_)) => return Ok(None),
                Err(fatal) => return Err(fatal),
            };
            let layout = match mediator.provide(&InputNameLayoutRequest::new(loc_stack, shape.clone())) {
                Ok(layout) => layout,
                Err(ProvideError::CannotProvide(_)) => return Ok(None),
                Err(fatal) => return Err(fatal),
            };
            let InpCrown::Dict(crown) = layout.crown else {
                return Ok(None);
            };
            let mut literal_keys = Vec::new();
            for (key, sub) in &crown.map {
                let InpCrown::Field(id) = sub else { continue };
                let Some(field) = shape.field(id) else { continue };
                let norm = mediator.normalize(&field.ty)?;
                if norm.origin() == &Origin::Literal {
                    let values: Vec<Value> = norm.literal_values().into_iter().map(wire_tag).collect();
                    literal_keys.push((key.clone(), values));
                }
            }
            per_member.push(literal_keys);
        }

        let Some(first) = per_member.first() else {
            return Ok(None);
        };
        'keys: for (key, _) in first {
            let mut tags: Vec<(Value, usize)> = Vec::new();
            for (index, keys) in per_member.iter().enumerate() {
                let Some((_, values)) = keys.iter().find(|(k, _)| k == key) else {
                    continue 'keys;
                };
                for value in values {
                    if tags.iter().any(|(tag, _)| tag == value) {
                        continue 'keys;
                    }
                    tags.push((value.clone(), index));
                }
            }
            return Ok(Some(Discriminator { key: key.clone(), tags }));
        }
        Ok(None)
    }
}

fn wire_tag(value: &Value) -> Value {
    match value {
        Value::Enum(member) => member.value.as_ref().clone(),
        other => other.clone(),
    }
}

impl Provider for UnionProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        let norm = union_members(mediator, request.last_type())?;
        let members: Vec<NormType> = norm.type_args().cloned().collect();

        if let Some(inner) = norm.optional_inner() {
            let pos = members.iter().position(|m| m == inner).unwrap_or(0);
            let inner_loader =
                mediator.mandatory_provide(&request.append_loc(Loc::generic_param(inner.source().clone(), pos)), |_| {
                    format!("Cannot create loader for {}", norm)
                })?;
            return Ok(Loader::new(move |data| match data {
                Value::None => Ok(Value::None),
                other => inner_loader.call(other),
            }));
        }

        let loaders = mediator.mandatory_provide_all(
            members
                .iter()
                .enumerate()
                .map(|(pos, member)| request.append_loc(Loc::generic_param(member.source().clone(), pos))),
            || "Cannot create loader for union. Loaders for some union cases cannot be created".to_string(),
        )?;
        let expected = norm.to_string();

        if let Some(discriminator) = Discriminator::find(mediator, request, &members)? {
            log::debug!("union {} is discriminated by {:?}", expected, discriminator.key);
            let strict = request.strict_coercion;
            return Ok(Loader::new(move |data| {
                let Value::Dict(map) = data else {
                    return Err(LoadError::type_error(&expected, data));
                };
                let Some(tag) = map.get(&Value::str(discriminator.key.as_str())) else {
                    return Err(LoadError::new(LoadErrorKind::NoRequiredFields {
                        fields: vec![discriminator.key.clone()],
                        input_value: data.clone(),
                    }));
                };
                let found = discriminator
                    .tags
                    .iter()
                    .find(|(allowed, _)| if strict { allowed == tag } else { allowed.loose_eq(tag) });
                match found {
                    Some((_, index)) => loaders[*index].call(data),
                    None => Err(LoadError::new(LoadErrorKind::BadVariant {
                        allowed: discriminator.tags.iter().map(|(tag, _)| tag.clone()).collect(),
                        input_value: tag.clone(),
                    })
                    .at(TrailElement::key(discriminator.key.as_str()))),
                }
            }));
        }

        Ok(Loader::new(move |data| {
            let mut errors = Vec::with_capacity(loaders.len());
            for loader in &loaders {
                match loader.call(data) {
                    Ok(value) => return Ok(value),
                    Err(err) => errors.push(err),
                }
            }
            Err(LoadError::new(LoadErrorKind::Union {
                expected: expected.clone(),
                errors,
            }))
        }))
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        let norm = union_members(mediator, request.last_type())?;
        let members: Vec<NormType> = norm.type_args().cloned().collect();

        if let Some(inner) = norm.optional_inner() {
            let pos = members.iter().position(|m| m == inner).unwrap_or(0);
            let inner_dumper =
                mediator.mandatory_provide(&request.append_loc(Loc::generic_param(inner.source().clone(), pos)), |_| {
                    format!("Cannot create dumper for {}", norm)
                })?;
            return Ok(Dumper::new(move |value| match value {
                Value::None => Ok(Value::None),
                other => inner_dumper.call(other),
            }));
        }

        let dumpers = mediator.mandatory_provide_all(
            members
                .iter()
                .enumerate()
                .map(|(pos, member)| request.append_loc(Loc::generic_param(member.source().clone(), pos))),
            || "Cannot create dumper for union. Dumpers for some union cases cannot be created".to_string(),
        )?;
        let expected = norm.to_string();
        Ok(Dumper::new(move |value| {
            match members.iter().position(|member| value_matches(member, value)) {
                Some(index) => dumpers[index].call(value),
                None => Err(DumpError::type_error(&expected, value.type_name())),
            }
        }))
    }
}

/// Whether `value` is an instance of `ty`, judged by the value's shape only
fn value_matches(ty: &NormType, value: &Value) -> bool {
    match (ty.origin(), value) {
        (Origin::Any | Origin::Var(_) | Origin::NewType(_) | Origin::SelfType, _) => true,
        (Origin::None, Value::None) => true,
        (Origin::Prim(prim), _) => prim_matches(*prim, value),
        (Origin::Class(class), Value::Instance(instance)) => instance.class().is_subclass_of(class),
        (Origin::Class(class), Value::Enum(member)) => member.class == *class,
        (Origin::Class(class), Value::Dict(_)) => matches!(class.kind(), crate::types::ClassKind::TypedDict(_)),
        (origin, Value::List(_) | Value::Tuple(_) | Value::Set(_)) if origin.is_iterable() => true,
        (Origin::Tuple, Value::List(items) | Value::Tuple(items)) => items.len() == ty.args().len(),
        (Origin::Dict | Origin::Mapping, Value::Dict(_)) => true,
        (Origin::Literal, _) => ty.literal_values().into_iter().any(|allowed| allowed == value),
        (Origin::Union, _) => ty.type_args().any(|member| value_matches(member, value)),
        _ => false,
    }
}

fn prim_matches(prim: Prim, value: &Value) -> bool {
    matches!(
        (prim, value),
        (Prim::Bool, Value::Bool(_))
            | (Prim::Int, Value::Int(_))
            | (Prim::Float, Value::Float(_))
            | (Prim::Str, Value::Str(_))
            | (Prim::Bytes | Prim::ByteArray, Value::Bytes(_))
            | (Prim::DateTime, Value::DateTime(_) | Value::NaiveDateTime(_))
            | (Prim::Date, Value::Date(_))
            | (Prim::Time, Value::Time(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::LocStack;
    use crate::morphing::{DebugTrail, IntProvider, NoneProvider, StrProvider};
    use crate::provider::Recipe;
    use crate::types::Namespace;
    use std::sync::Arc;

    fn recipe() -> Recipe {
        vec![
            Arc::new(UnionProvider),
            Arc::new(IntProvider),
            Arc::new(StrProvider),
            Arc::new(NoneProvider),
        ]
    }

    fn loader(ty: TypeExpr) -> Loader {
        let recipe = recipe();
        let ns = Namespace::new();
        Mediator::new(&recipe, &ns)
            .provide(&LoaderRequest::new(LocStack::from_type(ty), true, DebugTrail::All))
            .unwrap()
    }

    fn dumper(ty: TypeExpr) -> Dumper {
        let recipe = recipe();
        let ns = Namespace::new();
        Mediator::new(&recipe, &ns)
            .provide(&DumperRequest::new(LocStack::from_type(ty), DebugTrail::All))
            .unwrap()
    }

    #[test]
    fn test_first_matching_member_wins() {
        let loader = loader(TypeExpr::union(vec![TypeExpr::str(), TypeExpr::int()]));
        assert_eq!(loader.call(&Value::Int(1)).unwrap(), Value::Int(1));
        assert_eq!(loader.call(&Value::str("a")).unwrap(), Value::str("a"));

        let err = loader.call(&Value::Float(1.5)).unwrap_err();
        match err.kind {
            LoadErrorKind::Union { errors, .. } => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_optional_fast_path() {
        let loader = loader(TypeExpr::optional(TypeExpr::int()));
        assert_eq!(loader.call(&Value::None).unwrap(), Value::None);
        assert_eq!(loader.call(&Value::Int(3)).unwrap(), Value::Int(3));
        assert!(matches!(
            loader.call(&Value::str("3")).unwrap_err().kind,
            LoadErrorKind::Type { .. }
        ));

        let dumper = dumper(TypeExpr::optional(TypeExpr::int()));
        assert_eq!(dumper.call(&Value::None).unwrap(), Value::None);
        assert_eq!(dumper.call(&Value::Int(3)).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_dumper_dispatches_by_value_type() {
        let dumper = dumper(TypeExpr::union(vec![TypeExpr::int(), TypeExpr::str(), TypeExpr::None]));
        assert_eq!(dumper.call(&Value::str("a")).unwrap(), Value::str("a"));
        assert_eq!(dumper.call(&Value::None).unwrap(), Value::None);
        assert!(dumper.call(&Value::Float(1.0)).is_err());
    }
}
