//! `dict` and `Mapping`

use crate::location::Loc;
use crate::morphing::{
    strip_dump_trail, strip_load_trail, DebugTrail, DumpError, Dumper, DumperRequest, LoadError, Loader,
    LoaderRequest, TrailElement,
};
use crate::provider::{Mediator, ProvideError, ProvideResult, Provider};
use crate::types::{Origin, TypeExpr};
use crate::value::Value;
use indexmap::IndexMap;

#[derive(Debug, Clone, Default)]
pub struct DictProvider;

fn dict_types(mediator: &Mediator<'_>, ty: &TypeExpr) -> ProvideResult<(String, TypeExpr, TypeExpr)> {
    let norm = mediator.normalize(ty)?;
    if !matches!(norm.origin(), Origin::Dict | Origin::Mapping) {
        return Err(ProvideError::skip());
    }
    let arg = |pos: usize| norm.type_arg(pos).map_or(TypeExpr::Any, |arg| arg.source().clone());
    Ok((norm.to_string(), arg(0), arg(1)))
}

/// Applies `key_fn` and `value_fn` to every entry; errors carry the entry key
fn morph_entries<E>(
    debug_trail: DebugTrail,
    map: &IndexMap<Value, Value>,
    key_fn: impl Fn(&Value) -> Result<Value, E>,
    value_fn: impl Fn(&Value) -> Result<Value, E>,
    at: impl Fn(E, TrailElement) -> E,
    aggregate: impl FnOnce(Vec<E>) -> E,
    strip: impl Fn(E) -> E,
) -> Result<IndexMap<Value, Value>, E> {
    let mut result = IndexMap::with_capacity(map.len());
    let mut errors = Vec::new();
    for (key, value) in map {
        let entry = key_fn(key).and_then(|new_key| Ok((new_key, value_fn(value)?)));
        match entry {
            Ok((new_key, new_value)) => {
                result.insert(new_key, new_value);
            }
            Err(err) => {
                let err = at(err, TrailElement::Key(key.clone()));
                match debug_trail {
                    DebugTrail::All => errors.push(err),
                    DebugTrail::First => return Err(err),
                    DebugTrail::Disable => return Err(strip(err)),
                }
            }
        }
    }
    if errors.is_empty() {
        Ok(result)
    } else {
        Err(aggregate(errors))
    }
}

impl Provider for DictProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        let (expected, key_ty, value_ty) = dict_types(mediator, request.last_type())?;
        let loaders = mediator.mandatory_provide_all(
            [
                request.append_loc(Loc::generic_param(key_ty, 0)),
                request.append_loc(Loc::generic_param(value_ty, 1)),
            ],
            || "Cannot create loader for dict. Loaders for key and value cannot be created".to_string(),
        )?;
        let (key_loader, value_loader) = (loaders[0].clone(), loaders[1].clone());

        let debug_trail = request.debug_trail;
        Ok(Loader::new(move |data| {
            let Value::Dict(map) = data else {
                return Err(LoadError::type_error(&expected, data));
            };
            morph_entries(
                debug_trail,
                map,
                |key| key_loader.call(key),
                |value| value_loader.call(value),
                LoadError::at,
                |errors| LoadError::aggregate(format!("while loading {}", expected), errors),
                strip_load_trail,
            )
            .map(Value::Dict)
        }))
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        let (expected, key_ty, value_ty) = dict_types(mediator, request.last_type())?;
        let dumpers = mediator.mandatory_provide_all(
            [
                request.append_loc(Loc::generic_param(key_ty, 0)),
                request.append_loc(Loc::generic_param(value_ty, 1)),
            ],
            || "Cannot create dumper for dict. Dumpers for key and value cannot be created".to_string(),
        )?;
        let (key_dumper, value_dumper) = (dumpers[0].clone(), dumpers[1].clone());

        let debug_trail = request.debug_trail;
        Ok(Dumper::new(move |value| {
            let Value::Dict(map) = value else {
                return Err(DumpError::type_error(&expected, value.type_name()));
            };
            morph_entries(
                debug_trail,
                map,
                |key| key_dumper.call(key),
                |item| value_dumper.call(item),
                DumpError::at,
                |errors| DumpError::aggregate(format!("while dumping {}", expected), errors),
                strip_dump_trail,
            )
            .map(Value::Dict)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::LocStack;
    use crate::morphing::{IntProvider, LoadErrorKind, StrProvider};
    use crate::provider::Recipe;
    use crate::types::Namespace;
    use std::sync::Arc;

    fn recipe() -> Recipe {
        vec![Arc::new(DictProvider), Arc::new(IntProvider), Arc::new(StrProvider)]
    }

    #[test]
    fn test_load_dict() {
        let recipe = recipe();
        let ns = Namespace::new();
        let mediator = Mediator::new(&recipe, &ns);
        let ty = TypeExpr::dict(TypeExpr::str(), TypeExpr::int());
        let loader = mediator
            .provide(&LoaderRequest::new(LocStack::from_type(ty), true, DebugTrail::All))
            .unwrap();

        let data = Value::dict([("a", Value::Int(1)), ("b", Value::Int(2))]);
        assert_eq!(loader.call(&data).unwrap(), data);

        let bad = Value::dict([("a", Value::Int(1)), ("b", Value::str("2"))]);
        let leaves = loader.call(&bad).unwrap_err().flatten();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].trail.elements(), &[TrailElement::key("b")]);

        let err = loader.call(&Value::list([])).unwrap_err();
        assert!(matches!(err.kind, LoadErrorKind::Type { .. }));
    }

    #[test]
    fn test_dump_mapping() {
        let recipe = recipe();
        let ns = Namespace::new();
        let mediator = Mediator::new(&recipe, &ns);
        let ty = TypeExpr::Mapping(Box::new(TypeExpr::str()), Box::new(TypeExpr::int()));
        let dumper = mediator
            .provide(&DumperRequest::new(LocStack::from_type(ty), DebugTrail::All))
            .unwrap();
        let data = Value::dict([("a", Value::Int(1))]);
        assert_eq!(dumper.call(&data).unwrap(), data);
    }
}
