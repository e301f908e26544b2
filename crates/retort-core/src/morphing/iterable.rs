//! Homogeneous collections: `list`, `set`, `frozenset`, `Sequence` and
//! variadic tuples
//!
//! Strings, bytes and mappings are iterable on the wire too, but they are
//! never taken for a collection: strict loaders report them as excluded
//! types.

use crate::location::Loc;
use crate::morphing::{
    collect_errors, strip_dump_trail, strip_load_trail, DumpError, Dumper, DumperRequest, LoadError, LoadErrorKind,
    Loader, LoaderRequest, TrailElement,
};
use crate::provider::{Mediator, ProvideError, ProvideResult, Provider};
use crate::types::{NormType, Origin, TypeExpr};
use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct IterableProvider;

fn iterable_type(mediator: &Mediator<'_>, ty: &TypeExpr) -> ProvideResult<(NormType, TypeExpr)> {
    let norm = mediator.normalize(ty)?;
    if !norm.origin().is_iterable() {
        return Err(ProvideError::skip());
    }
    let item = norm.type_arg(0).map_or(TypeExpr::Any, |arg| arg.source().clone());
    Ok((norm, item))
}

/// Items of wire data accepted as a collection
fn items_of<'v>(data: &'v Value, strict: bool, expected: &str) -> Result<Vec<&'v Value>, LoadError> {
    match data {
        Value::List(items) | Value::Tuple(items) => Ok(items.iter().collect()),
        Value::Set(items) => Ok(items.iter().collect()),
        Value::Str(_) | Value::Bytes(_) | Value::Dict(_) if strict => Err(LoadError::new(LoadErrorKind::ExcludedType {
            expected: expected.to_string(),
            excluded: data.type_name(),
            input_value: data.clone(),
        })),
        other => Err(LoadError::type_error(expected, other)),
    }
}

fn build_collection(origin: &Origin, items: Vec<Value>) -> Value {
    match origin {
        Origin::Set | Origin::FrozenSet => Value::Set(items.into_iter().collect()),
        Origin::VarTuple => Value::Tuple(items),
        _ => Value::List(items),
    }
}

impl Provider for IterableProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        let (norm, item_ty) = iterable_type(mediator, request.last_type())?;
        let item_loader = mediator.mandatory_provide(&request.append_loc(Loc::generic_param(item_ty, 0)), |_| {
            "Cannot create loader for iterable. Loader for element cannot be created".to_string()
        })?;

        let origin = norm.origin().clone();
        let strict = request.strict_coercion;
        let debug_trail = request.debug_trail;
        let expected = norm.to_string();
        Ok(Loader::new(move |data| {
            let items = items_of(data, strict, &expected)?;
            let loaded = collect_errors(
                debug_trail,
                items.into_iter().enumerate(),
                |(index, item)| item_loader.call(item).map_err(|e| e.at(TrailElement::Index(index))),
                |errors| LoadError::aggregate(format!("while loading iterable {}", expected), errors),
                strip_load_trail,
            )?;
            Ok(build_collection(&origin, loaded))
        }))
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        let (norm, item_ty) = iterable_type(mediator, request.last_type())?;
        let item_dumper = mediator.mandatory_provide(&request.append_loc(Loc::generic_param(item_ty, 0)), |_| {
            "Cannot create dumper for iterable. Dumper for element cannot be created".to_string()
        })?;

        let debug_trail = request.debug_trail;
        let expected = norm.to_string();
        Ok(Dumper::new(move |value| {
            let items: Vec<&Value> = match value {
                Value::List(items) | Value::Tuple(items) => items.iter().collect(),
                Value::Set(items) => items.iter().collect(),
                other => return Err(DumpError::type_error(&expected, other.type_name())),
            };
            let dumped = collect_errors(
                debug_trail,
                items.into_iter().enumerate(),
                |(index, item)| item_dumper.call(item).map_err(|e| e.at(TrailElement::Index(index))),
                |errors| DumpError::aggregate(format!("while dumping iterable {}", expected), errors),
                strip_dump_trail,
            )?;
            Ok(Value::List(dumped))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::LocStack;
    use crate::morphing::{DebugTrail, IntProvider, StrProvider};
    use crate::provider::Recipe;
    use crate::types::Namespace;
    use std::sync::Arc;

    fn loader(ty: TypeExpr, strict: bool, debug_trail: DebugTrail) -> Loader {
        let recipe: Recipe = vec![Arc::new(IterableProvider), Arc::new(IntProvider), Arc::new(StrProvider)];
        let ns = Namespace::new();
        let mediator = Mediator::new(&recipe, &ns);
        mediator
            .provide(&LoaderRequest::new(LocStack::from_type(ty), strict, debug_trail))
            .unwrap()
    }

    #[test]
    fn test_list_of_ints() {
        let loader = loader(TypeExpr::list(TypeExpr::int()), true, DebugTrail::All);
        let data = Value::list([Value::Int(1), Value::Int(2)]);
        assert_eq!(loader.call(&data).unwrap(), data);
        let tuple = Value::Tuple(vec![Value::Int(3)]);
        assert_eq!(loader.call(&tuple).unwrap(), Value::list([Value::Int(3)]));
    }

    #[test]
    fn test_strict_excludes_str_and_dict() {
        let loader = loader(TypeExpr::list(TypeExpr::str()), true, DebugTrail::All);
        for data in [Value::str("abc"), Value::dict([("a", Value::Int(1))])] {
            let err = loader.call(&data).unwrap_err();
            assert!(matches!(err.kind, LoadErrorKind::ExcludedType { .. }), "{:?}", err);
        }
    }

    #[test]
    fn test_set_output() {
        let loader = loader(TypeExpr::set(TypeExpr::int()), true, DebugTrail::All);
        let loaded = loader.call(&Value::list([Value::Int(1), Value::Int(1), Value::Int(2)])).unwrap();
        assert_eq!(loaded, Value::Set([Value::Int(1), Value::Int(2)].into_iter().collect()));
    }

    #[test]
    fn test_item_errors_by_mode() {
        let data = Value::list([Value::Int(1), Value::str("x"), Value::str("y")]);

        let err = loader(TypeExpr::list(TypeExpr::int()), true, DebugTrail::All).call(&data).unwrap_err();
        let leaves = err.flatten();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].trail.elements(), &[TrailElement::Index(1)]);
        assert_eq!(leaves[1].trail.elements(), &[TrailElement::Index(2)]);

        let err = loader(TypeExpr::list(TypeExpr::int()), true, DebugTrail::First).call(&data).unwrap_err();
        assert!(matches!(err.kind, LoadErrorKind::Type { .. }));
        assert_eq!(err.trail.elements(), &[TrailElement::Index(1)]);

        let err = loader(TypeExpr::list(TypeExpr::int()), true, DebugTrail::Disable).call(&data).unwrap_err();
        assert!(err.trail.is_empty());
    }

    #[test]
    fn test_dump_var_tuple() {
        let recipe: Recipe = vec![Arc::new(IterableProvider), Arc::new(IntProvider)];
        let ns = Namespace::new();
        let mediator = Mediator::new(&recipe, &ns);
        let dumper = mediator
            .provide(&DumperRequest::new(
                LocStack::from_type(TypeExpr::var_tuple(TypeExpr::int())),
                DebugTrail::All,
            ))
            .unwrap();
        let dumped = dumper.call(&Value::Tuple(vec![Value::Int(1), Value::Int(2)])).unwrap();
        assert_eq!(dumped, Value::list([Value::Int(1), Value::Int(2)]));
        assert!(dumper.call(&Value::Int(1)).is_err());
    }
}
