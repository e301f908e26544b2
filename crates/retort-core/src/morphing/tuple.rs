//! Fixed-length tuples

use crate::location::Loc;
use crate::morphing::{
    collect_errors, strip_dump_trail, strip_load_trail, DumpError, Dumper, DumperRequest, LoadError, LoadErrorKind,
    Loader, LoaderRequest, TrailElement,
};
use crate::provider::{Mediator, ProvideError, ProvideResult, Provider};
use crate::types::{Origin, TypeExpr};
use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct TupleProvider;

fn item_types(mediator: &Mediator<'_>, ty: &TypeExpr) -> ProvideResult<(String, Vec<TypeExpr>)> {
    let norm = mediator.normalize(ty)?;
    if norm.origin() != &Origin::Tuple {
        return Err(ProvideError::skip());
    }
    let items = norm.type_args().map(|arg| arg.source().clone()).collect();
    Ok((norm.to_string(), items))
}

fn check_len(data: &Value, items: &[Value], expected_len: usize) -> Result<(), LoadError> {
    if items.len() < expected_len {
        return Err(LoadError::new(LoadErrorKind::NoRequiredItems {
            expected_len,
            input_value: data.clone(),
        }));
    }
    if items.len() > expected_len {
        return Err(LoadError::new(LoadErrorKind::ExtraItems {
            expected_len,
            input_value: data.clone(),
        }));
    }
    Ok(())
}

impl Provider for TupleProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        let (expected, item_types) = item_types(mediator, request.last_type())?;
        let loaders = mediator.mandatory_provide_all(
            item_types
                .into_iter()
                .enumerate()
                .map(|(pos, ty)| request.append_loc(Loc::generic_param(ty, pos))),
            || "Cannot create loader for tuple. Loaders for some elements cannot be created".to_string(),
        )?;

        let strict = request.strict_coercion;
        let debug_trail = request.debug_trail;
        Ok(Loader::new(move |data| {
            let items: &[Value] = match data {
                Value::List(items) | Value::Tuple(items) => items,
                Value::Str(_) | Value::Bytes(_) | Value::Dict(_) if strict => {
                    return Err(LoadError::new(LoadErrorKind::ExcludedType {
                        expected: expected.clone(),
                        excluded: data.type_name(),
                        input_value: data.clone(),
                    }))
                }
                other => return Err(LoadError::type_error(&expected, other)),
            };
            check_len(data, items, loaders.len())?;
            let loaded = collect_errors(
                debug_trail,
                loaders.iter().zip(items).enumerate(),
                |(index, (loader, item))| loader.call(item).map_err(|e| e.at(TrailElement::Index(index))),
                |errors| LoadError::aggregate(format!("while loading tuple {}", expected), errors),
                strip_load_trail,
            )?;
            Ok(Value::Tuple(loaded))
        }))
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        let (expected, item_types) = item_types(mediator, request.last_type())?;
        let dumpers = mediator.mandatory_provide_all(
            item_types
                .into_iter()
                .enumerate()
                .map(|(pos, ty)| request.append_loc(Loc::generic_param(ty, pos))),
            || "Cannot create dumper for tuple. Dumpers for some elements cannot be created".to_string(),
        )?;

        let debug_trail = request.debug_trail;
        Ok(Dumper::new(move |value| {
            let items = match value {
                Value::List(items) | Value::Tuple(items) if items.len() == dumpers.len() => items,
                other => return Err(DumpError::type_error(&expected, other.type_name())),
            };
            let dumped = collect_errors(
                debug_trail,
                dumpers.iter().zip(items).enumerate(),
                |(index, (dumper, item))| dumper.call(item).map_err(|e| e.at(TrailElement::Index(index))),
                |errors| DumpError::aggregate(format!("while dumping tuple {}", expected), errors),
                strip_dump_trail,
            )?;
            Ok(Value::List(dumped))
        }))
    }
}
