//! Newtypes and unbound type parameters
//!
//! Both are transparent on the wire: a newtype is morphed as its supertype,
//! a type parameter left unsubstituted as its bound (or `Any`).

use crate::morphing::{sub_dumper, sub_loader, Dumper, DumperRequest, Loader, LoaderRequest};
use crate::provider::{Mediator, ProvideError, ProvideResult, Provider};
use crate::types::{Origin, TypeExpr};

#[derive(Debug, Clone, Default)]
pub struct NewTypeUnwrappingProvider;

fn supertype(mediator: &Mediator<'_>, ty: &TypeExpr) -> ProvideResult<TypeExpr> {
    match mediator.normalize(ty)?.origin() {
        Origin::NewType(def) => Ok(def.supertype.as_ref().clone()),
        _ => Err(ProvideError::skip()),
    }
}

impl Provider for NewTypeUnwrappingProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        let supertype = supertype(mediator, request.last_type())?;
        sub_loader(mediator, request, supertype)
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        let supertype = supertype(mediator, request.last_type())?;
        sub_dumper(mediator, request, supertype)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TypeVarProvider;

fn fallback(mediator: &Mediator<'_>, ty: &TypeExpr) -> ProvideResult<TypeExpr> {
    match mediator.normalize(ty)?.origin() {
        Origin::Var(var) => Ok(var.fallback()),
        _ => Err(ProvideError::skip()),
    }
}

impl Provider for TypeVarProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        let fallback = fallback(mediator, request.last_type())?;
        sub_loader(mediator, request, fallback)
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        let fallback = fallback(mediator, request.last_type())?;
        sub_dumper(mediator, request, fallback)
    }
}
