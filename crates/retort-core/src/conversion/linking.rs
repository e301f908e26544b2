//! Linking providers
//!
//! A linking decides where the value of one destination field comes from.
//! The default links fields with equal ids; user providers link fields by
//! predicate, to constants, or to functions over the source model.

use crate::conversion::{
    Coercer, ConversionError, LinkingRequest, LinkingResult, ParamSpec, UnlinkedOptionalPolicy,
    UnlinkedOptionalPolicyRequest,
};
use crate::location::{Loc, LocStack};
use crate::predicate::LocStackChecker;
use crate::provider::{CannotProvide, Mediator, ProvideError, ProvideResult, Provider};
use crate::shape::{CallArgs, FieldDefault, InputField, ParamKind};
use crate::types::TypeExpr;
use crate::value::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

type LinkFunctionBody = dyn Fn(CallArgs) -> Result<Value, ConversionError> + Send + Sync;

/// A function producing a destination field from the source model.
///
/// The first positional parameter receives the source model, later
/// positional parameters receive the converter parameters of the same name
/// and keyword parameters receive the source fields of the same name.
#[derive(Clone)]
pub struct LinkFunction {
    name: String,
    params: Vec<(InputField, ParamKind)>,
    body: Arc<LinkFunctionBody>,
}

impl LinkFunction {
    pub fn new(
        name: impl Into<String>,
        body: impl Fn(CallArgs) -> Result<Value, ConversionError> + Send + Sync + 'static,
    ) -> Self {
        LinkFunction {
            name: name.into(),
            params: Vec::new(),
            body: Arc::new(body),
        }
    }

    pub fn positional(mut self, name: impl Into<String>, ty: impl Into<TypeExpr>) -> Self {
        self.params.push((InputField::new(name, ty), ParamKind::PosOrKw));
        self
    }

    pub fn keyword(mut self, name: impl Into<String>, ty: impl Into<TypeExpr>) -> Self {
        self.params.push((InputField::new(name, ty), ParamKind::KwOnly));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[(InputField, ParamKind)] {
        &self.params
    }

    pub fn call(&self, args: CallArgs) -> Result<Value, ConversionError> {
        (self.body)(args)
    }
}

impl PartialEq for LinkFunction {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl Eq for LinkFunction {}

impl Hash for LinkFunction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.body) as *const () as usize).hash(state);
    }
}

impl fmt::Debug for LinkFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkFunction")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

fn source_id(source: &LocStack) -> Option<&str> {
    source.last().and_then(Loc::field_id)
}

/// Links a destination field to the source field with the same id.
/// Converter parameters shadow the fields of the top-level source model.
#[derive(Debug, Clone, Default)]
pub struct DefaultLinkingProvider;

impl Provider for DefaultLinkingProvider {
    fn provide_linking(&self, _mediator: &Mediator<'_>, request: &LinkingRequest) -> ProvideResult<LinkingResult> {
        let target = request.destination.last().and_then(Loc::field_id).ok_or_else(ProvideError::skip)?;
        let context = if request.destination.len() == 2 {
            request.context.loc_stacks().into_iter().rev().collect()
        } else {
            Vec::new()
        };
        context
            .into_iter()
            .chain(request.sources.iter().cloned())
            .find(|source| source_id(source) == Some(target))
            .map(|source| LinkingResult::Field { source, coercer: None })
            .ok_or_else(ProvideError::skip)
    }
}

/// Links the destination matching `dst` to the first source matching `src`
#[derive(Debug, Clone)]
pub struct MatchingLinkingProvider {
    src: LocStackChecker,
    dst: LocStackChecker,
    coercer: Option<Coercer>,
}

impl MatchingLinkingProvider {
    pub fn new(src: impl Into<LocStackChecker>, dst: impl Into<LocStackChecker>, coercer: Option<Coercer>) -> Self {
        MatchingLinkingProvider {
            src: src.into(),
            dst: dst.into(),
            coercer,
        }
    }
}

impl Provider for MatchingLinkingProvider {
    fn provide_linking(&self, mediator: &Mediator<'_>, request: &LinkingRequest) -> ProvideResult<LinkingResult> {
        if !mediator.check(&self.dst, &request.destination)? {
            return Err(ProvideError::skip());
        }
        let context = request.context.loc_stacks();
        for source in request.sources.iter().chain(context.iter().rev()) {
            if mediator.check(&self.src, source)? {
                return Ok(LinkingResult::Field {
                    source: source.clone(),
                    coercer: self.coercer.clone(),
                });
            }
        }
        Err(ProvideError::skip())
    }
}

/// Feeds the destination matching `dst` with a constant or a factory result
#[derive(Debug, Clone)]
pub struct ConstantLinkingProvider {
    dst: LocStackChecker,
    constant: FieldDefault,
}

impl ConstantLinkingProvider {
    pub fn new(dst: impl Into<LocStackChecker>, constant: FieldDefault) -> Self {
        ConstantLinkingProvider {
            dst: dst.into(),
            constant,
        }
    }
}

impl Provider for ConstantLinkingProvider {
    fn provide_linking(&self, mediator: &Mediator<'_>, request: &LinkingRequest) -> ProvideResult<LinkingResult> {
        if mediator.check(&self.dst, &request.destination)? {
            Ok(LinkingResult::Constant(self.constant.clone()))
        } else {
            Err(ProvideError::skip())
        }
    }
}

/// Feeds the destination matching `dst` with the result of a function
#[derive(Debug, Clone)]
pub struct FunctionLinkingProvider {
    func: LinkFunction,
    dst: LocStackChecker,
}

impl FunctionLinkingProvider {
    pub fn new(func: LinkFunction, dst: impl Into<LocStackChecker>) -> Self {
        FunctionLinkingProvider { func, dst: dst.into() }
    }

    fn param_linking(
        &self,
        request: &LinkingRequest,
        field: &InputField,
        kind: ParamKind,
        index: usize,
    ) -> Result<LinkingResult, CannotProvide> {
        let source = match kind {
            ParamKind::KwOnly => request
                .sources
                .iter()
                .find(|source| source_id(source) == Some(field.id.as_str()))
                .ok_or_else(|| {
                    CannotProvide::terminal(format!("Cannot match function parameter ‹{}› with any model field", field.id))
                })?,
            _ if index == 0 => return Ok(LinkingResult::Model),
            _ => {
                let position = request
                    .context
                    .params
                    .iter()
                    .position(|param| param.field_id() == Some(field.id.as_str()))
                    .ok_or_else(|| {
                        CannotProvide::terminal(format!(
                            "Cannot match function parameter ‹{}› with any converter parameter",
                            field.id
                        ))
                    })?;
                return Ok(LinkingResult::Field {
                    source: LocStack::new(request.context.params[position].clone()),
                    coercer: None,
                });
            }
        };
        Ok(LinkingResult::Field {
            source: source.clone(),
            coercer: None,
        })
    }
}

impl Provider for FunctionLinkingProvider {
    fn provide_linking(&self, mediator: &Mediator<'_>, request: &LinkingRequest) -> ProvideResult<LinkingResult> {
        if !mediator.check(&self.dst, &request.destination)? {
            return Err(ProvideError::skip());
        }
        let mut param_specs = Vec::new();
        let mut failures = Vec::new();
        for (index, (field, kind)) in self.func.params().iter().enumerate() {
            match self.param_linking(request, field, *kind, index) {
                Ok(linking) => param_specs.push(ParamSpec {
                    field: field.clone(),
                    kind: *kind,
                    linking,
                }),
                Err(cause) => failures.push(cause),
            }
        }
        if failures.is_empty() {
            return Ok(LinkingResult::Function {
                func: self.func.clone(),
                param_specs,
            });
        }
        let mut failure = CannotProvide::aggregate(
            format!(
                "Cannot create linking for function ‹{}›. Linkings for some parameters are not found",
                self.func.name()
            ),
            failures,
        )
        .make_terminal();
        if let Some(source) = request.sources.first() {
            failure = failure.with_note(format!("Linking: {} ──▷ {}", source.prefix(1), request.destination));
        }
        Err(failure.into())
    }
}

/// Answers the unlinked optional policy request
#[derive(Debug, Clone)]
pub struct UnlinkedOptionalPolicyProvider {
    is_allowed: bool,
}

impl UnlinkedOptionalPolicyProvider {
    pub fn new(is_allowed: bool) -> Self {
        UnlinkedOptionalPolicyProvider { is_allowed }
    }
}

impl Provider for UnlinkedOptionalPolicyProvider {
    fn provide_unlinked_optional_policy(
        &self,
        _mediator: &Mediator<'_>,
        _request: &UnlinkedOptionalPolicyRequest,
    ) -> ProvideResult<UnlinkedOptionalPolicy> {
        Ok(UnlinkedOptionalPolicy {
            is_allowed: self.is_allowed,
        })
    }
}
