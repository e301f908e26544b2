//! Conversion requests

use crate::conversion::{Coercer, Converter, LinkFunction};
use crate::location::{Loc, LocStack};
use crate::provider::{Mediator, ProvideResult, Provider, Request, StubRegistry};
use crate::shape::{FieldDefault, InputField, ParamKind};
use crate::types::TypeExpr;

/// Extra parameters of the converter being built.
///
/// Every parameter is a field location; a linking source pointing at a
/// parameter is the single-element stack of that location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ConversionContext {
    pub params: Vec<Loc>,
}

impl ConversionContext {
    pub fn new(params: Vec<Loc>) -> Self {
        ConversionContext { params }
    }

    pub fn loc_stacks(&self) -> Vec<LocStack> {
        self.params.iter().cloned().map(LocStack::new).collect()
    }

    /// Index of the parameter `source` points at
    pub fn position(&self, source: &LocStack) -> Option<usize> {
        if source.len() != 1 {
            return None;
        }
        self.params.iter().position(|param| Some(param) == source.last())
    }
}

/// Ask for a function turning values at `src` into values at `dst`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoercerRequest {
    pub src: LocStack,
    pub ctx: ConversionContext,
    pub dst: LocStack,
}

impl CoercerRequest {
    pub fn new(src: LocStack, ctx: ConversionContext, dst: LocStack) -> Self {
        CoercerRequest { src, ctx, dst }
    }

    /// Both sides one location deeper
    pub fn append_loc(&self, src_loc: Loc, dst_loc: Loc) -> Self {
        CoercerRequest {
            src: self.src.append(src_loc),
            ctx: self.ctx.clone(),
            dst: self.dst.append(dst_loc),
        }
    }

    pub fn append_dst_loc(&self, dst_loc: Loc) -> Self {
        CoercerRequest {
            src: self.src.clone(),
            ctx: self.ctx.clone(),
            dst: self.dst.append(dst_loc),
        }
    }

    /// Same sites with other types
    pub fn with_last_types(&self, src: TypeExpr, dst: TypeExpr) -> Self {
        CoercerRequest {
            src: self.src.replace_last_type(src),
            ctx: self.ctx.clone(),
            dst: self.dst.replace_last_type(dst),
        }
    }
}

impl Request for CoercerRequest {
    type Response = Coercer;

    fn describe(&self) -> String {
        format!("coercer from {} to {}", self.src.last_type(), self.dst.last_type())
    }

    fn loc_stack(&self) -> Option<&LocStack> {
        Some(&self.dst)
    }

    fn dispatch(&self, provider: &dyn Provider, mediator: &Mediator<'_>) -> ProvideResult<Coercer> {
        provider.provide_coercer(mediator, self)
    }

    fn recursion_stub(&self, stubs: &StubRegistry) -> Option<Coercer> {
        let loc = self.dst.last()?;
        Some(stubs.stub(loc, || self.describe()))
    }

    fn resolve_stub(&self, stubs: &StubRegistry, response: Option<&Coercer>) {
        let Some(loc) = self.dst.last() else {
            return;
        };
        match response {
            Some(coercer) => stubs.fill(loc, coercer),
            None => stubs.abort::<Coercer>(loc),
        }
    }
}

/// A parameter of a linked function with its own linking
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamSpec {
    pub field: InputField,
    pub kind: ParamKind,
    pub linking: LinkingResult,
}

/// Where the value of a destination field comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LinkingResult {
    /// A source field or converter parameter, optionally through an explicit coercer
    Field { source: LocStack, coercer: Option<Coercer> },
    /// A constant value or a factory result
    Constant(FieldDefault),
    /// The whole source model
    Model,
    /// The result of a function over the source model
    Function { func: LinkFunction, param_specs: Vec<ParamSpec> },
}

/// Ask which source feeds `destination`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkingRequest {
    pub sources: Vec<LocStack>,
    pub context: ConversionContext,
    pub destination: LocStack,
}

impl Request for LinkingRequest {
    type Response = LinkingResult;

    fn describe(&self) -> String {
        format!("linking for {}", self.destination)
    }

    fn loc_stack(&self) -> Option<&LocStack> {
        Some(&self.destination)
    }

    fn dispatch(&self, provider: &dyn Provider, mediator: &Mediator<'_>) -> ProvideResult<LinkingResult> {
        provider.provide_linking(mediator, self)
    }
}

/// Whether an optional destination field may stay unlinked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnlinkedOptionalPolicy {
    pub is_allowed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnlinkedOptionalPolicyRequest {
    pub loc_stack: LocStack,
}

impl UnlinkedOptionalPolicyRequest {
    pub fn new(loc_stack: LocStack) -> Self {
        UnlinkedOptionalPolicyRequest { loc_stack }
    }
}

impl Request for UnlinkedOptionalPolicyRequest {
    type Response = UnlinkedOptionalPolicy;

    fn describe(&self) -> String {
        format!("unlinked optional policy for {}", self.loc_stack)
    }

    fn loc_stack(&self) -> Option<&LocStack> {
        Some(&self.loc_stack)
    }

    fn dispatch(&self, provider: &dyn Provider, mediator: &Mediator<'_>) -> ProvideResult<UnlinkedOptionalPolicy> {
        provider.provide_unlinked_optional_policy(mediator, self)
    }
}

/// Ask for a converter from `src` to `dst` taking extra named parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConverterRequest {
    pub src: TypeExpr,
    pub params: Vec<(String, TypeExpr)>,
    pub dst: TypeExpr,
    pub name: Option<String>,
}

impl ConverterRequest {
    pub fn new(src: TypeExpr, dst: TypeExpr) -> Self {
        ConverterRequest {
            src,
            params: Vec::new(),
            dst,
            name: None,
        }
    }
}

impl Request for ConverterRequest {
    type Response = Converter;

    fn describe(&self) -> String {
        format!("converter from {} to {}", self.src, self.dst)
    }

    fn dispatch(&self, provider: &dyn Provider, mediator: &Mediator<'_>) -> ProvideResult<Converter> {
        provider.provide_converter(mediator, self)
    }
}
