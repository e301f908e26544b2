//! Loader and dumper requests

use crate::location::{Loc, LocStack};
use crate::morphing::{DebugTrail, Dumper, Loader};
use crate::provider::{Mediator, ProvideResult, Provider, Request, StubRegistry};
use crate::types::TypeExpr;

/// Ask for a loader of the type at `loc_stack`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoaderRequest {
    pub loc_stack: LocStack,
    pub strict_coercion: bool,
    pub debug_trail: DebugTrail,
}

/// Ask for a dumper of the type at `loc_stack`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DumperRequest {
    pub loc_stack: LocStack,
    pub debug_trail: DebugTrail,
}

impl LoaderRequest {
    pub fn new(loc_stack: LocStack, strict_coercion: bool, debug_trail: DebugTrail) -> Self {
        LoaderRequest {
            loc_stack,
            strict_coercion,
            debug_trail,
        }
    }

    /// Same settings, one location deeper
    pub fn append_loc(&self, loc: Loc) -> Self {
        LoaderRequest {
            loc_stack: self.loc_stack.append(loc),
            ..self.clone()
        }
    }

    /// Same site with another type
    pub fn with_last_type(&self, ty: TypeExpr) -> Self {
        LoaderRequest {
            loc_stack: self.loc_stack.replace_last_type(ty),
            ..self.clone()
        }
    }

    pub fn last_type(&self) -> &TypeExpr {
        self.loc_stack.last_type()
    }
}

impl DumperRequest {
    pub fn new(loc_stack: LocStack, debug_trail: DebugTrail) -> Self {
        DumperRequest { loc_stack, debug_trail }
    }

    pub fn append_loc(&self, loc: Loc) -> Self {
        DumperRequest {
            loc_stack: self.loc_stack.append(loc),
            ..self.clone()
        }
    }

    pub fn with_last_type(&self, ty: TypeExpr) -> Self {
        DumperRequest {
            loc_stack: self.loc_stack.replace_last_type(ty),
            ..self.clone()
        }
    }

    pub fn last_type(&self) -> &TypeExpr {
        self.loc_stack.last_type()
    }
}

impl Request for LoaderRequest {
    type Response = Loader;

    fn describe(&self) -> String {
        format!("loader for type {}", self.loc_stack.last_type())
    }

    fn loc_stack(&self) -> Option<&LocStack> {
        Some(&self.loc_stack)
    }

    fn dispatch(&self, provider: &dyn Provider, mediator: &Mediator<'_>) -> ProvideResult<Loader> {
        provider.provide_loader(mediator, self)
    }

    fn recursion_stub(&self, stubs: &StubRegistry) -> Option<Loader> {
        let loc = self.loc_stack.last()?;
        Some(stubs.stub(loc, || self.describe()))
    }

    fn resolve_stub(&self, stubs: &StubRegistry, response: Option<&Loader>) {
        let Some(loc) = self.loc_stack.last() else {
            return;
        };
        match response {
            Some(loader) => stubs.fill(loc, loader),
            None => stubs.abort::<Loader>(loc),
        }
    }
}

impl Request for DumperRequest {
    type Response = Dumper;

    fn describe(&self) -> String {
        format!("dumper for type {}", self.loc_stack.last_type())
    }

    fn loc_stack(&self) -> Option<&LocStack> {
        Some(&self.loc_stack)
    }

    fn dispatch(&self, provider: &dyn Provider, mediator: &Mediator<'_>) -> ProvideResult<Dumper> {
        provider.provide_dumper(mediator, self)
    }

    fn recursion_stub(&self, stubs: &StubRegistry) -> Option<Dumper> {
        let loc = self.loc_stack.last()?;
        Some(stubs.stub(loc, || self.describe()))
    }

    fn resolve_stub(&self, stubs: &StubRegistry, response: Option<&Dumper>) {
        let Some(loc) = self.loc_stack.last() else {
            return;
        };
        match response {
            Some(dumper) => stubs.fill(loc, dumper),
            None => stubs.abort::<Dumper>(loc),
        }
    }
}
