//! Providers and the request bus
//!
//! A [`Provider`] answers some kinds of requests. Every provider method
//! defaults to "not applicable", so a provider only overrides the request
//! kinds it handles. The ordered list of providers is the [`Recipe`]; the
//! [`Mediator`] walks it for each request.
//!
//! - [`error`] - the "not applicable" signal and provider errors
//! - [`request`] - the [`Request`] contract
//! - [`mediator`] - routing, caching and recursion handling
//! - [`recursion`] - stubs for recursive types
//! - [`bound`] - restricting a provider with a predicate

pub mod bound;
pub mod error;
pub mod mediator;
pub mod recursion;
pub mod request;

pub use bound::BoundProvider;
pub use error::{CannotProvide, ProvideError, ProvideResult};
pub use mediator::Mediator;
pub use recursion::{Recursive, StubFailure, StubRegistry, StubSlot};
pub use request::Request;

use crate::conversion::{
    Coercer, CoercerRequest, Converter, ConverterRequest, LinkingRequest, LinkingResult,
    UnlinkedOptionalPolicy, UnlinkedOptionalPolicyRequest,
};
use crate::morphing::{Dumper, DumperRequest, Loader, LoaderRequest};
use crate::name_layout::{
    ExtraOverlay, ExtraOverlayRequest, InputNameLayout, InputNameLayoutRequest, OutputNameLayout,
    OutputNameLayoutRequest, SievesOverlay, SievesOverlayRequest, StructureOverlay, StructureOverlayRequest,
};
use crate::shape::{InputShape, InputShapeRequest, OutputShape, OutputShapeRequest};
use std::fmt;
use std::sync::Arc;

/// Ordered list of providers, earlier entries take precedence
pub type Recipe = Vec<Arc<dyn Provider>>;

/// How a user provider combines with the provider that would answer
/// without it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Chain {
    /// The user part runs (or takes precedence) first
    #[default]
    First,
    /// The user part runs (or takes precedence) last
    Last,
}

/// A handler for one or more request kinds
#[allow(unused_variables)]
pub trait Provider: Send + Sync + fmt::Debug {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        Err(ProvideError::skip())
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        Err(ProvideError::skip())
    }

    fn provide_input_shape(&self, mediator: &Mediator<'_>, request: &InputShapeRequest) -> ProvideResult<InputShape> {
        Err(ProvideError::skip())
    }

    fn provide_output_shape(
        &self,
        mediator: &Mediator<'_>,
        request: &OutputShapeRequest,
    ) -> ProvideResult<OutputShape> {
        Err(ProvideError::skip())
    }

    fn provide_input_name_layout(
        &self,
        mediator: &Mediator<'_>,
        request: &InputNameLayoutRequest,
    ) -> ProvideResult<InputNameLayout> {
        Err(ProvideError::skip())
    }

    fn provide_output_name_layout(
        &self,
        mediator: &Mediator<'_>,
        request: &OutputNameLayoutRequest,
    ) -> ProvideResult<OutputNameLayout> {
        Err(ProvideError::skip())
    }

    fn provide_structure_overlay(
        &self,
        mediator: &Mediator<'_>,
        request: &StructureOverlayRequest,
    ) -> ProvideResult<StructureOverlay> {
        Err(ProvideError::skip())
    }

    fn provide_sieves_overlay(
        &self,
        mediator: &Mediator<'_>,
        request: &SievesOverlayRequest,
    ) -> ProvideResult<SievesOverlay> {
        Err(ProvideError::skip())
    }

    fn provide_extra_overlay(&self, mediator: &Mediator<'_>, request: &ExtraOverlayRequest) -> ProvideResult<ExtraOverlay> {
        Err(ProvideError::skip())
    }

    fn provide_coercer(&self, mediator: &Mediator<'_>, request: &CoercerRequest) -> ProvideResult<Coercer> {
        Err(ProvideError::skip())
    }

    fn provide_linking(&self, mediator: &Mediator<'_>, request: &LinkingRequest) -> ProvideResult<LinkingResult> {
        Err(ProvideError::skip())
    }

    fn provide_unlinked_optional_policy(
        &self,
        mediator: &Mediator<'_>,
        request: &UnlinkedOptionalPolicyRequest,
    ) -> ProvideResult<UnlinkedOptionalPolicy> {
        Err(ProvideError::skip())
    }

    fn provide_converter(&self, mediator: &Mediator<'_>, request: &ConverterRequest) -> ProvideResult<Converter> {
        Err(ProvideError::skip())
    }
}
