//! The request contract

use crate::location::LocStack;
use crate::provider::error::ProvideResult;
use crate::provider::recursion::StubRegistry;
use crate::provider::{Mediator, Provider};
use std::fmt;
use std::hash::Hash;

/// A typed query dispatched through the mediator.
///
/// Requests are plain hashable values: two equal requests always receive the
/// same response within one build.
pub trait Request: Clone + Eq + Hash + fmt::Debug + 'static {
    type Response: Clone + 'static;

    /// Short description used in diagnostics, e.g. "loader for type Book"
    fn describe(&self) -> String;

    /// Location stack the request concerns, if it is located
    fn loc_stack(&self) -> Option<&LocStack> {
        None
    }

    /// Route the request to the matching provider method
    fn dispatch(&self, provider: &dyn Provider, mediator: &Mediator<'_>) -> ProvideResult<Self::Response>;

    /// Stub returned when the request recurses into itself.
    /// Requests whose responses cannot be stubbed return `None`.
    fn recursion_stub(&self, _stubs: &StubRegistry) -> Option<Self::Response> {
        None
    }

    /// Patch (`Some`) or poison (`None`) the stub created for this request
    fn resolve_stub(&self, _stubs: &StubRegistry, _response: Option<&Self::Response>) {}
}
