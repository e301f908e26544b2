//! Predicate-restricted providers

use crate::conversion::{
    Coercer, CoercerRequest, Converter, ConverterRequest, LinkingRequest, LinkingResult,
    UnlinkedOptionalPolicy, UnlinkedOptionalPolicyRequest,
};
use crate::morphing::{Dumper, DumperRequest, Loader, LoaderRequest};
use crate::name_layout::{
    ExtraOverlay, ExtraOverlayRequest, InputNameLayout, InputNameLayoutRequest, OutputNameLayout,
    OutputNameLayoutRequest, SievesOverlay, SievesOverlayRequest, StructureOverlay, StructureOverlayRequest,
};
use crate::predicate::LocStackChecker;
use crate::provider::{Mediator, ProvideError, ProvideResult, Provider, Request};
use crate::shape::{InputShape, InputShapeRequest, OutputShape, OutputShapeRequest};
use std::sync::Arc;

/// Forwards a request to `inner` only when the request location matches
#[derive(Debug, Clone)]
pub struct BoundProvider {
    checker: LocStackChecker,
    inner: Arc<dyn Provider>,
}

impl BoundProvider {
    pub fn new(checker: impl Into<LocStackChecker>, inner: Arc<dyn Provider>) -> Self {
        BoundProvider {
            checker: checker.into(),
            inner,
        }
    }

    fn applies<R: Request>(&self, mediator: &Mediator<'_>, request: &R) -> ProvideResult<()> {
        match request.loc_stack() {
            Some(loc_stack) if mediator.check(&self.checker, loc_stack)? => Ok(()),
            _ => Err(ProvideError::skip()),
        }
    }
}

macro_rules! bound_method {
    ($method:ident, $request:ty, $response:ty) => {
        fn $method(&self, mediator: &Mediator<'_>, request: &$request) -> ProvideResult<$response> {
            self.applies(mediator, request)?;
            self.inner.$method(mediator, request)
        }
    };
}

impl Provider for BoundProvider {
    bound_method!(provide_loader, LoaderRequest, Loader);
    bound_method!(provide_dumper, DumperRequest, Dumper);
    bound_method!(provide_input_shape, InputShapeRequest, InputShape);
    bound_method!(provide_output_shape, OutputShapeRequest, OutputShape);
    bound_method!(provide_input_name_layout, InputNameLayoutRequest, InputNameLayout);
    bound_method!(provide_output_name_layout, OutputNameLayoutRequest, OutputNameLayout);
    bound_method!(provide_structure_overlay, StructureOverlayRequest, StructureOverlay);
    bound_method!(provide_sieves_overlay, SievesOverlayRequest, SievesOverlay);
    bound_method!(provide_extra_overlay, ExtraOverlayRequest, ExtraOverlay);
    bound_method!(provide_coercer, CoercerRequest, Coercer);
    bound_method!(provide_linking, LinkingRequest, LinkingResult);
    bound_method!(provide_unlinked_optional_policy, UnlinkedOptionalPolicyRequest, UnlinkedOptionalPolicy);
    bound_method!(provide_converter, ConverterRequest, Converter);
}
