//! Shape requests

use crate::location::LocStack;
use crate::provider::{Mediator, ProvideResult, Provider, Request};
use crate::shape::{InputShape, OutputShape};

/// Ask for the construction side of the type at `loc_stack`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputShapeRequest {
    pub loc_stack: LocStack,
}

/// Ask for the readout side of the type at `loc_stack`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputShapeRequest {
    pub loc_stack: LocStack,
}

impl InputShapeRequest {
    pub fn new(loc_stack: LocStack) -> Self {
        InputShapeRequest { loc_stack }
    }
}

impl OutputShapeRequest {
    pub fn new(loc_stack: LocStack) -> Self {
        OutputShapeRequest { loc_stack }
    }
}

impl Request for InputShapeRequest {
    type Response = InputShape;

    fn describe(&self) -> String {
        format!("input shape for type {}", self.loc_stack.last_type())
    }

    fn loc_stack(&self) -> Option<&LocStack> {
        Some(&self.loc_stack)
    }

    fn dispatch(&self, provider: &dyn Provider, mediator: &Mediator<'_>) -> ProvideResult<InputShape> {
        provider.provide_input_shape(mediator, self)
    }
}

impl Request for OutputShapeRequest {
    type Response = OutputShape;

    fn describe(&self) -> String {
        format!("output shape for type {}", self.loc_stack.last_type())
    }

    fn loc_stack(&self) -> Option<&LocStack> {
        Some(&self.loc_stack)
    }

    fn dispatch(&self, provider: &dyn Provider, mediator: &Mediator<'_>) -> ProvideResult<OutputShape> {
        provider.provide_output_shape(mediator, self)
    }
}
