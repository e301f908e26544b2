//! Name layout requests

use crate::location::LocStack;
use crate::name_layout::{InputNameLayout, OutputNameLayout};
use crate::provider::{Mediator, ProvideResult, Provider, Request};
use crate::shape::{InputShape, OutputShape};

/// Ask for the input crown of a model with the given shape
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputNameLayoutRequest {
    pub loc_stack: LocStack,
    pub shape: InputShape,
}

/// Ask for the output crown of a model with the given shape
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputNameLayoutRequest {
    pub loc_stack: LocStack,
    pub shape: OutputShape,
}

impl InputNameLayoutRequest {
    pub fn new(loc_stack: LocStack, shape: InputShape) -> Self {
        InputNameLayoutRequest { loc_stack, shape }
    }
}

impl OutputNameLayoutRequest {
    pub fn new(loc_stack: LocStack, shape: OutputShape) -> Self {
        OutputNameLayoutRequest { loc_stack, shape }
    }
}

impl Request for InputNameLayoutRequest {
    type Response = InputNameLayout;

    fn describe(&self) -> String {
        format!("input name layout for type {}", self.loc_stack.last_type())
    }

    fn loc_stack(&self) -> Option<&LocStack> {
        Some(&self.loc_stack)
    }

    fn dispatch(&self, provider: &dyn Provider, mediator: &Mediator<'_>) -> ProvideResult<InputNameLayout> {
        provider.provide_input_name_layout(mediator, self)
    }
}

impl Request for OutputNameLayoutRequest {
    type Response = OutputNameLayout;

    fn describe(&self) -> String {
        format!("output name layout for type {}", self.loc_stack.last_type())
    }

    fn loc_stack(&self) -> Option<&LocStack> {
        Some(&self.loc_stack)
    }

    fn dispatch(&self, provider: &dyn Provider, mediator: &Mediator<'_>) -> ProvideResult<OutputNameLayout> {
        provider.provide_output_name_layout(mediator, self)
    }
}
