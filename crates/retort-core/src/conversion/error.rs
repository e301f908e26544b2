//! Conversion-time errors

use crate::morphing::{LoadError, Trail, TrailElement};
use crate::provider::StubFailure;
use crate::shape::AccessFailure;
use std::fmt;
use thiserror::Error;

/// What went wrong while converting
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionErrorKind {
    #[error("Expected {expected}, got {actual}")]
    Type { expected: String, actual: String },

    #[error("Cannot read source field: {failure}")]
    Access { failure: AccessFailure },

    /// The destination constructor refused its arguments
    #[error("Cannot construct {model}: {source}")]
    Construction { model: String, source: LoadError },

    #[error("Converter takes {expected} extra parameters, {actual} given")]
    Arity { expected: usize, actual: usize },

    #[error("{message}")]
    Custom { message: String },

    #[error("{request}")]
    RecursionAborted { request: String },
}

/// Error raised by a coercer or converter, with the trail to the failing
/// destination field
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionError {
    pub kind: ConversionErrorKind,
    pub trail: Trail,
}

impl ConversionError {
    pub fn new(kind: ConversionErrorKind) -> Self {
        ConversionError {
            kind,
            trail: Trail::new(),
        }
    }

    pub fn msg(message: impl Into<String>) -> Self {
        ConversionError::new(ConversionErrorKind::Custom {
            message: message.into(),
        })
    }

    pub fn type_error(expected: impl fmt::Display, actual: impl fmt::Display) -> Self {
        ConversionError::new(ConversionErrorKind::Type {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }

    /// Prepend a trail element
    pub fn at(mut self, element: TrailElement) -> Self {
        self.trail.push_front(element);
        self
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.trail.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{} at {}", self.kind, self.trail)
        }
    }
}

impl std::error::Error for ConversionError {}

impl From<AccessFailure> for ConversionError {
    fn from(failure: AccessFailure) -> Self {
        ConversionError::new(ConversionErrorKind::Access { failure })
    }
}

impl From<StubFailure> for ConversionError {
    fn from(failure: StubFailure) -> Self {
        ConversionError::new(ConversionErrorKind::RecursionAborted {
            request: failure.to_string(),
        })
    }
}
