//! Dump-time errors

use crate::morphing::trail::{Trail, TrailElement};
use crate::provider::StubFailure;
use crate::shape::AccessFailure;
use std::fmt;
use thiserror::Error;

/// What went wrong while dumping
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DumpErrorKind {
    /// A value that only marks absence reached a place where it cannot be omitted
    #[error("Cannot dump sentinel {sentinel_type}")]
    Sentinel { sentinel_type: String },

    #[error("Expected {expected}, got {actual}")]
    Type { expected: String, actual: String },

    #[error("Cannot read field: {failure}")]
    Access { failure: AccessFailure },

    #[error("Extra data overwrites fields {keys:?}")]
    ExtraCollision { keys: Vec<String> },

    #[error("{message}: [{}]", .errors.iter().map(DumpError::to_string).collect::<Vec<_>>().join("; "))]
    Aggregate { message: String, errors: Vec<DumpError> },

    #[error("{message}")]
    Custom { message: String },

    #[error("{request}")]
    RecursionAborted { request: String },
}

/// Error raised by a dumper, with the trail to the failing value
#[derive(Debug, Clone, PartialEq)]
pub struct DumpError {
    pub kind: DumpErrorKind,
    pub trail: Trail,
}

impl DumpError {
    pub fn new(kind: DumpErrorKind) -> Self {
        DumpError {
            kind,
            trail: Trail::new(),
        }
    }

    pub fn msg(message: impl Into<String>) -> Self {
        DumpError::new(DumpErrorKind::Custom {
            message: message.into(),
        })
    }

    pub fn type_error(expected: impl fmt::Display, actual: impl fmt::Display) -> Self {
        DumpError::new(DumpErrorKind::Type {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }

    pub fn aggregate(message: impl Into<String>, errors: Vec<DumpError>) -> Self {
        DumpError::new(DumpErrorKind::Aggregate {
            message: message.into(),
            errors,
        })
    }

    /// Prepend a trail element
    pub fn at(mut self, element: TrailElement) -> Self {
        self.trail.push_front(element);
        self
    }

    /// Leaf errors with their full trails
    pub fn flatten(&self) -> Vec<DumpError> {
        match &self.kind {
            DumpErrorKind::Aggregate { errors, .. } => errors
                .iter()
                .flat_map(DumpError::flatten)
                .map(|mut leaf| {
                    leaf.trail.extend_front(&self.trail);
                    leaf
                })
                .collect(),
            _ => vec![self.clone()],
        }
    }
}

impl fmt::Display for DumpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.trail.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{} at {}", self.kind, self.trail)
        }
    }
}

impl std::error::Error for DumpError {}

impl From<AccessFailure> for DumpError {
    fn from(failure: AccessFailure) -> Self {
        DumpError::new(DumpErrorKind::Access { failure })
    }
}

impl From<StubFailure> for DumpError {
    fn from(failure: StubFailure) -> Self {
        DumpError::new(DumpErrorKind::RecursionAborted {
            request: failure.to_string(),
        })
    }
}
