//! Load-time errors

use crate::morphing::trail::{Trail, TrailElement};
use crate::provider::StubFailure;
use crate::value::Value;
use std::fmt;
use thiserror::Error;

/// What went wrong while loading
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadErrorKind {
    #[error("Expected {expected}, got {}", .input_value.type_name())]
    Type { expected: String, input_value: Value },

    /// The value's category is explicitly refused (e.g. a string where a list
    /// is expected under strict coercion)
    #[error("{excluded} is not accepted as {expected}")]
    ExcludedType {
        expected: String,
        excluded: String,
        input_value: Value,
    },

    #[error("{message}: {input_value}")]
    Value { message: String, input_value: Value },

    #[error("{message}: {input_value}")]
    Validation { message: String, input_value: Value },

    #[error("Bad variant {input_value}, allowed: {}", join(.allowed))]
    BadVariant { allowed: Vec<Value>, input_value: Value },

    #[error("Bad variants {}, allowed: {}", join(.invalid_variants), join(.allowed))]
    MultipleBadVariant {
        allowed: Vec<Value>,
        invalid_variants: Vec<Value>,
        input_value: Value,
    },

    #[error("{input_value} does not match format {format:?}")]
    FormatMismatch { format: String, input_value: Value },

    #[error("{input_value} is out of range [{}, {}]", bound(.min), bound(.max))]
    OutOfRange {
        min: Option<Value>,
        max: Option<Value>,
        input_value: Value,
    },

    #[error("Unexpected fields {fields:?}")]
    ExtraFields { fields: Vec<String>, input_value: Value },

    #[error("Too many items, expected {expected_len}")]
    ExtraItems { expected_len: usize, input_value: Value },

    #[error("Required fields {fields:?} are missing")]
    NoRequiredFields { fields: Vec<String>, input_value: Value },

    #[error("Not enough items, expected {expected_len}")]
    NoRequiredItems { expected_len: usize, input_value: Value },

    #[error("No variant of {expected} accepted the value: {}", join_errors(.errors))]
    Union { expected: String, errors: Vec<LoadError> },

    #[error("{message}: {}", join_errors(.errors))]
    Aggregate { message: String, errors: Vec<LoadError> },

    #[error("{request}")]
    RecursionAborted { request: String },

    #[error("{message}")]
    Custom { message: String },
}

fn join(values: &[Value]) -> String {
    let items: Vec<String> = values.iter().map(Value::to_string).collect();
    format!("[{}]", items.join(", "))
}

fn bound(value: &Option<Value>) -> String {
    value.as_ref().map_or_else(|| "-".to_string(), Value::to_string)
}

fn join_errors(errors: &[LoadError]) -> String {
    let items: Vec<String> = errors.iter().map(LoadError::to_string).collect();
    format!("[{}]", items.join("; "))
}

/// Error raised by a loader, with the trail to the failing value
#[derive(Debug, Clone, PartialEq)]
pub struct LoadError {
    pub kind: LoadErrorKind,
    pub trail: Trail,
}

impl LoadError {
    pub fn new(kind: LoadErrorKind) -> Self {
        LoadError {
            kind,
            trail: Trail::new(),
        }
    }

    pub fn msg(message: impl Into<String>) -> Self {
        LoadError::new(LoadErrorKind::Custom {
            message: message.into(),
        })
    }

    pub fn type_error(expected: impl fmt::Display, input_value: &Value) -> Self {
        LoadError::new(LoadErrorKind::Type {
            expected: expected.to_string(),
            input_value: input_value.clone(),
        })
    }

    pub fn value_error(message: impl Into<String>, input_value: &Value) -> Self {
        LoadError::new(LoadErrorKind::Value {
            message: message.into(),
            input_value: input_value.clone(),
        })
    }

    pub fn aggregate(message: impl Into<String>, errors: Vec<LoadError>) -> Self {
        LoadError::new(LoadErrorKind::Aggregate {
            message: message.into(),
            errors,
        })
    }

    /// Prepend a trail element
    pub fn at(mut self, element: TrailElement) -> Self {
        self.trail.push_front(element);
        self
    }

    /// Leaf errors with their full trails; aggregates are flattened,
    /// union errors are leaves
    pub fn flatten(&self) -> Vec<LoadError> {
        match &self.kind {
            LoadErrorKind::Aggregate { errors, .. } => errors
                .iter()
                .flat_map(LoadError::flatten)
                .map(|mut leaf| {
                    leaf.trail.extend_front(&self.trail);
                    leaf
                })
                .collect(),
            _ => vec![self.clone()],
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.trail.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{} at {}", self.kind, self.trail)
        }
    }
}

impl std::error::Error for LoadError {}

impl From<LoadErrorKind> for LoadError {
    fn from(kind: LoadErrorKind) -> Self {
        LoadError::new(kind)
    }
}

impl From<StubFailure> for LoadError {
    fn from(failure: StubFailure) -> Self {
        LoadError::new(LoadErrorKind::RecursionAborted {
            request: failure.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_trail() {
        let err = LoadError::type_error("int", &Value::str("x"))
            .at(TrailElement::Index(3))
            .at(TrailElement::key("items"));
        assert_eq!(err.to_string(), "Expected int, got str at $.items[3]");
    }

    #[test]
    fn test_flatten_concatenates_trails() {
        let inner = LoadError::aggregate(
            "while loading model Inner",
            vec![LoadError::type_error("int", &Value::None).at(TrailElement::Index(3)).at(TrailElement::key("g"))],
        )
        .at(TrailElement::key("f"));
        let outer = LoadError::aggregate("while loading model Outer", vec![inner]);
        let leaves = outer.flatten();
        assert_eq!(leaves.len(), 1);
        assert_eq!(
            leaves[0].trail.elements(),
            &[TrailElement::key("f"), TrailElement::key("g"), TrailElement::Index(3)]
        );
    }

    #[test]
    fn test_bad_variant_message() {
        let err = LoadError::new(LoadErrorKind::BadVariant {
            allowed: vec![Value::str("a"), Value::str("b")],
            input_value: Value::str("c"),
        });
        assert_eq!(err.to_string(), "Bad variant \"c\", allowed: [\"a\", \"b\"]");
    }
}
