//! Error types for the retort core library
//!
//! Build-time failures (a loader, dumper or converter could not be produced)
//! are reported through [`Error`]. The callables produced by a retort fail
//! with their own run-time errors: [`LoadError`], [`DumpError`] and
//! [`ConversionError`], which this module wraps transparently so the one-shot
//! helpers (`Retort::load`, `Retort::dump`, `Retort::convert`) can share a
//! single result type.

use crate::conversion::ConversionError;
use crate::morphing::{DumpError, LoadError};
use thiserror::Error;

/// Main error type for retort operations
#[derive(Error, Debug)]
pub enum Error {
    /// No provider in the recipe could answer a request
    #[error("Cannot produce {request}{}", render_notes(.notes))]
    ProviderNotFound { request: String, notes: Vec<String> },

    /// The name-layout planner refused a mapping
    #[error("Name layout error: {reason}{}", render_notes(.details))]
    NameLayout { reason: String, details: Vec<String> },

    /// A type expression could not be normalised
    #[error("Cannot normalise type: {hint}")]
    TypeNormalisation { hint: String },

    /// A field identifier is not written in snake case
    #[error("Field {name:?} cannot be converted to {style}: it is not a snake_case identifier")]
    NameStyleMismatch { name: String, style: String },

    /// The outer build of a recursive type failed
    #[error("Recursive {request} was aborted because the outer build failed")]
    RecursionAborted { request: String },

    /// `dump` without a type was given a value whose type cannot be inferred
    #[error("Cannot infer type of {value_type}: pass the type explicitly")]
    GenericInference { value_type: String },

    /// A model declaration violates the shape rules
    #[error("Invalid shape: {message}")]
    InvalidShape { message: String },

    /// A predicate could not be built
    #[error("Invalid predicate: {message}")]
    InvalidPredicate { message: String },

    /// A value cannot cross the wire edge
    #[error("Invalid value: {message}")]
    InvalidValue { message: String },

    /// Loading failed
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Dumping failed
    #[error(transparent)]
    Dump(#[from] DumpError),

    /// Conversion failed
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

fn render_notes(notes: &[String]) -> String {
    notes.iter().map(|note| format!("\n{}", note)).collect()
}

impl Error {
    pub fn name_layout(reason: impl Into<String>) -> Self {
        Error::NameLayout {
            reason: reason.into(),
            details: Vec::new(),
        }
    }

    pub fn invalid_shape(message: impl Into<String>) -> Self {
        Error::InvalidShape {
            message: message.into(),
        }
    }

    pub fn normalisation(hint: impl Into<String>) -> Self {
        Error::TypeNormalisation { hint: hint.into() }
    }

    /// True for errors raised while running a produced callable
    pub fn is_runtime(&self) -> bool {
        matches!(self, Error::Load(_) | Error::Dump(_) | Error::Conversion(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::TypeNormalisation {
            hint: "unknown name 'Foo'".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot normalise type: unknown name 'Foo'");
    }

    #[test]
    fn test_provider_not_found_renders_notes() {
        let err = Error::ProviderNotFound {
            request: "loader for type Book".to_string(),
            notes: vec!["  Location: `Book`".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Cannot produce loader for type Book\n  Location: `Book`"
        );
    }

    #[test]
    fn test_runtime_classification() {
        let err = Error::from(LoadError::msg("boom"));
        assert!(err.is_runtime());
        assert!(!Error::name_layout("dup").is_runtime());
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: Error = anyhow::anyhow!("broken").into();
        assert!(matches!(err, Error::Internal { .. }));
    }
}
