//! Error types and handling for the CLI
//!
//! This module provides error types and utilities for handling
//! various failure modes in the CLI application.

use std::io;
use std::path::PathBuf;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for CLI operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Build-time or run-time error from retort-core
    #[error("{0}")]
    Core(#[from] retort_core::Error),

    /// File not found
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Invalid file format
    #[error("Invalid file format for {}: expected {} format", path.display(), expected)]
    InvalidFormat { path: PathBuf, expected: String },

    /// Invalid model declaration
    #[error("Invalid model declaration {name}: {message}")]
    InvalidModel { name: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Some checks failed
    #[error("{failed} of {total} type(s) failed the check")]
    CheckFailed { failed: usize, total: usize },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML deserialization error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Error with context attached at the binary edge
    #[error(transparent)]
    Context(#[from] anyhow::Error),

    /// Generic error with context
    #[error("{message}")]
    Other { message: String },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an invalid model error
    pub fn invalid_model(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidModel {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a generic error with message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) => 1,
            Self::Core(err) if err.is_runtime() => 2,
            Self::Core(_) => 3,
            Self::FileNotFound { .. } => 4,
            Self::InvalidFormat { .. } => 5,
            Self::InvalidModel { .. } => 6,
            Self::Config(_) => 7,
            Self::CheckFailed { .. } => 8,
            Self::Json(_) => 12,
            Self::Yaml(_) => 13,
            Self::Toml(_) => 14,
            Self::Context(_) => 98,
            Self::Other { .. } => 99,
        }
    }

    /// Check if this error should display usage help
    pub fn should_show_help(&self) -> bool {
        matches!(self, Self::InvalidFormat { .. })
    }
}

/// Format an error for display to the user
pub fn format_error(error: &Error, use_color: bool) -> String {
    let message = match error {
        Error::Context(err) => format!("{:#}", err),
        other => other.to_string(),
    };
    if use_color {
        use colored::Colorize;
        format!("{} {}", "Error:".red().bold(), message)
    } else {
        format!("Error: {}", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retort_core::LoadError;

    #[test]
    fn test_exit_codes_split_build_and_runtime() {
        let runtime = Error::Core(retort_core::Error::from(LoadError::msg("bad")));
        assert_eq!(runtime.exit_code(), 2);
        let build = Error::Core(retort_core::Error::ProviderNotFound {
            request: "loader for type Book".to_string(),
            notes: Vec::new(),
        });
        assert_eq!(build.exit_code(), 3);
    }

    #[test]
    fn test_format_error_with_context_chain() {
        let err = Error::from(anyhow::anyhow!("missing file").context("Cannot read input"));
        assert_eq!(format_error(&err, false), "Error: Cannot read input: missing file");
    }

    #[test]
    fn test_format_error_plain() {
        let err = Error::invalid_model("Book", "unknown kind");
        assert_eq!(format_error(&err, false), "Error: Invalid model declaration Book: unknown kind");
    }
}
