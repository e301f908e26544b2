//! Provider-level errors
//!
//! A provider either answers a request, signals that it is not applicable
//! ([`CannotProvide`], the mediator then tries the next provider), or fails
//! fatally ([`ProvideError::Fatal`], which aborts the build).

use crate::Error;
use std::fmt;

/// "Not applicable" signal of a provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CannotProvide {
    pub message: String,
    /// Stop searching the recipe: no later provider may answer
    pub is_terminal: bool,
    /// Worth showing to the user when the whole search fails
    pub is_demonstrative: bool,
    pub notes: Vec<String>,
    pub causes: Vec<CannotProvide>,
}

impl CannotProvide {
    /// Silent skip, the usual "this request is not for me"
    pub fn skip() -> Self {
        Self::default()
    }

    /// Skip with an explanation shown in diagnostics
    pub fn new(message: impl Into<String>) -> Self {
        CannotProvide {
            message: message.into(),
            is_demonstrative: true,
            ..Self::default()
        }
    }

    /// Explanation that also stops the search
    pub fn terminal(message: impl Into<String>) -> Self {
        CannotProvide {
            message: message.into(),
            is_terminal: true,
            is_demonstrative: true,
            ..Self::default()
        }
    }

    /// Group several failures under one explanation
    pub fn aggregate(message: impl Into<String>, causes: Vec<CannotProvide>) -> Self {
        CannotProvide {
            message: message.into(),
            is_demonstrative: true,
            causes,
            ..Self::default()
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn make_terminal(mut self) -> Self {
        self.is_terminal = true;
        self
    }

    /// Indented diagnostic lines, omitting non-demonstrative branches
    pub fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if self.message.is_empty() {
            for note in &self.notes {
                lines.push(format!("  {}", note));
            }
            for cause in self.causes.iter().filter(|c| c.is_demonstrative) {
                cause.render_into(1, &mut lines);
            }
        } else {
            self.render_into(1, &mut lines);
        }
        lines
    }

    fn render_into(&self, depth: usize, lines: &mut Vec<String>) {
        let pad = "  ".repeat(depth);
        if !self.message.is_empty() {
            lines.push(format!("{}- {}", pad, self.message));
        }
        for note in &self.notes {
            lines.push(format!("{}  {}", pad, note));
        }
        for cause in self.causes.iter().filter(|c| c.is_demonstrative) {
            cause.render_into(depth + 1, lines);
        }
    }
}

impl fmt::Display for CannotProvide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "cannot provide")?;
        } else {
            write!(f, "{}", self.message)?;
        }
        for line in self.render().iter().skip(usize::from(!self.message.is_empty())) {
            write!(f, "\n{}", line)?;
        }
        Ok(())
    }
}

impl std::error::Error for CannotProvide {}

/// Outcome of a failed provider call
#[derive(Debug, thiserror::Error)]
pub enum ProvideError {
    #[error(transparent)]
    CannotProvide(#[from] CannotProvide),

    #[error(transparent)]
    Fatal(#[from] Error),
}

impl ProvideError {
    pub fn skip() -> Self {
        ProvideError::CannotProvide(CannotProvide::skip())
    }

    pub fn is_cannot_provide(&self) -> bool {
        matches!(self, ProvideError::CannotProvide(_))
    }

    /// Convert into a build error for the user, naming the failed request
    pub fn into_error(self, request: String) -> Error {
        match self {
            ProvideError::CannotProvide(e) => Error::ProviderNotFound {
                request,
                notes: e.render(),
            },
            ProvideError::Fatal(e) => e,
        }
    }
}

pub type ProvideResult<T> = std::result::Result<T, ProvideError>;
