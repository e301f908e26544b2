//! Engine settings
//!
//! A retort's settings are fixed at construction. `RetortConfig` is the
//! serialisable part of them, so the same settings can come from a file.

use crate::morphing::DebugTrail;
use serde::{Deserialize, Serialize};

/// Serialisable retort settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetortConfig {
    /// Reject inputs that would need a lossy or implicit coercion
    pub strict_coercion: bool,

    /// How much error context produced callables collect
    pub debug_trail: DebugTrail,
}

impl Default for RetortConfig {
    fn default() -> Self {
        Self {
            strict_coercion: true,
            debug_trail: DebugTrail::All,
        }
    }
}

impl RetortConfig {
    pub fn strict_coercion(mut self, strict: bool) -> Self {
        self.strict_coercion = strict;
        self
    }

    pub fn debug_trail(mut self, debug_trail: DebugTrail) -> Self {
        self.debug_trail = debug_trail;
        self
    }
}
