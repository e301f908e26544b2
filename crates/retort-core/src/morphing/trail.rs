//! Error trails
//!
//! A trail is the structural path from the top-level value to the place an
//! error was raised. Elements are prepended while the error travels up
//! through the enclosing loaders and dumpers.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How much trail information produced callables collect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugTrail {
    /// Raise the first error, without a trail
    Disable,
    /// Raise the first error with its trail
    First,
    /// Collect every error of a container into an aggregate
    #[default]
    All,
}

impl DebugTrail {
    pub fn keeps_trail(self) -> bool {
        self != DebugTrail::Disable
    }
}

impl std::str::FromStr for DebugTrail {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "disable" => Ok(DebugTrail::Disable),
            "first" => Ok(DebugTrail::First),
            "all" => Ok(DebugTrail::All),
            other => Err(format!("unknown debug trail mode {:?} (expected disable, first or all)", other)),
        }
    }
}

/// One step of a trail
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrailElement {
    /// Key of a mapping
    Key(Value),
    /// Position in a sequence
    Index(usize),
    /// Attribute of a model
    Attr(String),
}

impl TrailElement {
    pub fn key(key: impl Into<Value>) -> Self {
        TrailElement::Key(key.into())
    }

    pub fn attr(name: impl Into<String>) -> Self {
        TrailElement::Attr(name.into())
    }
}

impl fmt::Display for TrailElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrailElement::Key(Value::Str(key)) => write!(f, "{:?}", key),
            TrailElement::Key(key) => write!(f, "{}", key),
            TrailElement::Index(index) => write!(f, "{}", index),
            TrailElement::Attr(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Trail(Vec<TrailElement>);

impl Trail {
    pub fn new() -> Self {
        Trail(Vec::new())
    }

    pub fn push_front(&mut self, element: TrailElement) {
        self.0.insert(0, element);
    }

    /// Prepend every element of `outer`
    pub fn extend_front(&mut self, outer: &Trail) {
        self.0.splice(0..0, outer.0.iter().cloned());
    }

    pub fn elements(&self) -> &[TrailElement] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<TrailElement>> for Trail {
    fn from(elements: Vec<TrailElement>) -> Self {
        Trail(elements)
    }
}

impl<const N: usize> From<[TrailElement; N]> for Trail {
    fn from(elements: [TrailElement; N]) -> Self {
        Trail(elements.into())
    }
}

impl fmt::Display for Trail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for element in &self.0 {
            match element {
                TrailElement::Key(Value::Str(key)) => write!(f, ".{}", key)?,
                TrailElement::Attr(name) => write!(f, ".{}", name)?,
                TrailElement::Index(index) => write!(f, "[{}]", index)?,
                TrailElement::Key(key) => write!(f, "[{}]", key)?,
            }
        }
        Ok(())
    }
}
