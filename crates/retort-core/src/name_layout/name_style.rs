//! Name styles
//!
//! Converts snake_case field ids into other conventions. Leading and
//! trailing underscores are kept as is; inner underscores become the style's
//! separator.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NameStyle {
    #[serde(rename = "lower_snake")]
    LowerSnake,
    #[serde(rename = "camel_Snake")]
    CamelSnake,
    #[serde(rename = "Pascal_Snake")]
    PascalSnake,
    #[serde(rename = "UPPER_SNAKE")]
    UpperSnake,

    #[serde(rename = "lower-kebab")]
    LowerKebab,
    #[serde(rename = "camel-Kebab")]
    CamelKebab,
    #[serde(rename = "Pascal-Kebab")]
    PascalKebab,
    #[serde(rename = "UPPER-KEBAB")]
    UpperKebab,

    #[serde(rename = "lowercase")]
    Lower,
    #[serde(rename = "camelCase")]
    Camel,
    #[serde(rename = "PascalCase")]
    Pascal,
    #[serde(rename = "UPPERCASE")]
    Upper,

    #[serde(rename = "lower.dot")]
    LowerDot,
    #[serde(rename = "camel.Dot")]
    CamelDot,
    #[serde(rename = "Pascal.Dot")]
    PascalDot,
    #[serde(rename = "UPPER.DOT")]
    UpperDot,
}

#[derive(Clone, Copy)]
enum Case {
    Lower,
    Upper,
    Title,
}

impl Case {
    fn apply(self, word: &str) -> String {
        match self {
            Case::Lower => word.to_lowercase(),
            Case::Upper => word.to_uppercase(),
            Case::Title => title(word),
        }
    }
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest
fn title(word: &str) -> String {
    let mut result = String::with_capacity(word.len());
    let mut prev_is_alpha = false;
    for c in word.chars() {
        if prev_is_alpha {
            result.extend(c.to_lowercase());
        } else {
            result.extend(c.to_uppercase());
        }
        prev_is_alpha = c.is_alphabetic();
    }
    result
}

const ALL_STYLES: [NameStyle; 16] = [
    NameStyle::LowerSnake,
    NameStyle::CamelSnake,
    NameStyle::PascalSnake,
    NameStyle::UpperSnake,
    NameStyle::LowerKebab,
    NameStyle::CamelKebab,
    NameStyle::PascalKebab,
    NameStyle::UpperKebab,
    NameStyle::Lower,
    NameStyle::Camel,
    NameStyle::Pascal,
    NameStyle::Upper,
    NameStyle::LowerDot,
    NameStyle::CamelDot,
    NameStyle::PascalDot,
    NameStyle::UpperDot,
];

impl NameStyle {
    /// Separator, case of the first word, case of the other words
    fn conversion(self) -> (&'static str, Case, Case) {
        use NameStyle::*;
        let sep = match self {
            LowerSnake | CamelSnake | PascalSnake | UpperSnake => "_",
            LowerKebab | CamelKebab | PascalKebab | UpperKebab => "-",
            Lower | Camel | Pascal | Upper => "",
            LowerDot | CamelDot | PascalDot | UpperDot => ".",
        };
        let (first, other) = match self {
            LowerSnake | LowerKebab | Lower | LowerDot => (Case::Lower, Case::Lower),
            CamelSnake | CamelKebab | Camel | CamelDot => (Case::Lower, Case::Title),
            PascalSnake | PascalKebab | Pascal | PascalDot => (Case::Title, Case::Title),
            UpperSnake | UpperKebab | Upper | UpperDot => (Case::Upper, Case::Upper),
        };
        (sep, first, other)
    }

    pub fn as_str(self) -> &'static str {
        use NameStyle::*;
        match self {
            LowerSnake => "lower_snake",
            CamelSnake => "camel_Snake",
            PascalSnake => "Pascal_Snake",
            UpperSnake => "UPPER_SNAKE",
            LowerKebab => "lower-kebab",
            CamelKebab => "camel-Kebab",
            PascalKebab => "Pascal-Kebab",
            UpperKebab => "UPPER-KEBAB",
            Lower => "lowercase",
            Camel => "camelCase",
            Pascal => "PascalCase",
            Upper => "UPPERCASE",
            LowerDot => "lower.dot",
            CamelDot => "camel.Dot",
            PascalDot => "Pascal.Dot",
            UpperDot => "UPPER.DOT",
        }
    }
}

impl fmt::Display for NameStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NameStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ALL_STYLES
            .into_iter()
            .find(|style| style.as_str() == s)
            .ok_or_else(|| Error::InvalidValue {
                message: format!("unknown name style {:?}", s),
            })
    }
}

pub fn is_snake_style(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Convert a snake_case name into `style`
pub fn convert_snake_style(name: &str, style: NameStyle) -> Result<String> {
    if !is_snake_style(name) {
        return Err(Error::NameStyleMismatch {
            name: name.to_string(),
            style: style.to_string(),
        });
    }

    let body = name.trim_start_matches('_');
    let front = &name[..name.len() - body.len()];
    let core = body.trim_end_matches('_');
    let trailing = &body[core.len()..];
    if core.is_empty() {
        return Ok(name.to_string());
    }

    let (sep, first_case, other_case) = style.conversion();
    let first_end = core.find('_').unwrap_or(core.len());
    let mut result = String::with_capacity(name.len());
    result.push_str(front);
    result.push_str(&first_case.apply(&core[..first_end]));

    let mut rest = &core[first_end..];
    while !rest.is_empty() {
        let word = rest.trim_start_matches('_');
        let underscores = rest.len() - word.len();
        result.push_str(&sep.repeat(underscores));
        let word_end = word.find('_').unwrap_or(word.len());
        result.push_str(&other_case.apply(&word[..word_end]));
        rest = &word[word_end..];
    }

    result.push_str(trailing);
    Ok(result)
}
