//! Declarative predicate builder
//!
//! `P::ty(book).then(P::field("title"))` matches the `title` field of `Book`;
//! `P::field("title")` alone matches that field of any model.

use crate::location::LocKind;
use crate::predicate::LocStackChecker;
use crate::types::TypeExpr;
use crate::Result;

/// Entry point of the builder
#[derive(Debug, Clone, Copy)]
pub struct P;

impl P {
    /// Any location
    pub fn any() -> Pattern {
        Pattern::step(LocStackChecker::Any)
    }

    /// Locations of a type (a bare class also matches its subclasses)
    pub fn ty(ty: impl Into<TypeExpr>) -> Pattern {
        Pattern::step(LocStackChecker::from(ty.into()))
    }

    /// Field with this exact id
    pub fn field(name: impl Into<String>) -> Pattern {
        Pattern::step(LocStackChecker::ExactFieldName(name.into()))
    }

    /// Field whose id fully matches the regex
    pub fn field_re(pattern: &str) -> Result<Pattern> {
        Ok(Pattern::step(LocStackChecker::ReFieldName(super::FieldRegex::new(pattern)?)))
    }

    /// Textual predicate, see [`LocStackChecker::from_str_pred`]
    pub fn name(pred: &str) -> Result<Pattern> {
        Ok(Pattern::step(LocStackChecker::from_str_pred(pred)?))
    }

    /// Locations carrying a facet
    pub fn facet(kind: LocKind) -> Pattern {
        Pattern::step(LocStackChecker::HasFacet(kind))
    }

    /// Wrap an arbitrary checker
    pub fn checker(checker: LocStackChecker) -> Pattern {
        Pattern::step(checker)
    }
}

/// A sequence of checkers matched against the end of the location stack
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    steps: Vec<LocStackChecker>,
}

impl Pattern {
    fn step(checker: LocStackChecker) -> Self {
        Pattern { steps: vec![checker] }
    }

    /// Append the steps of `next`, matched deeper in the stack
    pub fn then(mut self, next: Pattern) -> Self {
        self.steps.extend(next.steps);
        self
    }

    /// Shortcut for `.then(P::field(name))`
    pub fn field(self, name: impl Into<String>) -> Self {
        self.then(P::field(name))
    }

    /// Shortcut for `.then(P::ty(ty))`
    pub fn ty(self, ty: impl Into<TypeExpr>) -> Self {
        self.then(P::ty(ty))
    }

    /// Match the generic argument at `pos` with `pred`
    pub fn generic_arg(mut self, pos: usize, pred: Pattern) -> Self {
        self.steps.push(LocStackChecker::GenericParam(pos) & pred.build());
        self
    }

    /// Restrict the last step further
    pub fn and(mut self, checker: LocStackChecker) -> Self {
        if let Some(last) = self.steps.pop() {
            self.steps.push(last & checker);
        }
        self
    }

    pub fn build(mut self) -> LocStackChecker {
        if self.steps.len() == 1 {
            self.steps.remove(0)
        } else {
            LocStackChecker::EndPattern(self.steps)
        }
    }
}
