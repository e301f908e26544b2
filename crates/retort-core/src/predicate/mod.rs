//! Request predicates
//!
//! A [`LocStackChecker`] decides whether a provider applies to a request by
//! looking at the request's location stack. Leaf checkers inspect the last
//! location; [`LocStackChecker::EndPattern`] matches several trailing
//! locations at once. Checkers are plain hashable values so the mediator can
//! memoise their results, and they compose with `&`, `|`, `^` and `!`.

pub mod pattern;

pub use pattern::{Pattern, P};

use crate::location::{LocKind, LocStack};
use crate::provider::Mediator;
use crate::types::{ClassRef, Origin, Prim, TypeExpr};
use crate::{Error, Result};
use regex::Regex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// Full-match field name regex, compared by pattern text
#[derive(Clone)]
pub struct FieldRegex(Regex);

impl FieldRegex {
    pub fn new(pattern: &str) -> Result<Self> {
        Regex::new(&format!("^(?:{})$", pattern))
            .map(FieldRegex)
            .map_err(|e| Error::InvalidPredicate {
                message: format!("bad field name regex {:?}: {}", pattern, e),
            })
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.0.is_match(name)
    }
}

impl PartialEq for FieldRegex {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

impl Eq for FieldRegex {}

impl Hash for FieldRegex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_str().hash(state);
    }
}

impl fmt::Debug for FieldRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "re({:?})", self.0.as_str())
    }
}

/// Predicate over a location stack
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LocStackChecker {
    Any,
    ExactFieldName(String),
    ReFieldName(FieldRegex),
    /// Normalised type equality; a bare class matches its subclasses too
    ExactType(TypeExpr),
    ExactOrigin(Origin),
    OriginSubclass(ClassRef),
    /// The location is the generic argument at this position
    GenericParam(usize),
    HasFacet(LocKind),
    /// The type is a variadic tuple
    VarTuple,
    And(Vec<LocStackChecker>),
    Or(Vec<LocStackChecker>),
    Xor(Box<LocStackChecker>, Box<LocStackChecker>),
    Not(Box<LocStackChecker>),
    /// Each step matches the stack truncated to its position, the last step
    /// matching the whole stack
    EndPattern(Vec<LocStackChecker>),
}

impl LocStackChecker {
    /// Build a checker from a textual field predicate: an identifier is an
    /// exact field name, anything else a full-match regex
    pub fn from_str_pred(pred: &str) -> Result<Self> {
        let is_identifier = pred
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_')
            && pred.chars().all(|c| c.is_alphanumeric() || c == '_');
        if is_identifier {
            Ok(LocStackChecker::ExactFieldName(pred.to_string()))
        } else {
            FieldRegex::new(pred).map(LocStackChecker::ReFieldName)
        }
    }

    /// Evaluate against `loc_stack`; use [`Mediator::check`] for the memoised form
    pub fn evaluate(&self, mediator: &Mediator<'_>, loc_stack: &LocStack) -> Result<bool> {
        let Some(last) = loc_stack.last() else {
            return Ok(false);
        };
        match self {
            LocStackChecker::Any => Ok(true),
            LocStackChecker::ExactFieldName(name) => Ok(last.field_id() == Some(name.as_str())),
            LocStackChecker::ReFieldName(re) => Ok(last.field_id().is_some_and(|id| re.is_match(id))),
            LocStackChecker::ExactType(expected) => {
                let expected = mediator.normalize(expected)?;
                let actual = mediator.normalize(last.ty())?;
                match expected.class() {
                    Some(class) if is_bare(&expected) => Ok(actual.is_subclass_of(class)),
                    _ => Ok(expected == actual),
                }
            }
            LocStackChecker::ExactOrigin(origin) => Ok(mediator.normalize(last.ty())?.origin() == origin),
            LocStackChecker::OriginSubclass(class) => Ok(mediator.normalize(last.ty())?.is_subclass_of(class)),
            LocStackChecker::GenericParam(pos) => Ok(last.generic_pos() == Some(*pos)),
            LocStackChecker::HasFacet(kind) => Ok(last.has(*kind)),
            LocStackChecker::VarTuple => Ok(mediator.normalize(last.ty())?.origin() == &Origin::VarTuple),
            LocStackChecker::And(checkers) => {
                for checker in checkers {
                    if !checker.evaluate(mediator, loc_stack)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            LocStackChecker::Or(checkers) => {
                for checker in checkers {
                    if checker.evaluate(mediator, loc_stack)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            LocStackChecker::Xor(left, right) => {
                Ok(left.evaluate(mediator, loc_stack)? != right.evaluate(mediator, loc_stack)?)
            }
            LocStackChecker::Not(inner) => Ok(!inner.evaluate(mediator, loc_stack)?),
            LocStackChecker::EndPattern(steps) => {
                if steps.len() > loc_stack.len() {
                    return Ok(false);
                }
                for (offset, step) in steps.iter().rev().enumerate() {
                    if !step.evaluate(mediator, &loc_stack.prefix(offset))? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }
}

fn is_bare(norm: &crate::types::NormType) -> bool {
    norm.type_args().all(|arg| matches!(arg.origin(), Origin::Var(_)))
}

impl From<TypeExpr> for LocStackChecker {
    fn from(ty: TypeExpr) -> Self {
        match ty {
            TypeExpr::Class(class) if !class.is_generic() => LocStackChecker::OriginSubclass(class),
            TypeExpr::Prim(prim) => LocStackChecker::ExactOrigin(Origin::Prim(prim)),
            other => LocStackChecker::ExactType(other),
        }
    }
}

impl From<&ClassRef> for LocStackChecker {
    fn from(class: &ClassRef) -> Self {
        LocStackChecker::from(TypeExpr::from(class))
    }
}

impl From<ClassRef> for LocStackChecker {
    fn from(class: ClassRef) -> Self {
        LocStackChecker::from(TypeExpr::Class(class))
    }
}

impl From<Prim> for LocStackChecker {
    fn from(prim: Prim) -> Self {
        LocStackChecker::ExactOrigin(Origin::Prim(prim))
    }
}

impl From<Origin> for LocStackChecker {
    fn from(origin: Origin) -> Self {
        LocStackChecker::ExactOrigin(origin)
    }
}

impl From<Pattern> for LocStackChecker {
    fn from(pattern: Pattern) -> Self {
        pattern.build()
    }
}

impl BitAnd for LocStackChecker {
    type Output = LocStackChecker;

    fn bitand(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (LocStackChecker::And(mut left), LocStackChecker::And(right)) => {
                left.extend(right);
                LocStackChecker::And(left)
            }
            (LocStackChecker::And(mut left), rhs) => {
                left.push(rhs);
                LocStackChecker::And(left)
            }
            (lhs, rhs) => LocStackChecker::And(vec![lhs, rhs]),
        }
    }
}

impl BitOr for LocStackChecker {
    type Output = LocStackChecker;

    fn bitor(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (LocStackChecker::Or(mut left), LocStackChecker::Or(right)) => {
                left.extend(right);
                LocStackChecker::Or(left)
            }
            (LocStackChecker::Or(mut left), rhs) => {
                left.push(rhs);
                LocStackChecker::Or(left)
            }
            (lhs, rhs) => LocStackChecker::Or(vec![lhs, rhs]),
        }
    }
}

impl BitXor for LocStackChecker {
    type Output = LocStackChecker;

    fn bitxor(self, rhs: Self) -> Self::Output {
        LocStackChecker::Xor(Box::new(self), Box::new(rhs))
    }
}

impl Not for LocStackChecker {
    type Output = LocStackChecker;

    fn not(self) -> Self::Output {
        match self {
            LocStackChecker::Not(inner) => *inner,
            other => LocStackChecker::Not(Box::new(other)),
        }
    }
}
