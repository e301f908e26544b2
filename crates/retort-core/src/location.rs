//! Request locations
//!
//! A [`Loc`] identifies the site a request concerns: a bare type hint, a model
//! field (seen from the input side, the output side, or neither), or a
//! generic parameter of an enclosing type. A [`LocStack`] stacks the sites from
//! the top-level type down to the current one; it is the key predicates match
//! against and the trail rebuilt in diagnostics.

use crate::shape::{Accessor, FieldDefault, InputField, Metadata, OutputField};
use crate::types::TypeExpr;
use std::fmt;

/// Facets a location can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocKind {
    TypeHint,
    Field,
    InputField,
    OutputField,
    GenericParam,
}

/// The site a request concerns
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Loc {
    TypeHint {
        ty: TypeExpr,
    },
    Field {
        ty: TypeExpr,
        field_id: String,
        default: FieldDefault,
        metadata: Metadata,
    },
    InputField {
        ty: TypeExpr,
        field_id: String,
        default: FieldDefault,
        metadata: Metadata,
        is_required: bool,
    },
    OutputField {
        ty: TypeExpr,
        field_id: String,
        default: FieldDefault,
        metadata: Metadata,
        accessor: Accessor,
    },
    GenericParam {
        ty: TypeExpr,
        pos: usize,
    },
}

impl Loc {
    pub fn type_hint(ty: impl Into<TypeExpr>) -> Self {
        Loc::TypeHint { ty: ty.into() }
    }

    pub fn field(field_id: impl Into<String>, ty: impl Into<TypeExpr>) -> Self {
        Loc::Field {
            ty: ty.into(),
            field_id: field_id.into(),
            default: FieldDefault::NoDefault,
            metadata: Metadata::default(),
        }
    }

    pub fn input_field(field: &InputField) -> Self {
        Loc::InputField {
            ty: field.ty.clone(),
            field_id: field.id.clone(),
            default: field.default.clone(),
            metadata: field.metadata.clone(),
            is_required: field.is_required,
        }
    }

    pub fn output_field(field: &OutputField) -> Self {
        Loc::OutputField {
            ty: field.ty.clone(),
            field_id: field.id.clone(),
            default: field.default.clone(),
            metadata: field.metadata.clone(),
            accessor: field.accessor.clone(),
        }
    }

    pub fn generic_param(ty: impl Into<TypeExpr>, pos: usize) -> Self {
        Loc::GenericParam { ty: ty.into(), pos }
    }

    pub fn ty(&self) -> &TypeExpr {
        match self {
            Loc::TypeHint { ty }
            | Loc::Field { ty, .. }
            | Loc::InputField { ty, .. }
            | Loc::OutputField { ty, .. }
            | Loc::GenericParam { ty, .. } => ty,
        }
    }

    pub fn field_id(&self) -> Option<&str> {
        match self {
            Loc::Field { field_id, .. } | Loc::InputField { field_id, .. } | Loc::OutputField { field_id, .. } => {
                Some(field_id)
            }
            _ => None,
        }
    }

    pub fn default(&self) -> Option<&FieldDefault> {
        match self {
            Loc::Field { default, .. } | Loc::InputField { default, .. } | Loc::OutputField { default, .. } => {
                Some(default)
            }
            _ => None,
        }
    }

    pub fn generic_pos(&self) -> Option<usize> {
        match self {
            Loc::GenericParam { pos, .. } => Some(*pos),
            _ => None,
        }
    }

    pub fn has(&self, kind: LocKind) -> bool {
        match kind {
            LocKind::TypeHint => true,
            LocKind::Field => self.field_id().is_some(),
            LocKind::InputField => matches!(self, Loc::InputField { .. }),
            LocKind::OutputField => matches!(self, Loc::OutputField { .. }),
            LocKind::GenericParam => matches!(self, Loc::GenericParam { .. }),
        }
    }

    /// Same site with another type
    pub fn with_type(&self, new_ty: TypeExpr) -> Self {
        let mut loc = self.clone();
        match &mut loc {
            Loc::TypeHint { ty }
            | Loc::Field { ty, .. }
            | Loc::InputField { ty, .. }
            | Loc::OutputField { ty, .. }
            | Loc::GenericParam { ty, .. } => *ty = new_ty,
        }
        loc
    }
}

/// Stack of locations from the top-level type to the current site
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct LocStack(Vec<Loc>);

impl LocStack {
    pub fn new(root: Loc) -> Self {
        LocStack(vec![root])
    }

    pub fn from_type(ty: impl Into<TypeExpr>) -> Self {
        LocStack::new(Loc::type_hint(ty))
    }

    pub fn append(&self, loc: Loc) -> Self {
        let mut locs = self.0.clone();
        locs.push(loc);
        LocStack(locs)
    }

    /// Replace the type of the last location
    pub fn replace_last_type(&self, ty: TypeExpr) -> Self {
        let mut locs = self.0.clone();
        if let Some(last) = locs.last_mut() {
            *last = last.with_type(ty);
        }
        LocStack(locs)
    }

    pub fn last(&self) -> Option<&Loc> {
        self.0.last()
    }

    /// Type of the last location, `Any` for an empty stack
    pub fn last_type(&self) -> &TypeExpr {
        self.0.last().map(Loc::ty).unwrap_or(&TypeExpr::Any)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Loc> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Loc> {
        self.0.iter()
    }

    /// Stack without the last `n` locations
    pub fn prefix(&self, drop_last: usize) -> LocStack {
        LocStack(self.0[..self.0.len().saturating_sub(drop_last)].to_vec())
    }

    /// True when the last location already appears earlier in the stack
    pub fn is_recursive(&self) -> bool {
        match self.0.split_last() {
            Some((last, rest)) => rest.contains(last),
            None => false,
        }
    }

    /// Human readable description of the current site
    pub fn describe(&self) -> String {
        let Some(last) = self.0.last() else {
            return String::new();
        };
        let owner = self.0.len().checked_sub(2).and_then(|i| self.0.get(i)).map(Loc::ty);
        match (last, owner) {
            (Loc::GenericParam { ty, pos }, Some(owner)) => format!("{}[{}]: {}", owner, pos, ty),
            (loc, Some(owner)) if loc.field_id().is_some() => {
                format!("{}.{}: {}", owner, loc.field_id().unwrap_or_default(), loc.ty())
            }
            (loc, _) => loc.ty().to_string(),
        }
    }
}

impl fmt::Display for LocStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recursion_detection() {
        let field = Loc::field("next", TypeExpr::named("Node"));
        let stack = LocStack::from_type(TypeExpr::named("Node")).append(field.clone());
        assert!(!stack.is_recursive());
        let stack = stack.append(Loc::generic_param(TypeExpr::named("Node"), 0)).append(field);
        assert!(stack.is_recursive());
    }

    #[test]
    fn test_facets() {
        let loc = Loc::field("title", TypeExpr::str());
        assert!(loc.has(LocKind::Field));
        assert!(loc.has(LocKind::TypeHint));
        assert!(!loc.has(LocKind::InputField));
        assert!(!Loc::type_hint(TypeExpr::int()).has(LocKind::Field));
    }

    #[test]
    fn test_describe() {
        let stack = LocStack::from_type(TypeExpr::named("Book")).append(Loc::field("author", TypeExpr::named("Person")));
        assert_eq!(stack.describe(), "Book.author: Person");
        let stack = stack.replace_last_type(TypeExpr::str());
        assert_eq!(stack.last_type(), &TypeExpr::str());
        assert_eq!(stack.prefix(1).describe(), "Book");
    }
}
