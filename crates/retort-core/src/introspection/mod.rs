//! Model-kind introspectors
//!
//! Each introspector adapts one kind of class declaration to the neutral
//! shape vocabulary. An introspector that does not recognise a class returns
//! `Ok(None)`; a recognised but malformed declaration is an error.
//!
//! - [`record`] - dataclass-like records
//! - [`typed_dict`] - typed dictionaries
//! - [`named_tuple`] - named tuples

pub mod named_tuple;
pub mod record;
pub mod typed_dict;

pub use named_tuple::NamedTupleIntrospector;
pub use record::RecordIntrospector;
pub use typed_dict::TypedDictIntrospector;

use crate::shape::{InputShape, OutputShape};
use crate::types::{ClassRef, TypeExpr, TypeTag};
use crate::Result;
use std::fmt;
use std::sync::Arc;

pub trait Introspector: Send + Sync + fmt::Debug {
    /// Short name of the model kind, used in logs
    fn kind(&self) -> &'static str;

    fn input_shape(&self, class: &ClassRef) -> Result<Option<InputShape>>;

    fn output_shape(&self, class: &ClassRef) -> Result<Option<OutputShape>>;
}

/// Introspectors for the built-in class kinds
pub fn builtin_introspectors() -> Vec<Arc<dyn Introspector>> {
    vec![
        Arc::new(RecordIntrospector),
        Arc::new(TypedDictIntrospector),
        Arc::new(NamedTupleIntrospector),
    ]
}

/// Top-level tag of a field type, if any
fn top_tag(ty: &TypeExpr) -> Option<TypeTag> {
    match ty {
        TypeExpr::Tagged(tag, _) => Some(*tag),
        TypeExpr::Annotated(inner, _) => top_tag(inner),
        _ => None,
    }
}

/// Remove the given top-level tags, keeping annotations
fn strip_tags(ty: &TypeExpr, tags: &[TypeTag]) -> TypeExpr {
    match ty {
        TypeExpr::Tagged(tag, inner) if tags.contains(tag) => strip_tags(inner, tags),
        TypeExpr::Annotated(inner, meta) => TypeExpr::Annotated(Box::new(strip_tags(inner, tags)), meta.clone()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags() {
        let ty = TypeExpr::tagged(TypeTag::NotRequired, TypeExpr::tagged(TypeTag::ReadOnly, TypeExpr::int()));
        assert_eq!(top_tag(&ty), Some(TypeTag::NotRequired));
        assert_eq!(
            strip_tags(&ty, &[TypeTag::NotRequired, TypeTag::Required, TypeTag::ReadOnly]),
            TypeExpr::int()
        );
        assert_eq!(strip_tags(&ty, &[TypeTag::Final]), ty);
    }
}
