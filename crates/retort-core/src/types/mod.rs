//! Type descriptions and their canonical form
//!
//! - [`expr`] - the user-facing [`TypeExpr`] vocabulary
//! - [`class`] - user class declarations ([`ClassDef`], [`ClassRef`], [`Namespace`])
//! - [`norm`] - the type normaliser producing hashable [`NormType`] values
//! - [`parse`] - the textual form (`"Optional[list[Book]]"`)

pub mod class;
pub mod expr;
pub mod norm;
pub mod parse;

pub use class::{
    ClassBuilder, ClassDef, ClassKind, ClassRef, EnumDef, EnumMember, Namespace, NamedTupleDef,
    NamedTupleField, OpaqueDef, RecordDef, RecordField, TypedDictDef, TypedDictField,
};
pub use expr::{NewTypeDef, Prim, TypeExpr, TypeTag, TypeVar, Variance};
pub use norm::{normalize_type, Marker, NormArg, NormType, Origin};
