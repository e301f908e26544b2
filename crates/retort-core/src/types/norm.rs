//! Type normaliser
//!
//! Canonicalises a [`TypeExpr`] into a [`NormType`]: an origin plus ordered
//! arguments. Metadata-only wrappers are stripped and kept as markers, nullable
//! forms become unions with `None`, unions are flattened, deduplicated and
//! sorted, forward references are resolved through the namespace. Two
//! normalised types are equal iff their origins and arguments are equal.
//!
//! Copyright (c) 2025 Retort Team
//! Licensed under the Apache-2.0 license

use crate::types::{ClassRef, Namespace, NewTypeDef, Prim, TypeExpr, TypeTag, TypeVar};
use crate::value::Value;
use crate::{Error, Result};
use std::fmt;
use std::hash::{Hash, Hasher};

const MAX_ALIAS_DEPTH: usize = 64;

/// Type constructor identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    Any,
    None,
    Prim(Prim),
    Class(ClassRef),
    SelfType,
    List,
    Set,
    FrozenSet,
    Sequence,
    Dict,
    Mapping,
    Tuple,
    VarTuple,
    Union,
    Literal,
    Var(TypeVar),
    NewType(NewTypeDef),
}

impl Origin {
    /// True for origins whose values are produced by iterating
    pub fn is_iterable(&self) -> bool {
        matches!(
            self,
            Origin::List | Origin::Set | Origin::FrozenSet | Origin::Sequence | Origin::VarTuple
        )
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Any => write!(f, "Any"),
            Origin::None => write!(f, "None"),
            Origin::Prim(p) => write!(f, "{}", p.name()),
            Origin::Class(c) => write!(f, "{}", c.qualified_name()),
            Origin::SelfType => write!(f, "Self"),
            Origin::List => write!(f, "list"),
            Origin::Set => write!(f, "set"),
            Origin::FrozenSet => write!(f, "frozenset"),
            Origin::Sequence => write!(f, "Sequence"),
            Origin::Dict => write!(f, "dict"),
            Origin::Mapping => write!(f, "Mapping"),
            Origin::Tuple | Origin::VarTuple => write!(f, "tuple"),
            Origin::Union => write!(f, "Union"),
            Origin::Literal => write!(f, "Literal"),
            Origin::Var(v) => write!(f, "{}", v.name),
            Origin::NewType(nt) => write!(f, "{}", nt.name),
        }
    }
}

/// Argument of a normalised type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NormArg {
    Type(NormType),
    Value(Value),
}

impl NormArg {
    pub fn as_type(&self) -> Option<&NormType> {
        match self {
            NormArg::Type(t) => Some(t),
            NormArg::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            NormArg::Value(v) => Some(v),
            NormArg::Type(_) => None,
        }
    }
}

/// Stripped wrapper preserved for downstream inspection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Marker {
    Annotation(Value),
    Tag(TypeTag),
}

/// Canonical form of a type
#[derive(Debug, Clone)]
pub struct NormType {
    origin: Origin,
    args: Vec<NormArg>,
    source: TypeExpr,
    markers: Vec<Marker>,
}

impl PartialEq for NormType {
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin && self.args == other.args
    }
}

impl Eq for NormType {}

impl Hash for NormType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.origin.hash(state);
        self.args.hash(state);
    }
}

impl NormType {
    fn new(origin: Origin, args: Vec<NormArg>, source: TypeExpr) -> Self {
        NormType {
            origin,
            args,
            source,
            markers: Vec::new(),
        }
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn args(&self) -> &[NormArg] {
        &self.args
    }

    /// The expression this type was normalised from
    pub fn source(&self) -> &TypeExpr {
        &self.source
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn has_tag(&self, tag: TypeTag) -> bool {
        self.markers.contains(&Marker::Tag(tag))
    }

    pub fn annotations(&self) -> impl Iterator<Item = &Value> {
        self.markers.iter().filter_map(|m| match m {
            Marker::Annotation(v) => Some(v),
            Marker::Tag(_) => None,
        })
    }

    /// Type arguments, skipping literal values
    pub fn type_args(&self) -> impl Iterator<Item = &NormType> {
        self.args.iter().filter_map(NormArg::as_type)
    }

    pub fn type_arg(&self, pos: usize) -> Option<&NormType> {
        self.args.get(pos).and_then(NormArg::as_type)
    }

    /// Literal values of a `Literal` type
    pub fn literal_values(&self) -> Vec<&Value> {
        if self.origin != Origin::Literal {
            return Vec::new();
        }
        self.args.iter().filter_map(NormArg::as_value).collect()
    }

    pub fn class(&self) -> Option<&ClassRef> {
        match &self.origin {
            Origin::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        self.origin == Origin::None
    }

    /// For `Union[T, None]` returns `T`
    pub fn optional_inner(&self) -> Option<&NormType> {
        if self.origin != Origin::Union || self.args.len() != 2 {
            return None;
        }
        let members: Vec<&NormType> = self.type_args().collect();
        match members.as_slice() {
            [a, b] if b.is_none() && !a.is_none() => Some(a),
            [a, b] if a.is_none() && !b.is_none() => Some(b),
            _ => None,
        }
    }

    pub fn is_subclass_of(&self, class: &ClassRef) -> bool {
        self.class().is_some_and(|c| c.is_subclass_of(class))
    }
}

impl fmt::Display for NormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Normalise a type expression within a namespace
pub fn normalize_type(expr: &TypeExpr, namespace: &Namespace) -> Result<NormType> {
    Normaliser { namespace }.normalize(expr, 0)
}

struct Normaliser<'a> {
    namespace: &'a Namespace,
}

impl Normaliser<'_> {
    fn normalize(&self, expr: &TypeExpr, depth: usize) -> Result<NormType> {
        if depth > MAX_ALIAS_DEPTH {
            return Err(Error::normalisation(format!(
                "type alias chain is too deep while normalising {}",
                expr
            )));
        }
        let single = |origin: Origin, inner: &TypeExpr| -> Result<NormType> {
            Ok(NormType::new(
                origin,
                vec![NormArg::Type(self.normalize(inner, depth + 1)?)],
                expr.clone(),
            ))
        };
        match expr {
            TypeExpr::Any => Ok(NormType::new(Origin::Any, vec![], expr.clone())),
            TypeExpr::None => Ok(NormType::new(Origin::None, vec![], expr.clone())),
            TypeExpr::Prim(p) => Ok(NormType::new(Origin::Prim(*p), vec![], expr.clone())),
            TypeExpr::SelfType => Ok(NormType::new(Origin::SelfType, vec![], expr.clone())),
            TypeExpr::Class(class) => Ok(self.bare_class(class, expr)),
            TypeExpr::Named(name) => {
                if let Some(class) = self.namespace.class(name) {
                    return Ok(self.bare_class(class, expr));
                }
                if let Some(target) = self.namespace.type_alias(name) {
                    let mut norm = self.normalize(target, depth + 1)?;
                    norm.source = expr.clone();
                    return Ok(norm);
                }
                Err(Error::normalisation(format!(
                    "cannot resolve forward reference {:?}: register the class in the retort namespace",
                    name
                )))
            }
            TypeExpr::List(t) => single(Origin::List, t),
            TypeExpr::Set(t) => single(Origin::Set, t),
            TypeExpr::FrozenSet(t) => single(Origin::FrozenSet, t),
            TypeExpr::Sequence(t) => single(Origin::Sequence, t),
            TypeExpr::VarTuple(t) => single(Origin::VarTuple, t),
            TypeExpr::Dict(k, v) | TypeExpr::Mapping(k, v) => {
                let origin = if matches!(expr, TypeExpr::Dict(..)) {
                    Origin::Dict
                } else {
                    Origin::Mapping
                };
                Ok(NormType::new(
                    origin,
                    vec![
                        NormArg::Type(self.normalize(k, depth + 1)?),
                        NormArg::Type(self.normalize(v, depth + 1)?),
                    ],
                    expr.clone(),
                ))
            }
            TypeExpr::Tuple(items) => {
                let args = items
                    .iter()
                    .map(|t| self.normalize(t, depth + 1).map(NormArg::Type))
                    .collect::<Result<Vec<_>>>()?;
                Ok(NormType::new(Origin::Tuple, args, expr.clone()))
            }
            TypeExpr::Union(members) => self.union(members.iter(), expr, depth),
            TypeExpr::Optional(inner) => {
                self.union([inner.as_ref(), &TypeExpr::None].into_iter(), expr, depth)
            }
            TypeExpr::Literal(values) => {
                if values.is_empty() {
                    return Err(Error::normalisation("Literal requires at least one value"));
                }
                let mut args: Vec<NormArg> = Vec::with_capacity(values.len());
                for value in values {
                    let arg = NormArg::Value(value.clone());
                    if !args.contains(&arg) {
                        args.push(arg);
                    }
                }
                Ok(NormType::new(Origin::Literal, args, expr.clone()))
            }
            TypeExpr::Annotated(inner, metadata) => {
                let mut norm = self.normalize(inner, depth + 1)?;
                norm.markers
                    .extend(metadata.iter().cloned().map(Marker::Annotation));
                norm.source = expr.clone();
                Ok(norm)
            }
            TypeExpr::Tagged(tag, inner) => {
                let mut norm = self.normalize(inner, depth + 1)?;
                norm.markers.push(Marker::Tag(*tag));
                norm.source = expr.clone();
                Ok(norm)
            }
            TypeExpr::Generic(head, args) => {
                let class = match head.as_ref() {
                    TypeExpr::Class(class) => class.clone(),
                    TypeExpr::Named(name) => self.namespace.class(name).cloned().ok_or_else(|| {
                        Error::normalisation(format!(
                            "cannot resolve forward reference {:?}: register the class in the retort namespace",
                            name
                        ))
                    })?,
                    other => {
                        return Err(Error::normalisation(format!(
                            "{} cannot be parameterised",
                            other
                        )))
                    }
                };
                if class.type_params().len() != args.len() {
                    return Err(Error::normalisation(format!(
                        "{} expects {} type arguments, got {}",
                        class.name(),
                        class.type_params().len(),
                        args.len()
                    )));
                }
                let args = args
                    .iter()
                    .map(|t| self.normalize(t, depth + 1).map(NormArg::Type))
                    .collect::<Result<Vec<_>>>()?;
                Ok(NormType::new(Origin::Class(class), args, expr.clone()))
            }
            TypeExpr::Var(var) => Ok(NormType::new(Origin::Var(var.clone()), vec![], expr.clone())),
            TypeExpr::NewType(nt) => Ok(NormType::new(Origin::NewType(nt.clone()), vec![], expr.clone())),
        }
    }

    fn bare_class(&self, class: &ClassRef, expr: &TypeExpr) -> NormType {
        let args = class
            .type_params()
            .iter()
            .map(|param| {
                NormArg::Type(NormType::new(
                    Origin::Var(param.clone()),
                    vec![],
                    TypeExpr::Var(param.clone()),
                ))
            })
            .collect();
        NormType::new(Origin::Class(class.clone()), args, expr.clone())
    }

    fn union<'e>(
        &self,
        members: impl Iterator<Item = &'e TypeExpr>,
        expr: &TypeExpr,
        depth: usize,
    ) -> Result<NormType> {
        let mut flat: Vec<NormType> = Vec::new();
        for member in members {
            let norm = self.normalize(member, depth + 1)?;
            if norm.origin == Origin::Union {
                for arg in norm.args {
                    if let NormArg::Type(t) = arg {
                        if !flat.contains(&t) {
                            flat.push(t);
                        }
                    }
                }
            } else if !flat.contains(&norm) {
                flat.push(norm);
            }
        }
        if flat.is_empty() {
            return Err(Error::normalisation("Union requires at least one member"));
        }
        if flat.len() == 1 {
            return Ok(flat.remove(0));
        }
        flat.sort_by_cached_key(|t| t.origin.to_string());
        Ok(NormType::new(
            Origin::Union,
            flat.into_iter().map(NormArg::Type).collect(),
            expr.clone(),
        ))
    }
}
