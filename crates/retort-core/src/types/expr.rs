//! Un-normalised type expressions

use crate::types::ClassRef;
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;

/// Built-in scalar types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Prim {
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    ByteArray,
    DateTime,
    Date,
    Time,
}

impl Prim {
    pub fn name(self) -> &'static str {
        match self {
            Prim::Bool => "bool",
            Prim::Int => "int",
            Prim::Float => "float",
            Prim::Str => "str",
            Prim::Bytes => "bytes",
            Prim::ByteArray => "bytearray",
            Prim::DateTime => "datetime",
            Prim::Date => "date",
            Prim::Time => "time",
        }
    }

    pub fn from_name(name: &str) -> Option<Prim> {
        Some(match name {
            "bool" => Prim::Bool,
            "int" => Prim::Int,
            "float" => Prim::Float,
            "str" => Prim::Str,
            "bytes" => Prim::Bytes,
            "bytearray" => Prim::ByteArray,
            "datetime" => Prim::DateTime,
            "date" => Prim::Date,
            "time" => Prim::Time,
            _ => return None,
        })
    }
}

/// Metadata-only wrappers that do not change the value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Final,
    ClassVar,
    InitVar,
    Required,
    NotRequired,
    ReadOnly,
}

impl TypeTag {
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Final => "Final",
            TypeTag::ClassVar => "ClassVar",
            TypeTag::InitVar => "InitVar",
            TypeTag::Required => "Required",
            TypeTag::NotRequired => "NotRequired",
            TypeTag::ReadOnly => "ReadOnly",
        }
    }

    pub fn from_name(name: &str) -> Option<TypeTag> {
        Some(match name {
            "Final" => TypeTag::Final,
            "ClassVar" => TypeTag::ClassVar,
            "InitVar" => TypeTag::InitVar,
            "Required" => TypeTag::Required,
            "NotRequired" => TypeTag::NotRequired,
            "ReadOnly" => TypeTag::ReadOnly,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Variance {
    #[default]
    Invariant,
    Covariant,
    Contravariant,
}

/// A type parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeVar {
    pub name: String,
    pub bound: Option<Box<TypeExpr>>,
    pub constraints: Vec<TypeExpr>,
    pub variance: Variance,
}

impl TypeVar {
    pub fn new(name: impl Into<String>) -> Self {
        TypeVar {
            name: name.into(),
            bound: None,
            constraints: Vec::new(),
            variance: Variance::Invariant,
        }
    }

    pub fn bound(mut self, bound: TypeExpr) -> Self {
        self.bound = Some(Box::new(bound));
        self
    }

    pub fn constraints(mut self, constraints: Vec<TypeExpr>) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn variance(mut self, variance: Variance) -> Self {
        self.variance = variance;
        self
    }

    /// Type used when the parameter is left unspecified
    pub fn fallback(&self) -> TypeExpr {
        if let Some(bound) = &self.bound {
            return (**bound).clone();
        }
        if !self.constraints.is_empty() {
            return TypeExpr::Union(self.constraints.clone());
        }
        TypeExpr::Any
    }
}

/// A distinct named alias of another type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NewTypeDef {
    pub name: String,
    pub supertype: Box<TypeExpr>,
}

impl NewTypeDef {
    pub fn new(name: impl Into<String>, supertype: TypeExpr) -> Self {
        NewTypeDef {
            name: name.into(),
            supertype: Box::new(supertype),
        }
    }
}

/// Type expression as written by the user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    Any,
    None,
    Prim(Prim),
    Class(ClassRef),
    /// Forward reference resolved through the retort namespace
    Named(String),
    SelfType,
    List(Box<TypeExpr>),
    Set(Box<TypeExpr>),
    FrozenSet(Box<TypeExpr>),
    Sequence(Box<TypeExpr>),
    Dict(Box<TypeExpr>, Box<TypeExpr>),
    Mapping(Box<TypeExpr>, Box<TypeExpr>),
    Tuple(Vec<TypeExpr>),
    VarTuple(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
    Optional(Box<TypeExpr>),
    Literal(Vec<Value>),
    Annotated(Box<TypeExpr>, Vec<Value>),
    Tagged(TypeTag, Box<TypeExpr>),
    /// Application of a generic class (or forward reference) to arguments
    Generic(Box<TypeExpr>, Vec<TypeExpr>),
    Var(TypeVar),
    NewType(NewTypeDef),
}

impl TypeExpr {
    pub fn bool() -> Self {
        TypeExpr::Prim(Prim::Bool)
    }

    pub fn int() -> Self {
        TypeExpr::Prim(Prim::Int)
    }

    pub fn float() -> Self {
        TypeExpr::Prim(Prim::Float)
    }

    pub fn str() -> Self {
        TypeExpr::Prim(Prim::Str)
    }

    pub fn bytes() -> Self {
        TypeExpr::Prim(Prim::Bytes)
    }

    pub fn datetime() -> Self {
        TypeExpr::Prim(Prim::DateTime)
    }

    pub fn date() -> Self {
        TypeExpr::Prim(Prim::Date)
    }

    pub fn time() -> Self {
        TypeExpr::Prim(Prim::Time)
    }

    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named(name.into())
    }

    pub fn list(item: TypeExpr) -> Self {
        TypeExpr::List(Box::new(item))
    }

    pub fn set(item: TypeExpr) -> Self {
        TypeExpr::Set(Box::new(item))
    }

    pub fn dict(key: TypeExpr, value: TypeExpr) -> Self {
        TypeExpr::Dict(Box::new(key), Box::new(value))
    }

    pub fn tuple(items: Vec<TypeExpr>) -> Self {
        TypeExpr::Tuple(items)
    }

    pub fn var_tuple(item: TypeExpr) -> Self {
        TypeExpr::VarTuple(Box::new(item))
    }

    pub fn optional(inner: TypeExpr) -> Self {
        TypeExpr::Optional(Box::new(inner))
    }

    pub fn union(members: Vec<TypeExpr>) -> Self {
        TypeExpr::Union(members)
    }

    pub fn literal(values: Vec<Value>) -> Self {
        TypeExpr::Literal(values)
    }

    pub fn annotated(inner: TypeExpr, metadata: Vec<Value>) -> Self {
        TypeExpr::Annotated(Box::new(inner), metadata)
    }

    pub fn tagged(tag: TypeTag, inner: TypeExpr) -> Self {
        TypeExpr::Tagged(tag, Box::new(inner))
    }

    pub fn generic(head: impl Into<TypeExpr>, args: Vec<TypeExpr>) -> Self {
        TypeExpr::Generic(Box::new(head.into()), args)
    }

    /// Class referenced by this expression, looking through generic application
    pub fn as_class(&self) -> Option<&ClassRef> {
        match self {
            TypeExpr::Class(class) => Some(class),
            TypeExpr::Generic(head, _) => head.as_class(),
            _ => None,
        }
    }

    /// Replace type variables by name
    pub fn substitute(&self, vars: &HashMap<String, TypeExpr>) -> TypeExpr {
        let sub = |t: &TypeExpr| Box::new(t.substitute(vars));
        let sub_all = |ts: &[TypeExpr]| ts.iter().map(|t| t.substitute(vars)).collect();
        match self {
            TypeExpr::Var(var) => vars.get(&var.name).cloned().unwrap_or_else(|| self.clone()),
            TypeExpr::List(t) => TypeExpr::List(sub(t)),
            TypeExpr::Set(t) => TypeExpr::Set(sub(t)),
            TypeExpr::FrozenSet(t) => TypeExpr::FrozenSet(sub(t)),
            TypeExpr::Sequence(t) => TypeExpr::Sequence(sub(t)),
            TypeExpr::Dict(k, v) => TypeExpr::Dict(sub(k), sub(v)),
            TypeExpr::Mapping(k, v) => TypeExpr::Mapping(sub(k), sub(v)),
            TypeExpr::Tuple(ts) => TypeExpr::Tuple(sub_all(ts)),
            TypeExpr::VarTuple(t) => TypeExpr::VarTuple(sub(t)),
            TypeExpr::Union(ts) => TypeExpr::Union(sub_all(ts)),
            TypeExpr::Optional(t) => TypeExpr::Optional(sub(t)),
            TypeExpr::Annotated(t, meta) => TypeExpr::Annotated(sub(t), meta.clone()),
            TypeExpr::Tagged(tag, t) => TypeExpr::Tagged(*tag, sub(t)),
            TypeExpr::Generic(head, args) => TypeExpr::Generic(head.clone(), sub_all(args)),
            other => other.clone(),
        }
    }

    /// Replace `Self` with the owning type
    pub fn replace_self(&self, owner: &TypeExpr) -> TypeExpr {
        let sub = |t: &TypeExpr| Box::new(t.replace_self(owner));
        let sub_all = |ts: &[TypeExpr]| ts.iter().map(|t| t.replace_self(owner)).collect();
        match self {
            TypeExpr::SelfType => owner.clone(),
            TypeExpr::List(t) => TypeExpr::List(sub(t)),
            TypeExpr::Set(t) => TypeExpr::Set(sub(t)),
            TypeExpr::FrozenSet(t) => TypeExpr::FrozenSet(sub(t)),
            TypeExpr::Sequence(t) => TypeExpr::Sequence(sub(t)),
            TypeExpr::Dict(k, v) => TypeExpr::Dict(sub(k), sub(v)),
            TypeExpr::Mapping(k, v) => TypeExpr::Mapping(sub(k), sub(v)),
            TypeExpr::Tuple(ts) => TypeExpr::Tuple(sub_all(ts)),
            TypeExpr::VarTuple(t) => TypeExpr::VarTuple(sub(t)),
            TypeExpr::Union(ts) => TypeExpr::Union(sub_all(ts)),
            TypeExpr::Optional(t) => TypeExpr::Optional(sub(t)),
            TypeExpr::Annotated(t, meta) => TypeExpr::Annotated(sub(t), meta.clone()),
            TypeExpr::Tagged(tag, t) => TypeExpr::Tagged(*tag, sub(t)),
            TypeExpr::Generic(head, args) => TypeExpr::Generic(head.clone(), sub_all(args)),
            other => other.clone(),
        }
    }

    /// True if any type variable remains in the expression
    pub fn has_type_vars(&self) -> bool {
        match self {
            TypeExpr::Var(_) => true,
            TypeExpr::List(t)
            | TypeExpr::Set(t)
            | TypeExpr::FrozenSet(t)
            | TypeExpr::Sequence(t)
            | TypeExpr::VarTuple(t)
            | TypeExpr::Optional(t)
            | TypeExpr::Annotated(t, _)
            | TypeExpr::Tagged(_, t) => t.has_type_vars(),
            TypeExpr::Dict(k, v) | TypeExpr::Mapping(k, v) => k.has_type_vars() || v.has_type_vars(),
            TypeExpr::Tuple(ts) | TypeExpr::Union(ts) | TypeExpr::Generic(_, ts) => {
                ts.iter().any(TypeExpr::has_type_vars)
            }
            _ => false,
        }
    }
}

impl From<Prim> for TypeExpr {
    fn from(prim: Prim) -> Self {
        TypeExpr::Prim(prim)
    }
}

impl From<ClassRef> for TypeExpr {
    fn from(class: ClassRef) -> Self {
        TypeExpr::Class(class)
    }
}

impl From<&ClassRef> for TypeExpr {
    fn from(class: &ClassRef) -> Self {
        TypeExpr::Class(class.clone())
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Any => write!(f, "Any"),
            TypeExpr::None => write!(f, "None"),
            TypeExpr::Prim(p) => write!(f, "{}", p.name()),
            TypeExpr::Class(c) => write!(f, "{}", c.name()),
            TypeExpr::Named(n) => write!(f, "{}", n),
            TypeExpr::SelfType => write!(f, "Self"),
            TypeExpr::List(t) => write!(f, "list[{}]", t),
            TypeExpr::Set(t) => write!(f, "set[{}]", t),
            TypeExpr::FrozenSet(t) => write!(f, "frozenset[{}]", t),
            TypeExpr::Sequence(t) => write!(f, "Sequence[{}]", t),
            TypeExpr::Dict(k, v) => write!(f, "dict[{}, {}]", k, v),
            TypeExpr::Mapping(k, v) => write!(f, "Mapping[{}, {}]", k, v),
            TypeExpr::Tuple(ts) if ts.is_empty() => write!(f, "tuple[()]"),
            TypeExpr::Tuple(ts) => {
                write!(f, "tuple[")?;
                write_list(f, ts)?;
                write!(f, "]")
            }
            TypeExpr::VarTuple(t) => write!(f, "tuple[{}, ...]", t),
            TypeExpr::Union(ts) => {
                write!(f, "Union[")?;
                write_list(f, ts)?;
                write!(f, "]")
            }
            TypeExpr::Optional(t) => write!(f, "Optional[{}]", t),
            TypeExpr::Literal(vs) => {
                write!(f, "Literal[")?;
                write_list(f, vs)?;
                write!(f, "]")
            }
            TypeExpr::Annotated(t, meta) => {
                write!(f, "Annotated[{}", t)?;
                for m in meta {
                    write!(f, ", {}", m)?;
                }
                write!(f, "]")
            }
            TypeExpr::Tagged(tag, t) => write!(f, "{}[{}]", tag.name(), t),
            TypeExpr::Generic(head, args) => {
                write!(f, "{}[", head)?;
                write_list(f, args)?;
                write!(f, "]")
            }
            TypeExpr::Var(v) => write!(f, "{}", v.name),
            TypeExpr::NewType(nt) => write!(f, "{}", nt.name),
        }
    }
}
