//! User class declarations
//!
//! A [`ClassDef`] describes a user model the engine can morph: a record
//! (dataclass-like), a typed dict, a named tuple, an enum, or an opaque class
//! that only user providers know how to handle. Classes are shared through
//! [`ClassRef`], which compares by identity.

use crate::shape::{FieldDefault, Metadata};
use crate::types::{TypeExpr, TypeVar};
use crate::value::{EnumValue, Instance, Value};
use indexmap::IndexMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Declaration of a user class
#[derive(Debug)]
pub struct ClassDef {
    pub name: String,
    pub module: Option<String>,
    pub bases: Vec<ClassRef>,
    pub type_params: Vec<TypeVar>,
    pub kind: ClassKind,
}

/// How instances of a class are built and read
#[derive(Debug)]
pub enum ClassKind {
    Record(RecordDef),
    TypedDict(TypedDictDef),
    NamedTuple(NamedTupleDef),
    Enum(EnumDef),
    Opaque,
}

impl ClassKind {
    pub fn name(&self) -> &'static str {
        match self {
            ClassKind::Record(_) => "record",
            ClassKind::TypedDict(_) => "typed dict",
            ClassKind::NamedTuple(_) => "named tuple",
            ClassKind::Enum(_) => "enum",
            ClassKind::Opaque => "opaque class",
        }
    }
}

/// Dataclass-like declaration
#[derive(Debug, Default)]
pub struct RecordDef {
    pub fields: Vec<RecordField>,
    /// Class-wide keyword-only default
    pub kw_only: bool,
    /// Type of extra keyword arguments accepted by the constructor
    pub kwargs: Option<TypeExpr>,
}

#[derive(Debug, Clone)]
pub struct RecordField {
    pub name: String,
    pub ty: TypeExpr,
    pub default: FieldDefault,
    pub init: bool,
    pub kw_only: Option<bool>,
    pub metadata: Metadata,
}

impl RecordField {
    pub fn new(name: impl Into<String>, ty: impl Into<TypeExpr>) -> Self {
        RecordField {
            name: name.into(),
            ty: ty.into(),
            default: FieldDefault::NoDefault,
            init: true,
            kw_only: None,
            metadata: Metadata::default(),
        }
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = FieldDefault::Value(value.into());
        self
    }

    pub fn default_factory(mut self, factory: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = FieldDefault::factory(factory);
        self
    }

    pub fn init(mut self, init: bool) -> Self {
        self.init = init;
        self
    }

    pub fn kw_only(mut self, kw_only: bool) -> Self {
        self.kw_only = Some(kw_only);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata = self.metadata.with(key, value);
        self
    }
}

/// TypedDict-like declaration
#[derive(Debug)]
pub struct TypedDictDef {
    pub fields: Vec<TypedDictField>,
    pub total: bool,
}

impl Default for TypedDictDef {
    fn default() -> Self {
        TypedDictDef {
            fields: Vec::new(),
            total: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypedDictField {
    pub name: String,
    pub ty: TypeExpr,
}

/// NamedTuple-like declaration
#[derive(Debug, Default)]
pub struct NamedTupleDef {
    pub fields: Vec<NamedTupleField>,
}

#[derive(Debug, Clone)]
pub struct NamedTupleField {
    pub name: String,
    pub ty: TypeExpr,
    pub default: Option<Value>,
}

/// Enum declaration
#[derive(Debug, Default)]
pub struct EnumDef {
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone)]
pub struct EnumMember {
    pub name: String,
    pub value: Value,
}

/// Marker for classes without a built-in shape
#[derive(Debug, Default)]
pub struct OpaqueDef;

impl From<RecordDef> for ClassKind {
    fn from(def: RecordDef) -> Self {
        ClassKind::Record(def)
    }
}

impl From<TypedDictDef> for ClassKind {
    fn from(def: TypedDictDef) -> Self {
        ClassKind::TypedDict(def)
    }
}

impl From<NamedTupleDef> for ClassKind {
    fn from(def: NamedTupleDef) -> Self {
        ClassKind::NamedTuple(def)
    }
}

impl From<EnumDef> for ClassKind {
    fn from(def: EnumDef) -> Self {
        ClassKind::Enum(def)
    }
}

impl From<OpaqueDef> for ClassKind {
    fn from(_: OpaqueDef) -> Self {
        ClassKind::Opaque
    }
}

impl ClassDef {
    pub fn record(name: impl Into<String>) -> ClassBuilder<RecordDef> {
        ClassBuilder::new(name)
    }

    pub fn typed_dict(name: impl Into<String>) -> ClassBuilder<TypedDictDef> {
        ClassBuilder::new(name)
    }

    pub fn named_tuple(name: impl Into<String>) -> ClassBuilder<NamedTupleDef> {
        ClassBuilder::new(name)
    }

    pub fn enumeration(name: impl Into<String>) -> ClassBuilder<EnumDef> {
        ClassBuilder::new(name)
    }

    pub fn opaque(name: impl Into<String>) -> ClassBuilder<OpaqueDef> {
        ClassBuilder::new(name)
    }
}

/// Builder for class declarations, parameterised by the kind being declared
#[derive(Debug)]
pub struct ClassBuilder<K> {
    name: String,
    module: Option<String>,
    bases: Vec<ClassRef>,
    type_params: Vec<TypeVar>,
    kind: K,
}

impl<K: Default + Into<ClassKind>> ClassBuilder<K> {
    fn new(name: impl Into<String>) -> Self {
        ClassBuilder {
            name: name.into(),
            module: None,
            bases: Vec::new(),
            type_params: Vec::new(),
            kind: K::default(),
        }
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn base(mut self, base: &ClassRef) -> Self {
        self.bases.push(base.clone());
        self
    }

    pub fn type_param(mut self, param: TypeVar) -> Self {
        self.type_params.push(param);
        self
    }

    pub fn build(self) -> ClassRef {
        ClassRef(Arc::new(ClassDef {
            name: self.name,
            module: self.module,
            bases: self.bases,
            type_params: self.type_params,
            kind: self.kind.into(),
        }))
    }
}

impl ClassBuilder<RecordDef> {
    pub fn field(self, name: impl Into<String>, ty: impl Into<TypeExpr>) -> Self {
        self.field_def(RecordField::new(name, ty))
    }

    pub fn field_def(mut self, field: RecordField) -> Self {
        self.kind.fields.push(field);
        self
    }

    pub fn kw_only(mut self) -> Self {
        self.kind.kw_only = true;
        self
    }

    pub fn kwargs(mut self, ty: TypeExpr) -> Self {
        self.kind.kwargs = Some(ty);
        self
    }
}

impl ClassBuilder<TypedDictDef> {
    pub fn field(mut self, name: impl Into<String>, ty: impl Into<TypeExpr>) -> Self {
        self.kind.fields.push(TypedDictField {
            name: name.into(),
            ty: ty.into(),
        });
        self
    }

    pub fn total(mut self, total: bool) -> Self {
        self.kind.total = total;
        self
    }
}

impl ClassBuilder<NamedTupleDef> {
    pub fn field(mut self, name: impl Into<String>, ty: impl Into<TypeExpr>) -> Self {
        self.kind.fields.push(NamedTupleField {
            name: name.into(),
            ty: ty.into(),
            default: None,
        });
        self
    }

    pub fn field_default(mut self, name: impl Into<String>, ty: impl Into<TypeExpr>, default: impl Into<Value>) -> Self {
        self.kind.fields.push(NamedTupleField {
            name: name.into(),
            ty: ty.into(),
            default: Some(default.into()),
        });
        self
    }
}

impl ClassBuilder<EnumDef> {
    pub fn member(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kind.members.push(EnumMember {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

/// Shared handle to a class declaration; equality is identity
#[derive(Clone)]
pub struct ClassRef(Arc<ClassDef>);

impl ClassRef {
    pub fn def(&self) -> &ClassDef {
        &self.0
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn qualified_name(&self) -> String {
        match &self.0.module {
            Some(module) => format!("{}.{}", module, self.0.name),
            None => self.0.name.clone(),
        }
    }

    pub fn kind(&self) -> &ClassKind {
        &self.0.kind
    }

    pub fn type_params(&self) -> &[TypeVar] {
        &self.0.type_params
    }

    pub fn is_generic(&self) -> bool {
        !self.0.type_params.is_empty()
    }

    /// True if `self` is `other` or inherits from it
    pub fn is_subclass_of(&self, other: &ClassRef) -> bool {
        self == other || self.0.bases.iter().any(|base| base.is_subclass_of(other))
    }

    /// Base classes, nearest first, each listed once
    pub fn ancestors(&self) -> Vec<ClassRef> {
        let mut result: Vec<ClassRef> = Vec::new();
        let mut queue: Vec<ClassRef> = self.0.bases.clone();
        while !queue.is_empty() {
            let base = queue.remove(0);
            if !result.contains(&base) {
                queue.extend(base.0.bases.iter().cloned());
                result.push(base);
            }
        }
        result
    }

    pub fn enum_def(&self) -> Option<&EnumDef> {
        match &self.0.kind {
            ClassKind::Enum(def) => Some(def),
            _ => None,
        }
    }

    /// Enum member by name
    pub fn member(&self, name: &str) -> Option<Value> {
        let def = self.enum_def()?;
        def.members
            .iter()
            .find(|m| m.name == name)
            .map(|m| self.member_value(m))
    }

    /// All enum members in declaration order
    pub fn members(&self) -> Vec<Value> {
        self.enum_def()
            .map(|def| def.members.iter().map(|m| self.member_value(m)).collect())
            .unwrap_or_default()
    }

    fn member_value(&self, member: &EnumMember) -> Value {
        Value::Enum(EnumValue {
            class: self.clone(),
            name: member.name.clone(),
            value: Box::new(member.value.clone()),
        })
    }

    /// Build an instance directly from attributes, bypassing the constructor
    pub fn instance<K, I>(&self, attrs: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let attrs: IndexMap<String, Value> = attrs.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Value::Instance(Instance::new(self.clone(), attrs))
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ClassRef {}

impl Hash for ClassRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class {}>", self.qualified_name())
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.name)
    }
}

/// Resolution context for forward references and type aliases
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    classes: IndexMap<String, ClassRef>,
    aliases: IndexMap<String, TypeExpr>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, class: &ClassRef) -> Self {
        self.insert(class);
        self
    }

    pub fn insert(&mut self, class: &ClassRef) {
        if let Some(previous) = self.classes.insert(class.name().to_string(), class.clone()) {
            if &previous != class {
                log::warn!("class {} shadows an earlier class of the same name", class.name());
            }
        }
        if class.def().module.is_some() {
            self.classes.insert(class.qualified_name(), class.clone());
        }
    }

    pub fn alias(mut self, name: impl Into<String>, ty: TypeExpr) -> Self {
        self.aliases.insert(name.into(), ty);
        self
    }

    pub fn class(&self, name: &str) -> Option<&ClassRef> {
        self.classes.get(name)
    }

    pub fn type_alias(&self, name: &str) -> Option<&TypeExpr> {
        self.aliases.get(name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassRef> {
        let mut seen = Vec::<&ClassRef>::new();
        self.classes.values().filter(move |c| {
            if seen.contains(c) {
                false
            } else {
                seen.push(c);
                true
            }
        })
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.aliases.is_empty()
    }
}
