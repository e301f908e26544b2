//! Model shapes
//!
//! The neutral vocabulary every introspector speaks: an [`InputShape`]
//! (constructor plus parameters) and an [`OutputShape`] (readable fields plus
//! accessors). Shapes are validated when built, so the planner and the code
//! generator can rely on their discipline.
//!
//! Copyright (c) 2025 Retort Team
//! Licensed under the Apache-2.0 license

pub mod provider;
pub mod request;

pub use provider::{ConstructorProvider, PropertyProvider, ShapeProvider};
pub use request::{InputShapeRequest, OutputShapeRequest};

use crate::morphing::LoadError;
use crate::types::TypeExpr;
use crate::value::Value;
use crate::{Error, Result};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Free-form field metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Metadata(Vec<(String, Value)>);

impl Metadata {
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        self.0.retain(|(k, _)| *k != key);
        self.0.push((key, value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Factory producing a default value
#[derive(Clone)]
pub struct DefaultFactory(Arc<dyn Fn() -> Value + Send + Sync>);

/// Factory producing a default value from the model being built or read
#[derive(Clone)]
pub struct SelfDefaultFactory(Arc<dyn Fn(&Value) -> Value + Send + Sync>);

impl DefaultFactory {
    pub fn call(&self) -> Value {
        (self.0)()
    }
}

impl SelfDefaultFactory {
    pub fn call(&self, model: &Value) -> Value {
        (self.0)(model)
    }
}

macro_rules! identity_eq {
    ($name:ident) => {
        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                std::sync::Arc::ptr_eq(&self.0, &other.0)
            }
        }

        impl Eq for $name {}

        impl std::hash::Hash for $name {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                std::hash::Hash::hash(&(std::sync::Arc::as_ptr(&self.0) as *const () as usize), state);
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({:p})", stringify!($name), std::sync::Arc::as_ptr(&self.0) as *const ())
            }
        }
    };
}

pub(crate) use identity_eq;

identity_eq!(DefaultFactory);
identity_eq!(SelfDefaultFactory);

/// Default of a field. `NoDefault` is distinct from `Value(Value::None)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FieldDefault {
    #[default]
    NoDefault,
    Value(Value),
    Factory(DefaultFactory),
    FactoryWithSelf(SelfDefaultFactory),
}

impl FieldDefault {
    pub fn factory(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        FieldDefault::Factory(DefaultFactory(Arc::new(f)))
    }

    pub fn factory_with_self(f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        FieldDefault::FactoryWithSelf(SelfDefaultFactory(Arc::new(f)))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, FieldDefault::NoDefault)
    }

    /// Produce the default, `model` is the (partial) model for self factories
    pub fn produce(&self, model: &Value) -> Option<Value> {
        match self {
            FieldDefault::NoDefault => None,
            FieldDefault::Value(v) => Some(v.clone()),
            FieldDefault::Factory(f) => Some(f.call()),
            FieldDefault::FactoryWithSelf(f) => Some(f.call(model)),
        }
    }
}

/// How a constructor parameter may be passed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    PosOnly,
    PosOrKw,
    KwOnly,
}

impl ParamKind {
    pub fn is_positional(self) -> bool {
        !matches!(self, ParamKind::KwOnly)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Param {
    pub field_id: String,
    pub name: String,
    pub kind: ParamKind,
}

/// Catch-all keyword parameter of a constructor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamKwargs {
    pub ty: TypeExpr,
}

/// Arguments passed to a constructor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keyword: IndexMap<String, Value>,
}

type ConstructorFn = dyn Fn(CallArgs) -> std::result::Result<Value, LoadError> + Send + Sync;

/// Callable producing a model from arguments
#[derive(Clone)]
pub struct Constructor(Arc<ConstructorFn>);

identity_eq!(Constructor);

impl Constructor {
    pub fn new(f: impl Fn(CallArgs) -> std::result::Result<Value, LoadError> + Send + Sync + 'static) -> Self {
        Constructor(Arc::new(f))
    }

    pub fn call(&self, args: CallArgs) -> std::result::Result<Value, LoadError> {
        (self.0)(args)
    }
}

/// Why an accessor could not read a value
#[derive(Debug, Clone, PartialEq)]
pub enum AccessFailure {
    /// The value is absent; tolerated for optional output fields
    Missing { what: String },
    /// The model is not of the expected kind
    Type { expected: String, actual: String },
    Custom(String),
}

impl fmt::Display for AccessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessFailure::Missing { what } => write!(f, "{} is missing", what),
            AccessFailure::Type { expected, actual } => write!(f, "expected {}, got {}", expected, actual),
            AccessFailure::Custom(message) => write!(f, "{}", message),
        }
    }
}

type GetterFn = dyn Fn(&Value) -> std::result::Result<Value, AccessFailure> + Send + Sync;

/// Function reading a computed value from a model
#[derive(Clone)]
pub struct Getter(Arc<GetterFn>);

identity_eq!(Getter);

impl Getter {
    pub fn new(f: impl Fn(&Value) -> std::result::Result<Value, AccessFailure> + Send + Sync + 'static) -> Self {
        Getter(Arc::new(f))
    }

    pub fn call(&self, model: &Value) -> std::result::Result<Value, AccessFailure> {
        (self.0)(model)
    }
}

/// How an output field is read. `access_error` marks a field whose value may
/// legitimately be missing; such a field is skipped instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Accessor {
    Attr { name: String, access_error: bool },
    Item { key: Value, access_error: bool },
    Method { name: String, args: Vec<Value>, getter: Getter, access_error: bool },
    Property { name: String, getter: Getter, access_error: bool },
}

impl Accessor {
    pub fn attr(name: impl Into<String>) -> Self {
        Accessor::Attr {
            name: name.into(),
            access_error: false,
        }
    }

    pub fn item(key: impl Into<Value>, access_error: bool) -> Self {
        Accessor::Item {
            key: key.into(),
            access_error,
        }
    }

    pub fn access_error(&self) -> bool {
        match self {
            Accessor::Attr { access_error, .. }
            | Accessor::Item { access_error, .. }
            | Accessor::Method { access_error, .. }
            | Accessor::Property { access_error, .. } => *access_error,
        }
    }

    pub fn get(&self, model: &Value) -> std::result::Result<Value, AccessFailure> {
        match self {
            Accessor::Attr { name, .. } => match model {
                Value::Instance(instance) => instance.get(name).cloned().ok_or_else(|| AccessFailure::Missing {
                    what: format!("attribute {:?}", name),
                }),
                other => Err(AccessFailure::Type {
                    expected: "model instance".to_string(),
                    actual: other.type_name(),
                }),
            },
            Accessor::Item { key, .. } => match model {
                Value::Dict(map) => map.get(key).cloned().ok_or_else(|| AccessFailure::Missing {
                    what: format!("item {}", key),
                }),
                other => Err(AccessFailure::Type {
                    expected: "dict".to_string(),
                    actual: other.type_name(),
                }),
            },
            Accessor::Method { getter, .. } | Accessor::Property { getter, .. } => getter.call(model),
        }
    }
}

/// A field of an input shape
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputField {
    pub id: String,
    pub ty: TypeExpr,
    pub default: FieldDefault,
    pub is_required: bool,
    pub metadata: Metadata,
}

impl InputField {
    pub fn new(id: impl Into<String>, ty: impl Into<TypeExpr>) -> Self {
        InputField {
            id: id.into(),
            ty: ty.into(),
            default: FieldDefault::NoDefault,
            is_required: true,
            metadata: Metadata::default(),
        }
    }

    pub fn optional(mut self, default: FieldDefault) -> Self {
        self.default = default;
        self.is_required = false;
        self
    }

    pub fn is_optional(&self) -> bool {
        !self.is_required
    }
}

/// A field of an output shape
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputField {
    pub id: String,
    pub ty: TypeExpr,
    pub default: FieldDefault,
    pub accessor: Accessor,
    pub metadata: Metadata,
}

impl OutputField {
    pub fn new(id: impl Into<String>, ty: impl Into<TypeExpr>, accessor: Accessor) -> Self {
        OutputField {
            id: id.into(),
            ty: ty.into(),
            default: FieldDefault::NoDefault,
            accessor,
            metadata: Metadata::default(),
        }
    }

    pub fn is_required(&self) -> bool {
        !self.accessor.access_error()
    }

    pub fn is_optional(&self) -> bool {
        self.accessor.access_error()
    }
}

/// Construction side of a model
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputShape {
    pub constructor: Constructor,
    pub fields: Vec<InputField>,
    pub params: Vec<Param>,
    pub kwargs: Option<ParamKwargs>,
}

/// Readout side of a model
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputShape {
    pub fields: Vec<OutputField>,
}

impl InputShape {
    /// Build a validated input shape
    pub fn new(
        constructor: Constructor,
        fields: Vec<InputField>,
        params: Vec<Param>,
        kwargs: Option<ParamKwargs>,
    ) -> Result<Self> {
        let shape = InputShape {
            constructor,
            fields,
            params,
            kwargs,
        };
        shape.validate()?;
        Ok(shape)
    }

    fn validate(&self) -> Result<()> {
        check_unique_ids(self.fields.iter().map(|f| f.id.as_str()))?;

        let mut names = HashSet::new();
        for param in &self.params {
            if !names.insert(param.name.as_str()) {
                return Err(Error::invalid_shape(format!("parameter names are duplicated: {:?}", param.name)));
            }
        }

        let field_order: Vec<&str> = self.fields.iter().map(|f| f.id.as_str()).collect();
        let param_order: Vec<&str> = self.params.iter().map(|p| p.field_id.as_str()).collect();
        if field_order != param_order {
            return Err(Error::invalid_shape(format!(
                "parameters {:?} must follow the field order {:?}",
                param_order, field_order
            )));
        }

        let mut seen_optional_positional = None;
        for (param, field) in self.params.iter().zip(&self.fields) {
            match param.kind {
                ParamKind::KwOnly => {}
                ParamKind::PosOnly if field.is_optional() => {
                    return Err(Error::invalid_shape(format!(
                        "positional-only field {:?} cannot be optional",
                        field.id
                    )));
                }
                _ if field.is_optional() => seen_optional_positional = Some(field.id.as_str()),
                _ => {
                    if let Some(optional) = seen_optional_positional {
                        return Err(Error::invalid_shape(format!(
                            "required positional field {:?} follows optional field {:?}",
                            field.id, optional
                        )));
                    }
                }
            }
            if field.is_required && !field.default.is_none() {
                return Err(Error::invalid_shape(format!(
                    "required field {:?} cannot declare a default",
                    field.id
                )));
            }
        }
        Ok(())
    }

    pub fn field(&self, id: &str) -> Option<&InputField> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn field_index(&self, id: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.id == id)
    }

    pub fn param(&self, field_id: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.field_id == field_id)
    }
}

impl OutputShape {
    pub fn new(fields: Vec<OutputField>) -> Result<Self> {
        check_unique_ids(fields.iter().map(|f| f.id.as_str()))?;
        Ok(OutputShape { fields })
    }

    pub fn field(&self, id: &str) -> Option<&OutputField> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn field_index(&self, id: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.id == id)
    }
}

fn check_unique_ids<'a>(ids: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(Error::invalid_shape(format!("field ids are duplicated: {:?}", id)));
        }
    }
    Ok(())
}

/// Either side of a model, as seen by name mapping functions
#[derive(Debug, Clone, Copy)]
pub enum ShapeRef<'a> {
    Input(&'a InputShape),
    Output(&'a OutputShape),
}

impl ShapeRef<'_> {
    pub fn field_ids(&self) -> Vec<&str> {
        match self {
            ShapeRef::Input(shape) => shape.fields.iter().map(|f| f.id.as_str()).collect(),
            ShapeRef::Output(shape) => shape.fields.iter().map(|f| f.id.as_str()).collect(),
        }
    }
}

/// Either kind of field, as seen by name mapping functions
#[derive(Debug, Clone, Copy)]
pub enum FieldRef<'a> {
    Input(&'a InputField),
    Output(&'a OutputField),
}

impl<'a> FieldRef<'a> {
    pub fn id(&self) -> &'a str {
        match self {
            FieldRef::Input(field) => &field.id,
            FieldRef::Output(field) => &field.id,
        }
    }

    pub fn ty(&self) -> &'a TypeExpr {
        match self {
            FieldRef::Input(field) => &field.ty,
            FieldRef::Output(field) => &field.ty,
        }
    }

    pub fn default(&self) -> &'a FieldDefault {
        match self {
            FieldRef::Input(field) => &field.default,
            FieldRef::Output(field) => &field.default,
        }
    }

    pub fn metadata(&self) -> &'a Metadata {
        match self {
            FieldRef::Input(field) => &field.metadata,
            FieldRef::Output(field) => &field.metadata,
        }
    }

    pub fn is_optional(&self) -> bool {
        match self {
            FieldRef::Input(field) => field.is_optional(),
            FieldRef::Output(field) => field.is_optional(),
        }
    }

    pub fn to_loc(&self) -> crate::location::Loc {
        match self {
            FieldRef::Input(field) => crate::location::Loc::input_field(field),
            FieldRef::Output(field) => crate::location::Loc::output_field(field),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constructor() -> Constructor {
        Constructor::new(|_| Ok(Value::None))
    }

    fn param(id: &str, kind: ParamKind) -> Param {
        Param {
            field_id: id.to_string(),
            name: id.to_string(),
            kind,
        }
    }

    #[test]
    fn test_valid_shape() {
        let shape = InputShape::new(
            constructor(),
            vec![
                InputField::new("a", TypeExpr::int()),
                InputField::new("b", TypeExpr::int()).optional(FieldDefault::Value(Value::Int(1))),
            ],
            vec![param("a", ParamKind::PosOrKw), param("b", ParamKind::PosOrKw)],
            None,
        );
        assert!(shape.is_ok());
    }

    #[test]
    fn test_required_after_optional_positional() {
        let err = InputShape::new(
            constructor(),
            vec![
                InputField::new("a", TypeExpr::int()).optional(FieldDefault::Value(Value::Int(1))),
                InputField::new("b", TypeExpr::int()),
            ],
            vec![param("a", ParamKind::PosOrKw), param("b", ParamKind::PosOrKw)],
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("follows optional"));
    }

    #[test]
    fn test_kw_only_may_follow_optional() {
        let shape = InputShape::new(
            constructor(),
            vec![
                InputField::new("a", TypeExpr::int()).optional(FieldDefault::Value(Value::Int(1))),
                InputField::new("b", TypeExpr::int()),
            ],
            vec![param("a", ParamKind::PosOrKw), param("b", ParamKind::KwOnly)],
            None,
        );
        assert!(shape.is_ok());
    }

    #[test]
    fn test_optional_positional_only_rejected() {
        let err = InputShape::new(
            constructor(),
            vec![InputField::new("a", TypeExpr::int()).optional(FieldDefault::Value(Value::Int(1)))],
            vec![param("a", ParamKind::PosOnly)],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidShape { .. }));
    }

    #[test]
    fn test_params_follow_field_order() {
        let err = InputShape::new(
            constructor(),
            vec![InputField::new("a", TypeExpr::int()), InputField::new("b", TypeExpr::int())],
            vec![param("b", ParamKind::PosOrKw), param("a", ParamKind::PosOrKw)],
            None,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_accessors() {
        let dict = Value::dict([("a", Value::Int(1))]);
        assert_eq!(Accessor::item("a", false).get(&dict), Ok(Value::Int(1)));
        assert!(matches!(
            Accessor::item("b", true).get(&dict),
            Err(AccessFailure::Missing { .. })
        ));
        assert!(matches!(Accessor::attr("a").get(&dict), Err(AccessFailure::Type { .. })));
    }

    #[test]
    fn test_factories_compare_by_identity() {
        let a = FieldDefault::factory(|| Value::Int(1));
        let b = FieldDefault::factory(|| Value::Int(1));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.produce(&Value::None), Some(Value::Int(1)));
    }
}
