//! Dynamic values shared by models and wire data
//!
//! Loaders consume and dumpers produce the same universe of values: scalars,
//! date/time values, ordered containers, enum members and model instances.
//! Equality is structural and type-exact (`Int(0)` never equals `Bool(false)`),
//! floats compare by bit pattern so that every value is hashable.
//!
//! Copyright (c) 2025 Retort Team
//! Licensed under the Apache-2.0 license

use crate::types::ClassRef;
use crate::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::{IndexMap, IndexSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A dynamically typed value
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    DateTime(DateTime<FixedOffset>),
    NaiveDateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Set(IndexSet<Value>),
    Dict(IndexMap<Value, Value>),
    Enum(EnumValue),
    Instance(Instance),
}

/// A member of an enum class
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub class: ClassRef,
    pub name: String,
    pub value: Box<Value>,
}

/// An instance of a user class with named attributes
#[derive(Debug, Clone)]
pub struct Instance(Arc<InstanceData>);

#[derive(Debug)]
struct InstanceData {
    class: ClassRef,
    attrs: IndexMap<String, Value>,
}

impl Instance {
    pub fn new(class: ClassRef, attrs: IndexMap<String, Value>) -> Self {
        Instance(Arc::new(InstanceData { class, attrs }))
    }

    pub fn class(&self) -> &ClassRef {
        &self.0.class
    }

    pub fn attrs(&self) -> &IndexMap<String, Value> {
        &self.0.attrs
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.attrs.get(name)
    }

    /// Copy of this instance with one attribute replaced or added
    pub fn with_attr(&self, name: impl Into<String>, value: Value) -> Instance {
        let mut attrs = self.0.attrs.clone();
        attrs.insert(name.into(), value);
        Instance::new(self.0.class.clone(), attrs)
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.class == other.0.class && self.0.attrs == other.0.attrs)
    }
}

impl Eq for Instance {}

impl Hash for Instance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.class.hash(state);
        unordered_hash(self.0.attrs.iter(), state);
    }
}

fn unordered_hash<H: Hasher, I, T>(items: I, state: &mut H)
where
    I: Iterator<Item = T>,
    T: Hash,
{
    let mut acc: u64 = 0;
    let mut len: usize = 0;
    for item in items {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        item.hash(&mut hasher);
        acc = acc.wrapping_add(hasher.finish());
        len += 1;
    }
    len.hash(state);
    acc.hash(state);
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b && a.offset() == b.offset(),
            (Value::NaiveDateTime(a), Value::NaiveDateTime(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Instance(a), Value::Instance(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::None => {}
            Value::Bool(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Str(v) => v.hash(state),
            Value::Bytes(v) => v.hash(state),
            Value::DateTime(v) => {
                v.hash(state);
                v.offset().local_minus_utc().hash(state);
            }
            Value::NaiveDateTime(v) => v.hash(state),
            Value::Date(v) => v.hash(state),
            Value::Time(v) => v.hash(state),
            Value::List(v) | Value::Tuple(v) => v.hash(state),
            Value::Set(v) => unordered_hash(v.iter(), state),
            Value::Dict(v) => unordered_hash(v.iter(), state),
            Value::Enum(v) => v.hash(state),
            Value::Instance(v) => v.hash(state),
        }
    }
}

impl Value {
    pub fn str(value: impl Into<String>) -> Self {
        Value::Str(value.into())
    }

    /// Build a dict from string keys
    pub fn dict<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Dict(
            entries
                .into_iter()
                .map(|(key, value)| (Value::Str(key.into()), value))
                .collect(),
        )
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(items.into_iter().collect())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&IndexMap<Value, Value>> {
        match self {
            Value::Dict(map) => Some(map),
            _ => None,
        }
    }

    /// Items of a list or tuple
    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    /// Read a string-keyed entry of a dict
    pub fn get_item(&self, key: &str) -> Option<&Value> {
        self.as_dict()?.get(&Value::Str(key.to_string()))
    }

    /// Read an attribute of an instance
    pub fn get_attr(&self, name: &str) -> Option<&Value> {
        self.as_instance()?.get(name)
    }

    /// Short name of the value's runtime type
    pub fn type_name(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Str(_) => "str".to_string(),
            Value::Bytes(_) => "bytes".to_string(),
            Value::DateTime(_) | Value::NaiveDateTime(_) => "datetime".to_string(),
            Value::Date(_) => "date".to_string(),
            Value::Time(_) => "time".to_string(),
            Value::List(_) => "list".to_string(),
            Value::Tuple(_) => "tuple".to_string(),
            Value::Set(_) => "set".to_string(),
            Value::Dict(_) => "dict".to_string(),
            Value::Enum(member) => member.class.name().to_string(),
            Value::Instance(instance) => instance.class().name().to_string(),
        }
    }

    /// Equality that treats numbers and booleans the way dynamic languages do:
    /// `1 == 1.0 == True`. Containers compare element-wise with the same rule.
    pub fn loose_eq(&self, other: &Value) -> bool {
        fn number(value: &Value) -> Option<f64> {
            match value {
                Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                Value::Int(i) => Some(*i as f64),
                Value::Float(f) => Some(*f),
                _ => None,
            }
        }
        if let (Some(a), Some(b)) = (number(self), number(other)) {
            return a == b;
        }
        match (self, other) {
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Dict(a), Value::Dict(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other| v.loose_eq(other)))
            }
            _ => self == other,
        }
    }

    /// Build a value from JSON data.
    ///
    /// Integers outside the `i64` range have no `Int` form and become the
    /// nearest `Float`, so a strict `int` loader rejects them instead of
    /// receiving a truncated number.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(map) => Value::Dict(
                map.iter()
                    .map(|(key, value)| (Value::Str(key.clone()), Value::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Convert to JSON data.
    ///
    /// Only wire-shaped values are accepted: instances must be dumped first.
    /// Date/time values are written in ISO 8601, enum members as their value.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(match self {
            Value::None => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| Error::InvalidValue {
                    message: format!("float {} has no JSON representation", f),
                })?,
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(_) => {
                return Err(Error::InvalidValue {
                    message: "bytes must be dumped to a string before JSON encoding".to_string(),
                })
            }
            Value::DateTime(dt) => serde_json::Value::String(dt.to_rfc3339()),
            Value::NaiveDateTime(dt) => serde_json::Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            Value::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
            Value::Time(t) => serde_json::Value::String(t.format("%H:%M:%S%.f").to_string()),
            Value::List(items) | Value::Tuple(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect::<Result<_>>()?)
            }
            Value::Set(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect::<Result<_>>()?)
            }
            Value::Dict(map) => {
                let mut object = serde_json::Map::with_capacity(map.len());
                for (key, value) in map {
                    let key = match key {
                        Value::Str(s) => s.clone(),
                        Value::Int(i) => i.to_string(),
                        Value::Bool(b) => b.to_string(),
                        other => {
                            return Err(Error::InvalidValue {
                                message: format!("dict key {} cannot be a JSON object key", other),
                            })
                        }
                    };
                    object.insert(key, value.to_json()?);
                }
                serde_json::Value::Object(object)
            }
            Value::Enum(member) => member.value.to_json()?,
            Value::Instance(instance) => {
                return Err(Error::InvalidValue {
                    message: format!(
                        "instance of {} must be dumped before JSON encoding",
                        instance.class().name()
                    ),
                })
            }
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: impl Iterator<Item = impl fmt::Display>) -> fmt::Result {
            for (i, item) in items.enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", item)?;
            }
            Ok(())
        }

        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) if x.fract() == 0.0 && x.is_finite() => write!(f, "{:.1}", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Bytes(b) => write!(f, "b{:?}", String::from_utf8_lossy(b)),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::NaiveDateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            Value::Date(d) => write!(f, "{}", d),
            Value::Time(t) => write!(f, "{}", t),
            Value::List(items) => {
                write!(f, "[")?;
                join(f, items.iter())?;
                write!(f, "]")
            }
            Value::Tuple(items) => {
                write!(f, "(")?;
                join(f, items.iter())?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::Set(items) => {
                write!(f, "{{")?;
                join(f, items.iter())?;
                write!(f, "}}")
            }
            Value::Dict(map) => {
                write!(f, "{{")?;
                join(f, map.iter().map(|(k, v)| format!("{}: {}", k, v)))?;
                write!(f, "}}")
            }
            Value::Enum(member) => write!(f, "{}.{}", member.class.name(), member.name),
            Value::Instance(instance) => {
                write!(f, "{}(", instance.class().name())?;
                join(f, instance.attrs().iter().map(|(k, v)| format!("{}={}", k, v)))?;
                write!(f, ")")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<Instance> for Value {
    fn from(v: Instance) -> Self {
        Value::Instance(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::None, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_equality_is_type_exact() {
        assert_ne!(Value::Int(0), Value::Bool(false));
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert!(Value::Int(1).loose_eq(&Value::Float(1.0)));
        assert!(Value::Bool(false).loose_eq(&Value::Int(0)));
    }

    #[test]
    fn test_dict_hash_ignores_order() {
        let a = Value::dict([("x", Value::Int(1)), ("y", Value::Int(2))]);
        let b = Value::dict([("y", Value::Int(2)), ("x", Value::Int(1))]);
        assert_eq!(a, b);
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_json_conversion() {
        let json = json!({"title": "F451", "price": 100, "tags": ["a"], "rating": 4.5, "extra": null});
        let value = Value::from_json(&json);
        assert_eq!(value.get_item("price"), Some(&Value::Int(100)));
        assert_eq!(value.to_json().unwrap(), json);
    }

    #[test]
    fn test_json_integer_beyond_i64_becomes_float() {
        let value = Value::from_json(&json!(u64::MAX));
        assert_eq!(value, Value::Float(u64::MAX as f64));
        assert_eq!(Value::from_json(&json!(i64::MIN)), Value::Int(i64::MIN));
    }

    #[test]
    fn test_instances_must_be_dumped_before_json() {
        let err = Value::Bytes(vec![1]).to_json().unwrap_err();
        assert!(matches!(err, Error::InvalidValue { .. }));
    }

    #[test]
    fn test_display() {
        let value = Value::list([Value::from("a"), Value::Int(1), Value::None, Value::Bool(true)]);
        assert_eq!(value.to_string(), "[\"a\", 1, None, True]");
        assert_eq!(Value::Tuple(vec![Value::Int(1)]).to_string(), "(1,)");
    }
}
