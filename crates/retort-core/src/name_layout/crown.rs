//! Crowns
//!
//! A crown is the wire-side tree of a model: nested dicts and lists whose
//! leaves are model fields. `None` leaves pad list positions that no field
//! occupies. The input crown also carries the policy for unknown keys, the
//! output crown the sieves that drop fields while dumping.

use crate::shape::FieldDefault;
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;

/// One step of a wire path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Name(String),
    Index(usize),
}

impl Key {
    pub fn to_value(&self) -> Value {
        match self {
            Key::Name(name) => Value::str(name.clone()),
            Key::Index(index) => Value::Int(*index as i64),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => write!(f, "{:?}", name),
            Key::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

/// Path from the crown root to a leaf
pub type KeyPath = Vec<Key>;

pub(crate) fn render_path(path: &[Key]) -> String {
    let items: Vec<String> = path.iter().map(Key::to_string).collect();
    format!("({})", items.join(", "))
}

/// What to do with dict keys no field is mapped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DictExtraPolicy {
    Skip,
    Forbid,
    Collect,
}

/// What to do with list items past the last mapped position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListExtraPolicy {
    Skip,
    Forbid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InpCrown {
    Dict(InpDictCrown),
    List(InpListCrown),
    Field(String),
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InpDictCrown {
    pub map: IndexMap<String, InpCrown>,
    pub extra_policy: DictExtraPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InpListCrown {
    pub map: Vec<InpCrown>,
    pub extra_policy: ListExtraPolicy,
}

/// Decides whether a dumped field is emitted.
///
/// A sieve drops the field when its value equals the declared default.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sieve {
    default: FieldDefault,
}

impl Sieve {
    pub fn omit_default(default: FieldDefault) -> Self {
        Sieve { default }
    }

    /// `true` keeps the field
    pub fn keeps(&self, model: &Value, value: &Value) -> bool {
        match self.default.produce(model) {
            Some(default) => *value != default,
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutCrown {
    Dict(OutDictCrown),
    List(OutListCrown),
    Field(String),
    /// Emits the placeholder at a position no field occupies
    None(FieldDefault),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutDictCrown {
    pub map: IndexMap<String, OutCrown>,
    pub sieves: IndexMap<String, Sieve>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutListCrown {
    pub map: Vec<OutCrown>,
}

impl InpCrown {
    /// Ids of all field leaves, in crown order
    pub fn field_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids<'a>(&'a self, ids: &mut Vec<&'a str>) {
        match self {
            InpCrown::Dict(dict) => dict.map.values().for_each(|c| c.collect_ids(ids)),
            InpCrown::List(list) => list.map.iter().for_each(|c| c.collect_ids(ids)),
            InpCrown::Field(id) => ids.push(id),
            InpCrown::None => {}
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, InpCrown::List(_))
    }
}

impl OutCrown {
    pub fn field_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids<'a>(&'a self, ids: &mut Vec<&'a str>) {
        match self {
            OutCrown::Dict(dict) => dict.map.values().for_each(|c| c.collect_ids(ids)),
            OutCrown::List(list) => list.map.iter().for_each(|c| c.collect_ids(ids)),
            OutCrown::Field(id) => ids.push(id),
            OutCrown::None(_) => {}
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, OutCrown::List(_))
    }
}
