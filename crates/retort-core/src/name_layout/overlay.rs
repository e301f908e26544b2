//! Name mapping overlays
//!
//! Every `name_mapping` provider contributes partial settings (an overlay)
//! for the models it is bound to. Overlays stack: the setting of the earlier
//! provider wins, `map` entries are concatenated. The overlays of a class are
//! then stacked over the overlays of its base classes, and whatever remains
//! unset takes the built-in default.

use crate::location::LocStack;
use crate::morphing::{DumpError, LoadError};
use crate::name_layout::crown::{Key, KeyPath};
use crate::name_layout::name_style::NameStyle;
use crate::predicate::LocStackChecker;
use crate::provider::{Mediator, ProvideError, ProvideResult, Provider, Request};
use crate::shape::{identity_eq, FieldRef, ShapeRef};
use crate::types::TypeExpr;
use crate::value::Value;
use crate::{Error, Result};
use indexmap::IndexMap;
use std::sync::Arc;

/// Element of a user-written path; `Generated` stands for the key the field
/// would get without a map entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathElem {
    Key(String),
    Index(usize),
    Generated,
}

impl From<&str> for PathElem {
    fn from(key: &str) -> Self {
        PathElem::Key(key.to_string())
    }
}

impl From<String> for PathElem {
    fn from(key: String) -> Self {
        PathElem::Key(key)
    }
}

impl From<usize> for PathElem {
    fn from(index: usize) -> Self {
        PathElem::Index(index)
    }
}

/// Build a path from anything convertible to path elements
pub fn path<I, E>(elems: I) -> Vec<PathElem>
where
    I: IntoIterator<Item = E>,
    E: Into<PathElem>,
{
    elems.into_iter().map(Into::into).collect()
}

fn resolve_path(generated: &Key, elems: &[PathElem]) -> KeyPath {
    elems
        .iter()
        .map(|elem| match elem {
            PathElem::Key(key) => Key::Name(key.clone()),
            PathElem::Index(index) => Key::Index(*index),
            PathElem::Generated => generated.clone(),
        })
        .collect()
}

type MapFnBody = dyn Fn(ShapeRef<'_>, FieldRef<'_>) -> Option<Vec<PathElem>> + Send + Sync;

/// Computes the path of a field; `None` skips the field
#[derive(Clone)]
pub struct NameMapFn(Arc<MapFnBody>);

identity_eq!(NameMapFn);

impl NameMapFn {
    pub fn new(f: impl Fn(ShapeRef<'_>, FieldRef<'_>) -> Option<Vec<PathElem>> + Send + Sync + 'static) -> Self {
        NameMapFn(Arc::new(f))
    }
}

/// One rule of the `map` setting
#[derive(Debug, Clone)]
pub enum NameMapEntry {
    /// Field id to path, `None` skips the field
    Dict(IndexMap<String, Option<Vec<PathElem>>>),
    /// Every field matching the predicate gets this path
    Const(LocStackChecker, Option<Vec<PathElem>>),
    /// Every field matching the predicate gets the computed path
    Func(LocStackChecker, NameMapFn),
    /// Output fields whose id starts with an underscore are skipped
    SkipPrivate,
}

impl NameMapEntry {
    /// Field id to path mapping. Keys must be identifiers.
    pub fn dict<K, I>(entries: I) -> Result<Self>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Option<Vec<PathElem>>)>,
    {
        let map: IndexMap<String, Option<Vec<PathElem>>> = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let invalid: Vec<&String> = map.keys().filter(|key| !is_identifier(key)).collect();
        if !invalid.is_empty() {
            return Err(Error::InvalidPredicate {
                message: format!(
                    "keys of dict name mapping must be valid field ids, {:?} are not",
                    invalid
                ),
            });
        }
        Ok(NameMapEntry::Dict(map))
    }

    /// Rename fields: `renames([("timestamp", "ts")])`
    pub fn renames<K, V, I>(entries: I) -> Result<Self>
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::dict(
            entries
                .into_iter()
                .map(|(k, v)| (k, Some(vec![PathElem::Key(v.into())]))),
        )
    }

    /// `None` means the entry has no opinion about the field,
    /// `Some(None)` skips the field
    pub(crate) fn resolve(
        &self,
        mediator: &Mediator<'_>,
        field_loc_stack: &LocStack,
        shape: ShapeRef<'_>,
        field: FieldRef<'_>,
        generated: &Key,
    ) -> Result<Option<Option<KeyPath>>> {
        let result = match self {
            NameMapEntry::Dict(map) => match map.get(field.id()) {
                Some(target) => Some(target.as_deref().map(|elems| resolve_path(generated, elems))),
                None => None,
            },
            NameMapEntry::Const(checker, target) => {
                if mediator.check(checker, field_loc_stack)? {
                    Some(target.as_deref().map(|elems| resolve_path(generated, elems)))
                } else {
                    None
                }
            }
            NameMapEntry::Func(checker, func) => {
                if mediator.check(checker, field_loc_stack)? {
                    Some((func.0)(shape, field).map(|elems| resolve_path(generated, &elems)))
                } else {
                    None
                }
            }
            NameMapEntry::SkipPrivate => match field {
                FieldRef::Output(output) if output.id.starts_with('_') => Some(None),
                _ => None,
            },
        };
        Ok(result)
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

type SaturatorBody = dyn Fn(Value, &Value) -> std::result::Result<Value, LoadError> + Send + Sync;

/// Receives the built model and the collected extra data
#[derive(Clone)]
pub struct Saturator(Arc<SaturatorBody>);

identity_eq!(Saturator);

impl Saturator {
    pub fn new(f: impl Fn(Value, &Value) -> std::result::Result<Value, LoadError> + Send + Sync + 'static) -> Self {
        Saturator(Arc::new(f))
    }

    pub fn call(&self, model: Value, extra: &Value) -> std::result::Result<Value, LoadError> {
        (self.0)(model, extra)
    }
}

type ExtractorBody = dyn Fn(&Value) -> std::result::Result<Value, DumpError> + Send + Sync;

/// Produces a dict of extra data merged into the dumped model
#[derive(Clone)]
pub struct Extractor(Arc<ExtractorBody>);

identity_eq!(Extractor);

impl Extractor {
    pub fn new(f: impl Fn(&Value) -> std::result::Result<Value, DumpError> + Send + Sync + 'static) -> Self {
        Extractor(Arc::new(f))
    }

    pub fn call(&self, model: &Value) -> std::result::Result<Value, DumpError> {
        (self.0)(model)
    }
}

/// Policy for input data that no field is mapped to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExtraIn {
    /// Ignore it
    Skip,
    /// Fail with an extra-fields error
    Forbid,
    /// Pass it as keyword arguments to the constructor
    Kwargs,
    /// Load it into these fields
    Fields(Vec<String>),
    /// Hand it to a function after the model is built
    Saturate(Saturator),
}

impl ExtraIn {
    pub fn field(id: impl Into<String>) -> Self {
        ExtraIn::Fields(vec![id.into()])
    }
}

/// Source of extra output data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExtraOut {
    Skip,
    /// Merge the dumped dicts of these fields
    Fields(Vec<String>),
    Extract(Extractor),
}

impl ExtraOut {
    pub fn field(id: impl Into<String>) -> Self {
        ExtraOut::Fields(vec![id.into()])
    }
}

/// Overlays merge field by field, the receiver taking precedence
pub trait Overlay: Clone + Default + 'static {
    fn merge(self, old: Self) -> Self;
}

#[derive(Debug, Clone, Default)]
pub struct StructureOverlay {
    pub skip: Option<LocStackChecker>,
    pub only: Option<LocStackChecker>,
    pub map: Option<Vec<NameMapEntry>>,
    pub trim_trailing_underscore: Option<bool>,
    pub name_style: Option<NameStyle>,
    pub as_list: Option<bool>,
}

impl Overlay for StructureOverlay {
    fn merge(self, old: Self) -> Self {
        let map = match (self.map, old.map) {
            (Some(mut new), Some(old)) => {
                new.extend(old);
                Some(new)
            }
            (new, old) => new.or(old),
        };
        StructureOverlay {
            skip: self.skip.or(old.skip),
            only: self.only.or(old.only),
            map,
            trim_trailing_underscore: self.trim_trailing_underscore.or(old.trim_trailing_underscore),
            name_style: self.name_style.or(old.name_style),
            as_list: self.as_list.or(old.as_list),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SievesOverlay {
    pub omit_default: Option<LocStackChecker>,
}

impl Overlay for SievesOverlay {
    fn merge(self, old: Self) -> Self {
        SievesOverlay {
            omit_default: self.omit_default.or(old.omit_default),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExtraOverlay {
    pub extra_in: Option<ExtraIn>,
    pub extra_out: Option<ExtraOut>,
}

impl Overlay for ExtraOverlay {
    fn merge(self, old: Self) -> Self {
        ExtraOverlay {
            extra_in: self.extra_in.or(old.extra_in),
            extra_out: self.extra_out.or(old.extra_out),
        }
    }
}

/// Structure settings with defaults applied
#[derive(Debug, Clone)]
pub struct StructureSchema {
    pub skip: LocStackChecker,
    pub only: LocStackChecker,
    pub map: Vec<NameMapEntry>,
    pub trim_trailing_underscore: bool,
    pub name_style: Option<NameStyle>,
    pub as_list: bool,
}

impl From<StructureOverlay> for StructureSchema {
    fn from(overlay: StructureOverlay) -> Self {
        let mut map = overlay.map.unwrap_or_default();
        map.push(NameMapEntry::SkipPrivate);
        StructureSchema {
            skip: overlay.skip.unwrap_or_else(|| !LocStackChecker::Any),
            only: overlay.only.unwrap_or(LocStackChecker::Any),
            map,
            trim_trailing_underscore: overlay.trim_trailing_underscore.unwrap_or(true),
            name_style: overlay.name_style,
            as_list: overlay.as_list.unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SievesSchema {
    pub omit_default: LocStackChecker,
}

impl From<SievesOverlay> for SievesSchema {
    fn from(overlay: SievesOverlay) -> Self {
        SievesSchema {
            omit_default: overlay.omit_default.unwrap_or_else(|| !LocStackChecker::Any),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtraSchema {
    pub extra_in: ExtraIn,
    pub extra_out: ExtraOut,
}

impl From<ExtraOverlay> for ExtraSchema {
    fn from(overlay: ExtraOverlay) -> Self {
        ExtraSchema {
            extra_in: overlay.extra_in.unwrap_or(ExtraIn::Skip),
            extra_out: overlay.extra_out.unwrap_or(ExtraOut::Skip),
        }
    }
}

macro_rules! overlay_request {
    ($request:ident, $overlay:ty, $method:ident, $what:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $request {
            pub loc_stack: LocStack,
        }

        impl $request {
            pub fn new(loc_stack: LocStack) -> Self {
                $request { loc_stack }
            }
        }

        impl Request for $request {
            type Response = $overlay;

            fn describe(&self) -> String {
                format!(concat!($what, " for type {}"), self.loc_stack.last_type())
            }

            fn loc_stack(&self) -> Option<&LocStack> {
                Some(&self.loc_stack)
            }

            fn dispatch(&self, provider: &dyn Provider, mediator: &Mediator<'_>) -> ProvideResult<$overlay> {
                provider.$method(mediator, self)
            }
        }
    };
}

overlay_request!(StructureOverlayRequest, StructureOverlay, provide_structure_overlay, "structure overlay");
overlay_request!(SievesOverlayRequest, SievesOverlay, provide_sieves_overlay, "sieves overlay");
overlay_request!(ExtraOverlayRequest, ExtraOverlay, provide_extra_overlay, "extra overlay");

/// Overlay for `loc_stack` stacked over the overlays of the base classes,
/// converted into a schema
pub(crate) fn provide_schema<R, S>(
    mediator: &Mediator<'_>,
    loc_stack: &LocStack,
    make: impl Fn(LocStack) -> R,
) -> ProvideResult<S>
where
    R: Request,
    R::Response: Overlay,
    S: From<R::Response>,
{
    let mut stacked = provide_or_default(mediator, &make(loc_stack.clone()))?;
    let norm = mediator.normalize(loc_stack.last_type())?;
    if let Some(class) = norm.class() {
        for parent in class.ancestors() {
            let parent_stack = loc_stack.replace_last_type(TypeExpr::from(&parent));
            let parent_overlay = provide_or_default(mediator, &make(parent_stack))?;
            stacked = stacked.merge(parent_overlay);
        }
    }
    Ok(S::from(stacked))
}

fn provide_or_default<R>(mediator: &Mediator<'_>, request: &R) -> ProvideResult<R::Response>
where
    R: Request,
    R::Response: Overlay,
{
    match mediator.delegating_provide(request) {
        Ok(overlay) => Ok(overlay),
        Err(ProvideError::CannotProvide(_)) => Ok(R::Response::default()),
        Err(fatal) => Err(fatal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structure_merge_prefers_receiver() {
        let new = StructureOverlay {
            as_list: Some(true),
            map: Some(vec![NameMapEntry::renames([("a", "x")]).unwrap()]),
            ..StructureOverlay::default()
        };
        let old = StructureOverlay {
            as_list: Some(false),
            trim_trailing_underscore: Some(false),
            map: Some(vec![NameMapEntry::SkipPrivate]),
            ..StructureOverlay::default()
        };
        let merged = new.merge(old);
        assert_eq!(merged.as_list, Some(true));
        assert_eq!(merged.trim_trailing_underscore, Some(false));
        let map = merged.map.unwrap();
        assert_eq!(map.len(), 2);
        assert!(matches!(map[0], NameMapEntry::Dict(_)));
    }

    #[test]
    fn test_schema_defaults() {
        let schema = StructureSchema::from(StructureOverlay::default());
        assert!(schema.trim_trailing_underscore);
        assert!(!schema.as_list);
        assert!(schema.name_style.is_none());
        assert!(matches!(schema.map.last(), Some(NameMapEntry::SkipPrivate)));

        let extra = ExtraSchema::from(ExtraOverlay::default());
        assert_eq!(extra.extra_in, ExtraIn::Skip);
        assert_eq!(extra.extra_out, ExtraOut::Skip);
    }

    #[test]
    fn test_dict_keys_must_be_identifiers() {
        assert!(NameMapEntry::renames([("user-id", "x")]).is_err());
        assert!(NameMapEntry::renames([("user_id", "x")]).is_ok());
    }

    #[test]
    fn test_generated_placeholder() {
        let generated = Key::from("name");
        let resolved = resolve_path(&generated, &[PathElem::from("meta"), PathElem::Generated]);
        assert_eq!(resolved, vec![Key::from("meta"), Key::from("name")]);
    }
}
