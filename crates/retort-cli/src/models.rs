//! Declarative model files
//!
//! A model file declares classes and the name-mapping rules applied to
//! them:
//!
//! ```yaml
//! models:
//!   - name: Book
//!     fields:
//!       - { name: title, type: str }
//!       - { name: price, type: int }
//!       - { name: author, type: "Optional[Person]", default: null }
//!     name_mapping:
//!       name_style: camelCase
//!       rename: { price: cost }
//!   - name: Person
//!     fields:
//!       - { name: name, type: str }
//!   - name: Color
//!     kind: enum
//!     members: { RED: red, BLUE: blue }
//! ```
//!
//! Field types use the textual type syntax; class names may refer to
//! models declared later in the file or to the model itself.

use crate::config::FileFormat;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use retort_core::name_layout::PathElem;
use retort_core::predicate::P;
use retort_core::types::{ClassDef, ClassRef, Namespace, RecordField, TypeExpr};
use retort_core::{
    name_mapping, ExtraIn, ExtraOut, LocStackChecker, NameMapEntry, NameMappingProvider, NameStyle, Provider,
    Retort, RetortConfig, Value,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Top-level model file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelFile {
    #[serde(default)]
    pub models: Vec<ModelDecl>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    Record,
    TypedDict,
    NamedTuple,
    Enum,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDecl {
    pub name: String,
    #[serde(default)]
    pub kind: ModelKind,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    /// Enum members, name to value
    #[serde(default)]
    pub members: IndexMap<String, serde_json::Value>,
    /// Typed dicts only: whether keys are required by default
    #[serde(default = "default_total")]
    pub total: bool,
    /// Records only: every field is keyword-only
    #[serde(default)]
    pub kw_only: bool,
    /// Records only: type of extra keyword arguments
    #[serde(default)]
    pub kwargs: Option<String>,
    pub name_mapping: Option<NameMappingDecl>,
}

fn default_total() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub type_expr: String,
    /// Present, even as `null`, when the field has a default
    #[serde(default, deserialize_with = "present")]
    pub default: Option<serde_json::Value>,
}

/// Distinguishes `default: null` from a missing key
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NameMappingDecl {
    pub name_style: Option<NameStyle>,
    /// Field id to wire key
    #[serde(default)]
    pub rename: IndexMap<String, String>,
    /// Field id to nested wire path
    #[serde(default)]
    pub paths: IndexMap<String, Vec<PathStep>>,
    #[serde(default)]
    pub skip: Vec<String>,
    #[serde(default)]
    pub only: Vec<String>,
    #[serde(default)]
    pub as_list: bool,
    #[serde(default)]
    pub omit_default: bool,
    #[serde(default)]
    pub trim_trailing_underscore: Option<bool>,
    pub extra_in: Option<ExtraDecl>,
    pub extra_out: Option<ExtraDecl>,
}

/// One element of a nested wire path: a key or a list index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathStep {
    Index(usize),
    Key(String),
}

/// `skip`, `forbid` (input only), `kwargs` (input only) or `{ field: <id> }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraDecl {
    Skip,
    Forbid,
    Kwargs,
    Field(String),
}

/// Declared models, resolved into classes
#[derive(Debug, Clone)]
pub struct Models {
    pub namespace: Namespace,
    pub classes: Vec<ClassRef>,
    pub recipe: Vec<Arc<dyn Provider>>,
}

impl ModelFile {
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let format = FileFormat::of(path);
        format.parse(&content).map_err(|err| {
            tracing::debug!("cannot parse {}: {}", path.display(), err);
            Error::InvalidFormat {
                path: path.to_path_buf(),
                expected: format!("{:?} model file ({})", format, err),
            }
        })
    }

    /// Build classes, their namespace and the name-mapping recipe
    pub fn resolve(&self) -> Result<Models> {
        let mut namespace = Namespace::new();
        let mut classes = Vec::with_capacity(self.models.len());
        for decl in &self.models {
            if namespace.class(&decl.name).is_some() {
                return Err(Error::invalid_model(&decl.name, "declared twice"));
            }
            let class = decl.build()?;
            namespace.insert(&class);
            classes.push(class);
        }

        let mut recipe = Vec::new();
        for (decl, class) in self.models.iter().zip(&classes) {
            if let Some(mapping) = &decl.name_mapping {
                recipe.push(name_mapping(class, mapping.provider(&decl.name)?));
            }
        }
        tracing::debug!(models = classes.len(), mappings = recipe.len(), "Resolved model file");

        Ok(Models {
            namespace,
            classes,
            recipe,
        })
    }
}

fn parse_type(model: &str, text: &str) -> Result<TypeExpr> {
    TypeExpr::parse(text).map_err(|err| Error::invalid_model(model, format!("bad type {:?}: {}", text, err)))
}

impl ModelDecl {
    fn build(&self) -> Result<ClassRef> {
        if self.kind != ModelKind::Enum && !self.members.is_empty() {
            return Err(Error::invalid_model(&self.name, "only enums declare members"));
        }
        if self.kind != ModelKind::Record && (self.kw_only || self.kwargs.is_some()) {
            return Err(Error::invalid_model(&self.name, "kw_only and kwargs apply to records only"));
        }
        match self.kind {
            ModelKind::Record => {
                let mut builder = ClassDef::record(&self.name);
                for field in &self.fields {
                    let mut def = RecordField::new(&field.name, parse_type(&self.name, &field.type_expr)?);
                    if let Some(default) = &field.default {
                        def = def.default(Value::from_json(default));
                    }
                    builder = builder.field_def(def);
                }
                if self.kw_only {
                    builder = builder.kw_only();
                }
                if let Some(kwargs) = &self.kwargs {
                    builder = builder.kwargs(parse_type(&self.name, kwargs)?);
                }
                Ok(builder.build())
            }
            ModelKind::TypedDict => {
                let mut builder = ClassDef::typed_dict(&self.name).total(self.total);
                for field in &self.fields {
                    if field.default.is_some() {
                        return Err(Error::invalid_model(&self.name, "typed dict fields cannot have defaults"));
                    }
                    builder = builder.field(&field.name, parse_type(&self.name, &field.type_expr)?);
                }
                Ok(builder.build())
            }
            ModelKind::NamedTuple => {
                let mut builder = ClassDef::named_tuple(&self.name);
                for field in &self.fields {
                    let ty = parse_type(&self.name, &field.type_expr)?;
                    builder = match &field.default {
                        Some(default) => builder.field_default(&field.name, ty, Value::from_json(default)),
                        None => builder.field(&field.name, ty),
                    };
                }
                Ok(builder.build())
            }
            ModelKind::Enum => {
                if !self.fields.is_empty() {
                    return Err(Error::invalid_model(&self.name, "enums declare members, not fields"));
                }
                let mut builder = ClassDef::enumeration(&self.name);
                for (name, value) in &self.members {
                    builder = builder.member(name, Value::from_json(value));
                }
                Ok(builder.build())
            }
        }
    }
}

fn any_field(names: &[String]) -> Option<LocStackChecker> {
    names
        .iter()
        .map(|name| LocStackChecker::from(P::field(name.as_str())))
        .reduce(|acc, checker| acc | checker)
}

impl NameMappingDecl {
    fn provider(&self, model: &str) -> Result<NameMappingProvider> {
        let mut provider = NameMappingProvider::new().as_list(self.as_list).omit_default(self.omit_default);
        if let Some(style) = self.name_style {
            provider = provider.name_style(style);
        }
        if let Some(trim) = self.trim_trailing_underscore {
            provider = provider.trim_trailing_underscore(trim);
        }
        if let Some(skip) = any_field(&self.skip) {
            provider = provider.skip(skip);
        }
        if let Some(only) = any_field(&self.only) {
            provider = provider.only(only);
        }
        if !self.rename.is_empty() {
            let entry = NameMapEntry::renames(self.rename.iter().map(|(k, v)| (k.clone(), v.clone())))
                .map_err(|err| Error::invalid_model(model, err.to_string()))?;
            provider = provider.map(entry);
        }
        if !self.paths.is_empty() {
            let entry = NameMapEntry::dict(self.paths.iter().map(|(field, steps)| {
                let path = steps
                    .iter()
                    .map(|step| match step {
                        PathStep::Key(key) => PathElem::Key(key.clone()),
                        PathStep::Index(index) => PathElem::Index(*index),
                    })
                    .collect();
                (field.clone(), Some(path))
            }))
            .map_err(|err| Error::invalid_model(model, err.to_string()))?;
            provider = provider.map(entry);
        }
        if let Some(extra) = &self.extra_in {
            provider = provider.extra_in(match extra {
                ExtraDecl::Skip => ExtraIn::Skip,
                ExtraDecl::Forbid => ExtraIn::Forbid,
                ExtraDecl::Kwargs => ExtraIn::Kwargs,
                ExtraDecl::Field(id) => ExtraIn::field(id.as_str()),
            });
        }
        if let Some(extra) = &self.extra_out {
            provider = provider.extra_out(match extra {
                ExtraDecl::Skip => ExtraOut::Skip,
                ExtraDecl::Field(id) => ExtraOut::field(id.as_str()),
                other => {
                    return Err(Error::invalid_model(
                        model,
                        format!("extra_out cannot be {:?}", other),
                    ))
                }
            });
        }
        Ok(provider)
    }
}

impl Models {
    /// A retort for these models
    pub fn retort(&self, config: RetortConfig) -> Retort {
        Retort::with_recipe(self.recipe.iter().cloned())
            .with_namespace(self.namespace.clone())
            .replace(config)
    }

    /// Parse a type expression, resolving declared class names
    pub fn parse_type(&self, text: &str) -> Result<TypeExpr> {
        Ok(TypeExpr::parse_in(text, &self.namespace)?)
    }
}
