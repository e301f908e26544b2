//! Converter producers
//!
//! A converter is the top-level coercer between two types, wrapped with a
//! name and the list of extra parameters it takes.

use crate::conversion::{CoercerRequest, ConversionContext, Converter, ConverterRequest};
use crate::location::{Loc, LocStack};
use crate::provider::{CannotProvide, Mediator, ProvideResult, Provider, Recipe};
use crate::types::TypeExpr;
use crate::{Result, Retort};
use std::collections::HashSet;
use std::sync::Arc;

/// Builds converters out of the coercer for the requested pair of types
#[derive(Debug, Clone, Default)]
pub struct BuiltinConverterProvider;

impl Provider for BuiltinConverterProvider {
    fn provide_converter(&self, mediator: &Mediator<'_>, request: &ConverterRequest) -> ProvideResult<Converter> {
        let mut seen = HashSet::new();
        for (name, _) in &request.params {
            if !seen.insert(name.as_str()) {
                return Err(CannotProvide::terminal(format!("Converter parameter ‹{}› is declared twice", name)).into());
            }
        }

        let ctx = ConversionContext::new(
            request
                .params
                .iter()
                .map(|(name, ty)| Loc::field(name.clone(), ty.clone()))
                .collect(),
        );
        let coercer_request = CoercerRequest::new(
            LocStack::from_type(request.src.clone()),
            ctx,
            LocStack::from_type(request.dst.clone()),
        );
        let coercer = mediator.mandatory_provide(&coercer_request, |_| {
            format!("Cannot create top-level coercer from {} to {}", request.src, request.dst)
        })?;

        let name = request
            .name
            .clone()
            .unwrap_or_else(|| format!("convert_{}_to_{}", type_slug(&request.src), type_slug(&request.dst)));
        let params = request.params.iter().map(|(name, _)| name.clone()).collect();
        Ok(Converter::new(name, params, coercer))
    }
}

fn type_slug(ty: &TypeExpr) -> String {
    ty.to_string()
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Describes a converter with extra parameters and its own recipe
///
/// ```no_run
/// use retort_core::{conversion::ConverterBuilder, types::TypeExpr, Retort};
///
/// let retort = Retort::new();
/// let converter = ConverterBuilder::new(TypeExpr::int(), TypeExpr::str())
///     .name("stringify")
///     .build(&retort);
/// ```
#[derive(Debug, Clone)]
pub struct ConverterBuilder {
    request: ConverterRequest,
    recipe: Recipe,
}

impl ConverterBuilder {
    pub fn new(src: impl Into<TypeExpr>, dst: impl Into<TypeExpr>) -> Self {
        ConverterBuilder {
            request: ConverterRequest::new(src.into(), dst.into()),
            recipe: Recipe::new(),
        }
    }

    /// Add an extra parameter passed to the converter after the source value
    pub fn param(mut self, name: impl Into<String>, ty: impl Into<TypeExpr>) -> Self {
        self.request.params.push((name.into(), ty.into()));
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.request.name = Some(name.into());
        self
    }

    /// Providers used only for this converter, ahead of the retort's own
    pub fn recipe(mut self, providers: impl IntoIterator<Item = Arc<dyn Provider>>) -> Self {
        self.recipe.extend(providers);
        self
    }

    pub fn build(&self, retort: &Retort) -> Result<Converter> {
        retort.produce_converter(&self.request, &self.recipe)
    }
}
