//! Name layout providers
//!
//! [`BuiltinNameLayoutProvider`] plans the crowns of a model from the stacked
//! overlays. [`NameMappingProvider`] contributes one overlay of each kind;
//! it is bound to the models it configures with a predicate.

use crate::name_layout::crown::{DictExtraPolicy, OutCrown};
use crate::name_layout::crown_builder::{build_inp_crown, build_out_crown};
use crate::name_layout::extra::{
    collecting_with_list, dict_extra_policy, make_extra_policies, make_inp_extra_move, make_out_extra_move,
};
use crate::name_layout::name_style::NameStyle;
use crate::name_layout::overlay::{
    provide_schema, ExtraIn, ExtraOut, ExtraOverlay, ExtraOverlayRequest, ExtraSchema, NameMapEntry, Overlay,
    SievesOverlay, SievesOverlayRequest, SievesSchema, StructureOverlay, StructureOverlayRequest, StructureSchema,
};
use crate::name_layout::request::{InputNameLayoutRequest, OutputNameLayoutRequest};
use crate::name_layout::structure::{make_inp_structure, make_out_structure, make_sieves};
use crate::name_layout::{InputNameLayout, OutputNameLayout};
use crate::predicate::LocStackChecker;
use crate::provider::{Chain, Mediator, ProvideError, ProvideResult, Provider, Request};

/// Plans input and output crowns of models
#[derive(Debug, Clone, Default)]
pub struct BuiltinNameLayoutProvider;

impl Provider for BuiltinNameLayoutProvider {
    fn provide_input_name_layout(
        &self,
        mediator: &Mediator<'_>,
        request: &InputNameLayoutRequest,
    ) -> ProvideResult<InputNameLayout> {
        let extra: ExtraSchema = provide_schema(mediator, &request.loc_stack, ExtraOverlayRequest::new)?;
        let structure: StructureSchema = provide_schema(mediator, &request.loc_stack, StructureOverlayRequest::new)?;

        let extra_move = make_inp_extra_move(&extra, &request.shape)?;
        let targets = extra_move.as_ref().map(|m| m.targets().to_vec()).unwrap_or_default();
        let paths_to_leaves = make_inp_structure(mediator, request, &structure, &targets)?;
        let extra_policies = make_extra_policies(&extra, &paths_to_leaves)?;
        let crown = build_inp_crown(&extra_policies, paths_to_leaves, structure.as_list)?;
        if crown.is_list() && dict_extra_policy(&extra.extra_in) == DictExtraPolicy::Collect {
            return Err(collecting_with_list(&extra.extra_in).into());
        }
        log::trace!(
            "input crown of {} maps fields {:?}",
            request.loc_stack.last_type(),
            crown.field_ids()
        );
        Ok(InputNameLayout { crown, extra_move })
    }

    fn provide_output_name_layout(
        &self,
        mediator: &Mediator<'_>,
        request: &OutputNameLayoutRequest,
    ) -> ProvideResult<OutputNameLayout> {
        let extra: ExtraSchema = provide_schema(mediator, &request.loc_stack, ExtraOverlayRequest::new)?;
        let structure: StructureSchema = provide_schema(mediator, &request.loc_stack, StructureOverlayRequest::new)?;
        let sieves_schema: SievesSchema = provide_schema(mediator, &request.loc_stack, SievesOverlayRequest::new)?;

        let extra_move = make_out_extra_move(&extra, &request.shape)?;
        let targets = extra_move.as_ref().map(|m| m.targets().to_vec()).unwrap_or_default();
        let paths_to_leaves = make_out_structure(mediator, request, &structure, &targets)?;
        let sieves = make_sieves(mediator, request, &sieves_schema, &paths_to_leaves)?;
        let crown: OutCrown = build_out_crown(&sieves, paths_to_leaves, structure.as_list)?;
        log::trace!(
            "output crown of {} maps fields {:?}",
            request.loc_stack.last_type(),
            crown.field_ids()
        );
        Ok(OutputNameLayout { crown, extra_move })
    }
}

/// User settings of the name layout.
///
/// Unset options fall through to the next matching provider and finally to
/// the defaults. With `chain = None` the provider does not look further:
/// its unset options take the defaults directly.
#[derive(Debug, Clone)]
pub struct NameMappingProvider {
    structure: StructureOverlay,
    sieves: SievesOverlay,
    extra: ExtraOverlay,
    chain: Option<Chain>,
}

impl Default for NameMappingProvider {
    fn default() -> Self {
        NameMappingProvider {
            structure: StructureOverlay::default(),
            sieves: SievesOverlay::default(),
            extra: ExtraOverlay::default(),
            chain: Some(Chain::First),
        }
    }
}

impl NameMappingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip(mut self, checker: impl Into<LocStackChecker>) -> Self {
        self.structure.skip = Some(checker.into());
        self
    }

    pub fn only(mut self, checker: impl Into<LocStackChecker>) -> Self {
        self.structure.only = Some(checker.into());
        self
    }

    pub fn map(mut self, entry: NameMapEntry) -> Self {
        self.structure.map.get_or_insert_with(Vec::new).push(entry);
        self
    }

    pub fn trim_trailing_underscore(mut self, trim: bool) -> Self {
        self.structure.trim_trailing_underscore = Some(trim);
        self
    }

    pub fn name_style(mut self, style: NameStyle) -> Self {
        self.structure.name_style = Some(style);
        self
    }

    pub fn as_list(mut self, as_list: bool) -> Self {
        self.structure.as_list = Some(as_list);
        self
    }

    /// `true` omits every field whose value equals its default
    pub fn omit_default(mut self, omit: bool) -> Self {
        self.sieves.omit_default = Some(if omit {
            LocStackChecker::Any
        } else {
            !LocStackChecker::Any
        });
        self
    }

    /// Omit defaults of the fields matching `checker` only
    pub fn omit_default_of(mut self, checker: impl Into<LocStackChecker>) -> Self {
        self.sieves.omit_default = Some(checker.into());
        self
    }

    pub fn extra_in(mut self, extra_in: ExtraIn) -> Self {
        self.extra.extra_in = Some(extra_in);
        self
    }

    pub fn extra_out(mut self, extra_out: ExtraOut) -> Self {
        self.extra.extra_out = Some(extra_out);
        self
    }

    pub fn chain(mut self, chain: Option<Chain>) -> Self {
        self.chain = chain;
        self
    }

    fn chained<R>(&self, mediator: &Mediator<'_>, request: &R, own: &R::Response) -> ProvideResult<R::Response>
    where
        R: Request,
        R::Response: Overlay,
    {
        let Some(chain) = self.chain else {
            return Ok(own.clone());
        };
        let next = match mediator.provide_from_next(request) {
            Ok(next) => next,
            Err(ProvideError::CannotProvide(_)) => R::Response::default(),
            Err(fatal) => return Err(fatal),
        };
        Ok(match chain {
            Chain::First => own.clone().merge(next),
            Chain::Last => next.merge(own.clone()),
        })
    }
}

impl Provider for NameMappingProvider {
    fn provide_structure_overlay(
        &self,
        mediator: &Mediator<'_>,
        request: &StructureOverlayRequest,
    ) -> ProvideResult<StructureOverlay> {
        self.chained(mediator, request, &self.structure)
    }

    fn provide_sieves_overlay(
        &self,
        mediator: &Mediator<'_>,
        request: &SievesOverlayRequest,
    ) -> ProvideResult<SievesOverlay> {
        self.chained(mediator, request, &self.sieves)
    }

    fn provide_extra_overlay(&self, mediator: &Mediator<'_>, request: &ExtraOverlayRequest) -> ProvideResult<ExtraOverlay> {
        self.chained(mediator, request, &self.extra)
    }
}

#[cfg(test)]
mod tests;
