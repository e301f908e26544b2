//! Name layout planning
//!
//! Decides where every model field lives on the wire. The planner takes a
//! shape and the stacked `name_mapping` settings and produces a crown for
//! each side, plus the extra data moves the generated code performs.
//!
//! - [`overlay`] - user settings and their stacking
//! - [`structure`] - field to path mapping and validation
//! - [`extra`] - extra data policies and moves
//! - [`crown_builder`] - assembling the crown tree
//! - [`name_style`] - snake_case conversions
//!
//! Copyright (c) 2025 Retort Team
//! Licensed under the Apache-2.0 license

pub mod crown;
pub mod crown_builder;
pub mod extra;
pub mod name_style;
pub mod overlay;
pub mod provider;
pub mod request;
pub mod structure;

pub use crown::{
    DictExtraPolicy, InpCrown, InpDictCrown, InpListCrown, Key, KeyPath, ListExtraPolicy, OutCrown, OutDictCrown,
    OutListCrown, Sieve,
};
pub use extra::{InpExtraMove, OutExtraMove};
pub use name_style::{convert_snake_style, NameStyle};
pub use overlay::{
    path, ExtraIn, ExtraOut, ExtraOverlay, ExtraOverlayRequest, Extractor, NameMapEntry, NameMapFn, PathElem,
    Saturator, SievesOverlay, SievesOverlayRequest, StructureOverlay, StructureOverlayRequest,
};
pub use provider::{BuiltinNameLayoutProvider, NameMappingProvider};
pub use request::{InputNameLayoutRequest, OutputNameLayoutRequest};

/// Planned input side of a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputNameLayout {
    pub crown: InpCrown,
    pub extra_move: Option<InpExtraMove>,
}

/// Planned output side of a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNameLayout {
    pub crown: OutCrown,
    pub extra_move: Option<OutExtraMove>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn test_input_layout_clone_is_equal() {
        let layout = InputNameLayout {
            crown: InpCrown::Dict(InpDictCrown {
                map: IndexMap::from([("userName".to_string(), InpCrown::Field("user_name".to_string()))]),
                extra_policy: DictExtraPolicy::Collect,
            }),
            extra_move: Some(InpExtraMove::Targets(vec!["rest".to_string()])),
        };
        assert_eq!(layout.clone(), layout);

        let without_extra = InputNameLayout {
            extra_move: None,
            ..layout.clone()
        };
        assert_ne!(without_extra, layout);
    }
}
