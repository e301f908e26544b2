//! Extra data handling
//!
//! Turns the extra settings into the moves the generated code performs
//! (where collected or extracted extra data goes) and into the policies
//! attached to each dict crown of the input side.

use crate::name_layout::crown::{DictExtraPolicy, InpCrown, Key, KeyPath};
use crate::name_layout::overlay::{ExtraIn, ExtraOut, ExtraSchema, Extractor, Saturator};
use crate::provider::{CannotProvide, ProvideResult};
use crate::shape::{InputShape, OutputShape};
use indexmap::IndexMap;

/// Where the loader puts collected extra data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InpExtraMove {
    /// Loaded into these fields
    Targets(Vec<String>),
    /// Spread into the constructor's keyword arguments
    Kwargs,
    Saturate(Saturator),
}

/// Where the dumper takes extra data from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OutExtraMove {
    /// Dicts read from these fields
    Targets(Vec<String>),
    Extract(Extractor),
}

impl InpExtraMove {
    pub fn targets(&self) -> &[String] {
        match self {
            InpExtraMove::Targets(targets) => targets,
            _ => &[],
        }
    }
}

impl OutExtraMove {
    pub fn targets(&self) -> &[String] {
        match self {
            OutExtraMove::Targets(targets) => targets,
            OutExtraMove::Extract(_) => &[],
        }
    }
}

pub(crate) fn make_inp_extra_move(schema: &ExtraSchema, shape: &InputShape) -> ProvideResult<Option<InpExtraMove>> {
    let extra_move = match &schema.extra_in {
        ExtraIn::Skip | ExtraIn::Forbid => None,
        ExtraIn::Kwargs => {
            if shape.kwargs.is_none() {
                return Err(CannotProvide::terminal(
                    "Cannot use extra_in=Kwargs, the constructor does not accept extra keyword arguments",
                )
                .into());
            }
            Some(InpExtraMove::Kwargs)
        }
        ExtraIn::Saturate(saturator) => Some(InpExtraMove::Saturate(saturator.clone())),
        ExtraIn::Fields(targets) => {
            check_targets(targets, |id| shape.field(id).is_some())?;
            Some(InpExtraMove::Targets(targets.clone()))
        }
    };
    Ok(extra_move)
}

pub(crate) fn make_out_extra_move(schema: &ExtraSchema, shape: &OutputShape) -> ProvideResult<Option<OutExtraMove>> {
    let extra_move = match &schema.extra_out {
        ExtraOut::Skip => None,
        ExtraOut::Extract(extractor) => Some(OutExtraMove::Extract(extractor.clone())),
        ExtraOut::Fields(targets) => {
            check_targets(targets, |id| shape.field(id).is_some())?;
            Some(OutExtraMove::Targets(targets.clone()))
        }
    };
    Ok(extra_move)
}

fn check_targets(targets: &[String], exists: impl Fn(&str) -> bool) -> ProvideResult<()> {
    let unknown: Vec<&String> = targets.iter().filter(|id| !exists(id)).collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(CannotProvide::terminal(format!("Extra targets {:?} are not fields of the model", unknown)).into())
    }
}

pub(crate) fn dict_extra_policy(extra_in: &ExtraIn) -> DictExtraPolicy {
    match extra_in {
        ExtraIn::Skip => DictExtraPolicy::Skip,
        ExtraIn::Forbid => DictExtraPolicy::Forbid,
        ExtraIn::Kwargs | ExtraIn::Fields(_) | ExtraIn::Saturate(_) => DictExtraPolicy::Collect,
    }
}

pub(crate) fn collecting_with_list(extra_in: &ExtraIn) -> CannotProvide {
    let name = match extra_in {
        ExtraIn::Kwargs => "Kwargs".to_string(),
        ExtraIn::Fields(targets) => format!("{:?}", targets),
        ExtraIn::Saturate(saturator) => format!("{:?}", saturator),
        ExtraIn::Skip | ExtraIn::Forbid => format!("{:?}", extra_in),
    };
    CannotProvide::terminal(format!("Cannot use collecting extra_in={} with mapping to list", name))
}

/// Policy of every branch of the input crown, the root included
pub(crate) fn make_extra_policies(
    schema: &ExtraSchema,
    paths_to_leaves: &IndexMap<KeyPath, InpCrown>,
) -> ProvideResult<IndexMap<KeyPath, DictExtraPolicy>> {
    let policy = dict_extra_policy(&schema.extra_in);
    let mut policies = IndexMap::from([(KeyPath::new(), policy)]);
    for path in paths_to_leaves.keys() {
        for i in (0..path.len()).rev() {
            if policy == DictExtraPolicy::Collect && matches!(path[i], Key::Index(_)) {
                return Err(collecting_with_list(&schema.extra_in).into());
            }
            policies.insert(path[..i].to_vec(), policy);
        }
    }
    Ok(policies)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(paths: Vec<KeyPath>) -> IndexMap<KeyPath, InpCrown> {
        paths.into_iter().map(|path| (path, InpCrown::None)).collect()
    }

    #[test]
    fn test_policies_cover_every_branch() {
        let schema = ExtraSchema {
            extra_in: ExtraIn::Forbid,
            extra_out: ExtraOut::Skip,
        };
        let policies = make_extra_policies(
            &schema,
            &leaves(vec![vec![Key::from("a"), Key::from("b")], vec![Key::from("c")]]),
        )
        .unwrap();
        assert_eq!(policies.len(), 2);
        assert_eq!(policies[&vec![Key::from("a")]], DictExtraPolicy::Forbid);
        assert_eq!(policies[&KeyPath::new()], DictExtraPolicy::Forbid);
    }

    #[test]
    fn test_collecting_extra_with_list_is_rejected() {
        let schema = ExtraSchema {
            extra_in: ExtraIn::Kwargs,
            extra_out: ExtraOut::Skip,
        };
        let err = make_extra_policies(&schema, &leaves(vec![vec![Key::from(0)]])).unwrap_err();
        match err {
            crate::provider::ProvideError::CannotProvide(cause) => {
                assert!(cause.is_terminal);
                assert!(cause.message.contains("with mapping to list"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
