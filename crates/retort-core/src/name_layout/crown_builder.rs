//! Crown assembly
//!
//! Builds the crown tree from the flat path-to-leaf table. Leaves are sorted
//! by path and grouped level by level; dict keys keep the order in which
//! their fields were declared, list items must be contiguous.

use crate::name_layout::crown::{
    render_path, DictExtraPolicy, InpCrown, InpDictCrown, InpListCrown, Key, KeyPath, ListExtraPolicy, OutCrown,
    OutDictCrown, OutListCrown, Sieve,
};
use crate::{Error, Result};
use indexmap::IndexMap;

struct PathedLeaf<C> {
    path: KeyPath,
    leaf: C,
}

/// Branch constructors of one side
trait CrownFactory {
    type Crown: Clone;

    fn dict(
        &self,
        current_path: &[Key],
        map: IndexMap<String, Self::Crown>,
        leaves: &[PathedLeaf<Self::Crown>],
    ) -> Self::Crown;

    fn list(&self, current_path: &[Key], map: Vec<Self::Crown>) -> Self::Crown;
}

struct CrownBuilder<F: CrownFactory> {
    factory: F,
    paths_to_leaves: IndexMap<KeyPath, F::Crown>,
}

impl<F: CrownFactory> CrownBuilder<F> {
    fn build_empty(&self, as_list: bool) -> F::Crown {
        if as_list {
            self.factory.list(&[], Vec::new())
        } else {
            self.factory.dict(&[], IndexMap::new(), &[])
        }
    }

    fn build(&self) -> Result<F::Crown> {
        let mut leaves: Vec<PathedLeaf<F::Crown>> = self
            .paths_to_leaves
            .iter()
            .map(|(path, leaf)| PathedLeaf {
                path: path.clone(),
                leaf: leaf.clone(),
            })
            .collect();
        leaves.sort_by(|a, b| a.path.cmp(&b.path));
        self.build_level(&leaves, 0)
    }

    fn build_level(&self, leaves: &[PathedLeaf<F::Crown>], offset: usize) -> Result<F::Crown> {
        let Some(first) = leaves.first() else {
            return Err(Error::name_layout("cannot build a crown without leaves"));
        };
        let current_path = &first.path[..offset.min(first.path.len())];
        match first.path.get(offset) {
            None if leaves.len() == 1 => Ok(first.leaf.clone()),
            None => Err(Error::name_layout(format!(
                "several fields end at {}",
                render_path(current_path)
            ))),
            Some(Key::Name(_)) => self.build_dict(current_path, leaves, offset),
            Some(Key::Index(_)) => self.build_list(current_path, leaves, offset),
        }
    }

    fn groups<'l>(leaves: &'l [PathedLeaf<F::Crown>], offset: usize) -> Vec<(&'l Key, &'l [PathedLeaf<F::Crown>])> {
        let mut groups: Vec<(&Key, &[PathedLeaf<F::Crown>])> = Vec::new();
        let mut start = 0;
        for end in 1..=leaves.len() {
            let boundary = end == leaves.len() || leaves[end].path.get(offset) != leaves[start].path.get(offset);
            if boundary {
                if let Some(key) = leaves[start].path.get(offset) {
                    groups.push((key, &leaves[start..end]));
                }
                start = end;
            }
        }
        groups
    }

    fn build_dict(&self, current_path: &[Key], leaves: &[PathedLeaf<F::Crown>], offset: usize) -> Result<F::Crown> {
        let mut entries = Vec::new();
        for (key, group) in Self::groups(leaves, offset) {
            let Key::Name(name) = key else {
                return Err(Error::name_layout(format!(
                    "mixed keys at {}",
                    render_path(current_path)
                )));
            };
            let mut full_path = current_path.to_vec();
            full_path.push(key.clone());
            let order = self.paths_to_leaves.get_index_of(&full_path).unwrap_or(usize::MAX);
            entries.push((order, name.clone(), self.build_level(group, offset + 1)?));
        }
        entries.sort_by_key(|(order, _, _)| *order);
        let map = entries.into_iter().map(|(_, name, crown)| (name, crown)).collect();
        Ok(self.factory.dict(current_path, map, leaves))
    }

    fn build_list(&self, current_path: &[Key], leaves: &[PathedLeaf<F::Crown>], offset: usize) -> Result<F::Crown> {
        let groups = Self::groups(leaves, offset);
        let last = groups.last().map(|(key, _)| (*key).clone());
        if last != groups.len().checked_sub(1).map(Key::Index) {
            return Err(Error::name_layout(format!(
                "Found gaps in list mapping at {}",
                render_path(current_path)
            )));
        }
        let map = groups
            .into_iter()
            .map(|(_, group)| self.build_level(group, offset + 1))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.factory.list(current_path, map))
    }
}

struct InpFactory<'p> {
    extra_policies: &'p IndexMap<KeyPath, DictExtraPolicy>,
}

impl InpFactory<'_> {
    fn policy(&self, path: &[Key]) -> DictExtraPolicy {
        self.extra_policies.get(path).copied().unwrap_or(DictExtraPolicy::Skip)
    }
}

impl CrownFactory for InpFactory<'_> {
    type Crown = InpCrown;

    fn dict(&self, current_path: &[Key], map: IndexMap<String, InpCrown>, _leaves: &[PathedLeaf<InpCrown>]) -> InpCrown {
        InpCrown::Dict(InpDictCrown {
            map,
            extra_policy: self.policy(current_path),
        })
    }

    fn list(&self, current_path: &[Key], map: Vec<InpCrown>) -> InpCrown {
        let extra_policy = match self.policy(current_path) {
            DictExtraPolicy::Forbid => ListExtraPolicy::Forbid,
            DictExtraPolicy::Skip | DictExtraPolicy::Collect => ListExtraPolicy::Skip,
        };
        InpCrown::List(InpListCrown { map, extra_policy })
    }
}

struct OutFactory<'p> {
    sieves: &'p IndexMap<KeyPath, Sieve>,
}

impl CrownFactory for OutFactory<'_> {
    type Crown = OutCrown;

    fn dict(&self, current_path: &[Key], map: IndexMap<String, OutCrown>, leaves: &[PathedLeaf<OutCrown>]) -> OutCrown {
        let depth = current_path.len() + 1;
        let mut sieves = IndexMap::new();
        for leaf in leaves {
            if leaf.path.len() < depth {
                continue;
            }
            if let (Some(sieve), Key::Name(name)) = (self.sieves.get(&leaf.path[..depth]), &leaf.path[depth - 1]) {
                sieves.insert(name.clone(), sieve.clone());
            }
        }
        OutCrown::Dict(OutDictCrown { map, sieves })
    }

    fn list(&self, _current_path: &[Key], map: Vec<OutCrown>) -> OutCrown {
        OutCrown::List(OutListCrown { map })
    }
}

/// Input crown of the mapped fields, or an empty branch when none is mapped
pub(crate) fn build_inp_crown(
    extra_policies: &IndexMap<KeyPath, DictExtraPolicy>,
    paths_to_leaves: IndexMap<KeyPath, InpCrown>,
    as_list: bool,
) -> Result<InpCrown> {
    let builder = CrownBuilder {
        factory: InpFactory { extra_policies },
        paths_to_leaves,
    };
    if builder.paths_to_leaves.is_empty() {
        Ok(builder.build_empty(as_list))
    } else {
        builder.build()
    }
}

pub(crate) fn build_out_crown(
    sieves: &IndexMap<KeyPath, Sieve>,
    paths_to_leaves: IndexMap<KeyPath, OutCrown>,
    as_list: bool,
) -> Result<OutCrown> {
    let builder = CrownBuilder {
        factory: OutFactory { sieves },
        paths_to_leaves,
    };
    if builder.paths_to_leaves.is_empty() {
        Ok(builder.build_empty(as_list))
    } else {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::FieldDefault;
    use crate::value::Value;

    fn field(id: &str) -> InpCrown {
        InpCrown::Field(id.to_string())
    }

    #[test]
    fn test_dict_keys_keep_declaration_order() {
        let leaves = IndexMap::from([
            (vec![Key::from("z")], field("z")),
            (vec![Key::from("meta"), Key::from("b")], field("b")),
            (vec![Key::from("a")], field("a")),
        ]);
        let policies = IndexMap::from([(KeyPath::new(), DictExtraPolicy::Forbid)]);
        let crown = build_inp_crown(&policies, leaves, false).unwrap();
        let InpCrown::Dict(dict) = crown else {
            panic!("expected dict crown");
        };
        let keys: Vec<&str> = dict.map.keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a", "meta"]);
        assert_eq!(dict.extra_policy, DictExtraPolicy::Forbid);
        assert!(matches!(&dict.map["meta"], InpCrown::Dict(inner) if inner.extra_policy == DictExtraPolicy::Skip));
    }

    #[test]
    fn test_list_crown() {
        let leaves = IndexMap::from([
            (vec![Key::from(1)], field("b")),
            (vec![Key::from(0)], field("a")),
        ]);
        let crown = build_inp_crown(&IndexMap::new(), leaves, false).unwrap();
        assert_eq!(crown.field_ids(), ["a", "b"]);
        assert!(crown.is_list());
    }

    #[test]
    fn test_gaps_are_rejected() {
        let leaves = IndexMap::from([(vec![Key::from(1)], field("b"))]);
        let err = build_inp_crown(&IndexMap::new(), leaves, false).unwrap_err();
        assert!(err.to_string().contains("Found gaps in list mapping"));
    }

    #[test]
    fn test_empty_crown() {
        let crown = build_out_crown(&IndexMap::new(), IndexMap::new(), true).unwrap();
        assert_eq!(crown, OutCrown::List(OutListCrown { map: vec![] }));
    }

    #[test]
    fn test_sieves_attached_to_parent_dict() {
        let sieve = Sieve::omit_default(FieldDefault::Value(Value::Int(0)));
        let path = vec![Key::from("meta"), Key::from("count")];
        let sieves = IndexMap::from([(path.clone(), sieve.clone())]);
        let leaves = IndexMap::from([(path, OutCrown::Field("count".to_string()))]);
        let crown = build_out_crown(&sieves, leaves, false).unwrap();
        let OutCrown::Dict(root) = crown else {
            panic!("expected dict crown");
        };
        assert!(root.sieves.is_empty());
        let OutCrown::Dict(meta) = &root.map["meta"] else {
            panic!("expected nested dict crown");
        };
        assert_eq!(meta.sieves.get("count"), Some(&sieve));
    }
}
