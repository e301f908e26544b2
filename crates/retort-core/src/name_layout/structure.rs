//! Field to path mapping
//!
//! Resolves the wire path of every field, checks that the resulting paths
//! can form a crown, pads list gaps and picks the sieves of output fields.

use crate::location::LocStack;
use crate::name_layout::crown::{render_path, InpCrown, Key, KeyPath, OutCrown, Sieve};
use crate::name_layout::name_style::convert_snake_style;
use crate::name_layout::overlay::{SievesSchema, StructureSchema};
use crate::name_layout::request::{InputNameLayoutRequest, OutputNameLayoutRequest};
use crate::provider::{CannotProvide, Mediator, ProvideResult};
use crate::shape::{FieldDefault, FieldRef, ShapeRef};
use crate::value::Value;
use indexmap::IndexMap;

type FieldPath<'a> = (FieldRef<'a>, Option<KeyPath>);

fn generate_key(schema: &StructureSchema, index: usize, field: FieldRef<'_>) -> ProvideResult<Key> {
    if schema.as_list {
        return Ok(Key::Index(index));
    }
    let mut name = field.id();
    if schema.trim_trailing_underscore && name.ends_with('_') && !name.ends_with("__") {
        name = &name[..name.len() - 1];
    }
    let name = match schema.name_style {
        Some(style) => convert_snake_style(name, style)?,
        None => name.to_string(),
    };
    Ok(Key::Name(name))
}

fn map_fields<'a>(
    mediator: &Mediator<'_>,
    loc_stack: &LocStack,
    shape: ShapeRef<'a>,
    fields: Vec<FieldRef<'a>>,
    schema: &StructureSchema,
    extra_targets: &[String],
) -> ProvideResult<Vec<FieldPath<'a>>> {
    let mut result = Vec::with_capacity(fields.len());
    for (index, field) in fields.into_iter().enumerate() {
        if extra_targets.iter().any(|target| target == field.id()) {
            continue;
        }
        let generated = generate_key(schema, index, field)?;
        let field_loc_stack = loc_stack.append(field.to_loc());

        let mut resolved = None;
        for entry in &schema.map {
            if let Some(path) = entry.resolve(mediator, &field_loc_stack, shape, field, &generated)? {
                resolved = Some(path);
                break;
            }
        }
        let path = resolved.unwrap_or_else(|| Some(vec![generated]));

        let path = match path {
            Some(path)
                if !mediator.check(&schema.skip, &field_loc_stack)?
                    && mediator.check(&schema.only, &field_loc_stack)? =>
            {
                Some(path)
            }
            _ => None,
        };
        result.push((field, path));
    }
    Ok(result)
}

/// Paths that are proper prefixes of other paths
fn prefix_groups(paths: &[&KeyPath]) -> Vec<(KeyPath, Vec<KeyPath>)> {
    let mut sorted: Vec<&KeyPath> = paths.to_vec();
    sorted.sort();
    sorted.dedup();
    sorted
        .iter()
        .filter_map(|prefix| {
            let longer: Vec<KeyPath> = sorted
                .iter()
                .filter(|path| path.len() > prefix.len() && path.starts_with(prefix))
                .map(|path| (*path).clone())
                .collect();
            (!longer.is_empty()).then(|| ((*prefix).clone(), longer))
        })
        .collect()
}

fn validate_structure(fields_to_paths: &[FieldPath<'_>]) -> ProvideResult<()> {
    let mut paths_to_fields: IndexMap<&KeyPath, Vec<&str>> = IndexMap::new();
    for (field, path) in fields_to_paths {
        if let Some(path) = path {
            paths_to_fields.entry(path).or_default().push(field.id());
        }
    }

    let duplicates: Vec<CannotProvide> = paths_to_fields
        .iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(path, ids)| CannotProvide::new(format!("Fields {:?} point to the {}", ids, render_path(path))))
        .collect();
    if !duplicates.is_empty() {
        return Err(
            CannotProvide::aggregate("Some fields point to the same path (have same alias)", duplicates)
                .make_terminal()
                .into(),
        );
    }

    let paths: Vec<&KeyPath> = paths_to_fields.keys().copied().collect();
    let groups = prefix_groups(&paths);
    if !groups.is_empty() {
        let causes = groups
            .into_iter()
            .map(|(prefix, longer)| {
                let field_of = |path: &KeyPath| paths_to_fields.get(path).and_then(|ids| ids.first()).copied();
                CannotProvide::aggregate(
                    format!(
                        "Field {:?} points to path {} which is prefix of:",
                        field_of(&prefix).unwrap_or_default(),
                        render_path(&prefix)
                    ),
                    longer
                        .iter()
                        .map(|path| {
                            CannotProvide::new(format!(
                                "Field {:?} points to {}",
                                field_of(path).unwrap_or_default(),
                                render_path(path)
                            ))
                        })
                        .collect(),
                )
            })
            .collect();
        return Err(
            CannotProvide::aggregate("Path to the field must not be a prefix of another path", causes)
                .make_terminal()
                .into(),
        );
    }

    let optional_at_list: Vec<CannotProvide> = fields_to_paths
        .iter()
        .filter_map(|(field, path)| {
            let path = path.as_ref()?;
            (field.is_optional() && matches!(path.last(), Some(Key::Index(_))))
                .then(|| CannotProvide::new(format!("Field {:?} points to {}", field.id(), render_path(path))))
        })
        .collect();
    if !optional_at_list.is_empty() {
        return Err(
            CannotProvide::aggregate("Optional fields cannot be mapped to list elements", optional_at_list)
                .make_terminal()
                .into(),
        );
    }
    Ok(())
}

/// Every (branch path, key) pair of the paths, each pair once
fn sub_paths<'p>(paths: impl Iterator<Item = &'p KeyPath>) -> Vec<(KeyPath, &'p Key)> {
    let mut yielded: Vec<(KeyPath, &Key)> = Vec::new();
    for path in paths {
        for i in (0..path.len()).rev() {
            let item = (path[..i].to_vec(), &path[i]);
            if yielded.contains(&item) {
                break;
            }
            yielded.push(item);
        }
    }
    yielded
}

/// Indices used under every list branch
fn paths_to_lists<'p>(paths: impl Iterator<Item = &'p KeyPath>) -> ProvideResult<IndexMap<KeyPath, Vec<usize>>> {
    let mut lists: IndexMap<KeyPath, Vec<usize>> = IndexMap::new();
    let mut dicts: IndexMap<KeyPath, Vec<&str>> = IndexMap::new();
    for (sub_path, key) in sub_paths(paths) {
        match key {
            Key::Index(index) => {
                if let Some(names) = dicts.get(&sub_path) {
                    return Err(inconsistent(&sub_path, names.last().copied().unwrap_or_default(), *index).into());
                }
                lists.entry(sub_path).or_default().push(*index);
            }
            Key::Name(name) => {
                if let Some(indices) = lists.get(&sub_path) {
                    return Err(inconsistent(&sub_path, name, indices.last().copied().unwrap_or_default()).into());
                }
                dicts.entry(sub_path).or_default().push(name);
            }
        }
    }
    Ok(lists)
}

fn inconsistent(path: &[Key], name: &str, index: usize) -> CannotProvide {
    CannotProvide::terminal(format!(
        "Inconsistent path elements at {}, got string (e.g. {:?}) and integer (e.g. {}) keys",
        render_path(path),
        name,
        index
    ))
}

fn make_paths_to_leaves<L>(
    fields_to_paths: &[FieldPath<'_>],
    field_crown: impl Fn(&str) -> L,
    gap: impl Fn() -> L,
) -> ProvideResult<IndexMap<KeyPath, L>> {
    let mut leaves: IndexMap<KeyPath, L> = fields_to_paths
        .iter()
        .filter_map(|(field, path)| Some((path.clone()?, field_crown(field.id()))))
        .collect();

    let lists = paths_to_lists(leaves.keys())?;
    for (path, indices) in lists {
        let max = indices.iter().copied().max().unwrap_or_default();
        for i in 0..max {
            if !indices.contains(&i) {
                let mut complete = path.clone();
                complete.push(Key::Index(i));
                leaves.insert(complete, gap());
            }
        }
    }
    Ok(leaves)
}

pub(crate) fn make_inp_structure(
    mediator: &Mediator<'_>,
    request: &InputNameLayoutRequest,
    schema: &StructureSchema,
    extra_targets: &[String],
) -> ProvideResult<IndexMap<KeyPath, InpCrown>> {
    let shape = &request.shape;
    let fields = shape.fields.iter().map(FieldRef::Input).collect();
    let fields_to_paths = map_fields(
        mediator,
        &request.loc_stack,
        ShapeRef::Input(shape),
        fields,
        schema,
        extra_targets,
    )?;

    let skipped_required: Vec<&str> = fields_to_paths
        .iter()
        .filter(|(field, path)| path.is_none() && !field.is_optional())
        .map(|(field, _)| field.id())
        .collect();
    if !skipped_required.is_empty() {
        return Err(CannotProvide::terminal(format!("Required fields {:?} are skipped", skipped_required)).into());
    }

    validate_structure(&fields_to_paths)?;
    make_paths_to_leaves(&fields_to_paths, |id| InpCrown::Field(id.to_string()), || InpCrown::None)
}

pub(crate) fn make_out_structure(
    mediator: &Mediator<'_>,
    request: &OutputNameLayoutRequest,
    schema: &StructureSchema,
    extra_targets: &[String],
) -> ProvideResult<IndexMap<KeyPath, OutCrown>> {
    let shape = &request.shape;
    let fields = shape.fields.iter().map(FieldRef::Output).collect();
    let fields_to_paths = map_fields(
        mediator,
        &request.loc_stack,
        ShapeRef::Output(shape),
        fields,
        schema,
        extra_targets,
    )?;
    validate_structure(&fields_to_paths)?;
    make_paths_to_leaves(
        &fields_to_paths,
        |id| OutCrown::Field(id.to_string()),
        || OutCrown::None(FieldDefault::Value(Value::None)),
    )
}

/// Sieves of output fields that declare a default and match `omit_default`
pub(crate) fn make_sieves(
    mediator: &Mediator<'_>,
    request: &OutputNameLayoutRequest,
    schema: &SievesSchema,
    paths_to_leaves: &IndexMap<KeyPath, OutCrown>,
) -> ProvideResult<IndexMap<KeyPath, Sieve>> {
    let mut sieves = IndexMap::new();
    for (path, leaf) in paths_to_leaves {
        let OutCrown::Field(id) = leaf else {
            continue;
        };
        let Some(field) = request.shape.field(id) else {
            continue;
        };
        if field.default.is_none() {
            continue;
        }
        let field_loc_stack = request.loc_stack.append(FieldRef::Output(field).to_loc());
        if mediator.check(&schema.omit_default, &field_loc_stack)? {
            sieves.insert(path.clone(), Sieve::omit_default(field.default.clone()));
        }
    }
    Ok(sieves)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(keys: &[&str]) -> KeyPath {
        keys.iter().map(|key| Key::from(*key)).collect()
    }

    #[test]
    fn test_prefix_groups() {
        let a = path(&["a"]);
        let ab = path(&["a", "b"]);
        let c = path(&["c"]);
        let groups = prefix_groups(&[&ab, &a, &c]);
        assert_eq!(groups, vec![(a.clone(), vec![ab.clone()])]);
    }

    #[test]
    fn test_mixed_keys_are_inconsistent() {
        let paths = [vec![Key::from("a"), Key::from(0)], vec![Key::from("a"), Key::from("b")]];
        let err = paths_to_lists(paths.iter()).unwrap_err();
        assert!(err.to_string().contains("Inconsistent path elements at (\"a\")"));
    }

    #[test]
    fn test_list_indices_collected() {
        let paths = [vec![Key::from(2)], vec![Key::from(0)]];
        let lists = paths_to_lists(paths.iter()).unwrap();
        assert_eq!(lists[&KeyPath::new()], vec![2, 0]);
    }
}
