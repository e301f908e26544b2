//! Typed dictionaries
//!
//! Instances are plain dicts with string keys. Every parameter is keyword-only;
//! a key is required when the class is total, unless its type is tagged
//! `NotRequired` (and `Required` forces it on a non-total class).

use super::{strip_tags, top_tag, Introspector};
use crate::shape::{Accessor, CallArgs, Constructor, InputField, InputShape, OutputField, OutputShape, Param, ParamKind};
use crate::types::{ClassKind, ClassRef, TypeExpr, TypeTag};
use crate::value::Value;
use crate::Result;
use indexmap::IndexMap;

const KEY_TAGS: [TypeTag; 3] = [TypeTag::Required, TypeTag::NotRequired, TypeTag::ReadOnly];

#[derive(Debug, Clone, Copy, Default)]
pub struct TypedDictIntrospector;

struct DictKey {
    name: String,
    ty: TypeExpr,
    is_required: bool,
}

fn collect_keys(class: &ClassRef, out: &mut Vec<DictKey>) {
    let ClassKind::TypedDict(def) = class.kind() else {
        return;
    };
    for base in &class.def().bases {
        collect_keys(base, out);
    }
    for field in &def.fields {
        let is_required = match top_tag(&field.ty) {
            Some(TypeTag::Required) => true,
            Some(TypeTag::NotRequired) => false,
            _ => def.total,
        };
        let key = DictKey {
            name: field.name.clone(),
            ty: strip_tags(&field.ty, &KEY_TAGS),
            is_required,
        };
        match out.iter_mut().find(|k| k.name == field.name) {
            Some(existing) => *existing = key,
            None => out.push(key),
        }
    }
}

fn dict_keys(class: &ClassRef) -> Option<Vec<DictKey>> {
    if !matches!(class.kind(), ClassKind::TypedDict(_)) {
        return None;
    }
    let mut keys = Vec::new();
    collect_keys(class, &mut keys);
    Some(keys)
}

impl Introspector for TypedDictIntrospector {
    fn kind(&self) -> &'static str {
        "typed dict"
    }

    fn input_shape(&self, class: &ClassRef) -> Result<Option<InputShape>> {
        let Some(keys) = dict_keys(class) else {
            return Ok(None);
        };
        let order: Vec<String> = keys.iter().map(|k| k.name.clone()).collect();
        let fields = keys
            .iter()
            .map(|key| InputField {
                is_required: key.is_required,
                ..InputField::new(key.name.clone(), key.ty.clone())
            })
            .collect();
        let params = keys
            .iter()
            .map(|key| Param {
                field_id: key.name.clone(),
                name: key.name.clone(),
                kind: ParamKind::KwOnly,
            })
            .collect();
        let constructor = Constructor::new(move |args: CallArgs| {
            let mut keyword = args.keyword;
            let mut entries = IndexMap::new();
            for name in &order {
                if let Some(value) = keyword.shift_remove(name) {
                    entries.insert(Value::str(name.clone()), value);
                }
            }
            entries.extend(keyword.into_iter().map(|(k, v)| (Value::Str(k), v)));
            Ok(Value::Dict(entries))
        });
        InputShape::new(constructor, fields, params, None).map(Some)
    }

    fn output_shape(&self, class: &ClassRef) -> Result<Option<OutputShape>> {
        let Some(keys) = dict_keys(class) else {
            return Ok(None);
        };
        let fields = keys
            .into_iter()
            .map(|key| {
                let accessor = Accessor::item(key.name.clone(), !key.is_required);
                OutputField::new(key.name, key.ty, accessor)
            })
            .collect();
        OutputShape::new(fields).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClassDef;

    #[test]
    fn test_totality() {
        let class = ClassDef::typed_dict("Movie")
            .total(false)
            .field("title", TypeExpr::tagged(TypeTag::Required, TypeExpr::str()))
            .field("year", TypeExpr::int())
            .build();
        let shape = TypedDictIntrospector.input_shape(&class).unwrap().unwrap();
        assert!(shape.fields[0].is_required);
        assert!(!shape.fields[1].is_required);
        assert_eq!(shape.fields[0].ty, TypeExpr::str());
        assert!(shape.params.iter().all(|p| p.kind == ParamKind::KwOnly));

        let output = TypedDictIntrospector.output_shape(&class).unwrap().unwrap();
        assert!(output.fields[0].is_required());
        assert!(output.fields[1].is_optional());
    }

    #[test]
    fn test_constructor_builds_dict() {
        let class = ClassDef::typed_dict("Movie")
            .field("title", TypeExpr::str())
            .field("year", TypeExpr::int())
            .build();
        let shape = TypedDictIntrospector.input_shape(&class).unwrap().unwrap();
        let mut keyword = IndexMap::new();
        keyword.insert("year".to_string(), Value::Int(1966));
        keyword.insert("title".to_string(), Value::str("F451"));
        let value = shape.constructor.call(CallArgs { positional: vec![], keyword }).unwrap();
        let keys: Vec<String> = value.as_dict().unwrap().keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["\"title\"", "\"year\""]);
    }
}
