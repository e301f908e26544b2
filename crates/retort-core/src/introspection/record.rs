//! Dataclass-like records
//!
//! Fields with `init = false` are output-only, `InitVar` fields are
//! input-only and `ClassVar` fields are ignored. Fields of record bases come
//! first; a redeclared field keeps the position of the base declaration.

use super::{strip_tags, top_tag, Introspector};
use crate::morphing::LoadError;
use crate::shape::{
    Accessor, CallArgs, Constructor, InputField, InputShape, OutputField, OutputShape, Param, ParamKind,
    ParamKwargs,
};
use crate::types::{ClassKind, ClassRef, RecordField, TypeTag};
use crate::value::{Instance, Value};
use crate::Result;
use indexmap::IndexMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordIntrospector;

#[derive(Debug, Clone)]
struct ResolvedField {
    field: RecordField,
    kw_only: bool,
    init_var: bool,
}

fn collect_fields(class: &ClassRef, out: &mut Vec<ResolvedField>) {
    let ClassKind::Record(def) = class.kind() else {
        return;
    };
    for base in &class.def().bases {
        collect_fields(base, out);
    }
    for field in &def.fields {
        let tag = top_tag(&field.ty);
        if tag == Some(TypeTag::ClassVar) {
            continue;
        }
        let resolved = ResolvedField {
            field: field.clone(),
            kw_only: field.kw_only.unwrap_or(def.kw_only),
            init_var: tag == Some(TypeTag::InitVar),
        };
        match out.iter_mut().find(|f| f.field.name == field.name) {
            Some(existing) => *existing = resolved,
            None => out.push(resolved),
        }
    }
}

fn record_fields(class: &ClassRef) -> Option<Vec<ResolvedField>> {
    if !matches!(class.kind(), ClassKind::Record(_)) {
        return None;
    }
    let mut fields = Vec::new();
    collect_fields(class, &mut fields);
    Some(fields)
}

fn accepts_kwargs(class: &ClassRef) -> Option<crate::types::TypeExpr> {
    match class.kind() {
        ClassKind::Record(def) => def.kwargs.clone(),
        _ => None,
    }
}

impl Introspector for RecordIntrospector {
    fn kind(&self) -> &'static str {
        "record"
    }

    fn input_shape(&self, class: &ClassRef) -> Result<Option<InputShape>> {
        let Some(fields) = record_fields(class) else {
            return Ok(None);
        };
        let kwargs = accepts_kwargs(class);

        let mut input_fields = Vec::new();
        let mut params = Vec::new();
        for resolved in fields.iter().filter(|f| f.field.init) {
            let field = &resolved.field;
            let mut input = InputField::new(field.name.clone(), strip_tags(&field.ty, &[TypeTag::InitVar]));
            input.metadata = field.metadata.clone();
            if !field.default.is_none() {
                input = input.optional(field.default.clone());
            }
            input_fields.push(input);
            params.push(Param {
                field_id: field.name.clone(),
                name: field.name.clone(),
                kind: if resolved.kw_only {
                    ParamKind::KwOnly
                } else {
                    ParamKind::PosOrKw
                },
            });
        }

        let constructor = record_constructor(class.clone(), Arc::new(fields), kwargs.is_some());
        InputShape::new(constructor, input_fields, params, kwargs.map(|ty| ParamKwargs { ty })).map(Some)
    }

    fn output_shape(&self, class: &ClassRef) -> Result<Option<OutputShape>> {
        let Some(fields) = record_fields(class) else {
            return Ok(None);
        };
        let output_fields = fields
            .into_iter()
            .filter(|f| !f.init_var)
            .map(|resolved| {
                let field = resolved.field;
                let access_error = !field.init && field.default.is_none();
                let mut output = OutputField::new(
                    field.name.clone(),
                    field.ty,
                    Accessor::Attr {
                        name: field.name,
                        access_error,
                    },
                );
                output.default = field.default;
                output.metadata = field.metadata;
                output
            })
            .collect();
        OutputShape::new(output_fields).map(Some)
    }
}

fn record_constructor(class: ClassRef, fields: Arc<Vec<ResolvedField>>, accepts_kwargs: bool) -> Constructor {
    Constructor::new(move |args: CallArgs| {
        let CallArgs { positional, mut keyword } = args;
        let mut positional = positional.into_iter();
        let mut attrs = IndexMap::new();

        for resolved in fields.iter() {
            let field = &resolved.field;
            let value = if field.init {
                let passed = if resolved.kw_only { None } else { positional.next() };
                match passed.or_else(|| keyword.shift_remove(&field.name)) {
                    Some(value) => Some(value),
                    None => match field.default.produce(&Value::None) {
                        Some(value) => Some(value),
                        None => {
                            return Err(LoadError::msg(format!(
                                "{}() missing required argument {:?}",
                                class.name(),
                                field.name
                            )))
                        }
                    },
                }
            } else {
                field.default.produce(&Value::None)
            };
            if let (Some(value), false) = (value, resolved.init_var) {
                attrs.insert(field.name.clone(), value);
            }
        }

        let extra_positional = positional.count();
        if extra_positional > 0 {
            return Err(LoadError::msg(format!(
                "{}() got {} unexpected positional arguments",
                class.name(),
                extra_positional
            )));
        }
        if !keyword.is_empty() {
            if !accepts_kwargs {
                let names: Vec<&String> = keyword.keys().collect();
                return Err(LoadError::msg(format!(
                    "{}() got unexpected keyword arguments {:?}",
                    class.name(),
                    names
                )));
            }
            attrs.extend(keyword);
        }
        Ok(Value::Instance(Instance::new(class.clone(), attrs)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::FieldDefault;
    use crate::types::{ClassDef, TypeExpr};

    fn book() -> ClassRef {
        ClassDef::record("Book")
            .field("title", TypeExpr::str())
            .field("price", TypeExpr::int())
            .field_def(RecordField::new("author", TypeExpr::str()).default("Unknown"))
            .build()
    }

    #[test]
    fn test_input_shape() {
        let shape = RecordIntrospector.input_shape(&book()).unwrap().unwrap();
        let ids: Vec<&str> = shape.fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["title", "price", "author"]);
        assert!(shape.fields[0].is_required);
        assert_eq!(shape.fields[2].default, FieldDefault::Value(Value::str("Unknown")));
        assert!(shape.params.iter().all(|p| p.kind == ParamKind::PosOrKw));
        assert!(shape.kwargs.is_none());
    }

    #[test]
    fn test_constructor_fills_defaults() {
        let class = book();
        let shape = RecordIntrospector.input_shape(&class).unwrap().unwrap();
        let mut keyword = IndexMap::new();
        keyword.insert("price".to_string(), Value::Int(100));
        let value = shape
            .constructor
            .call(CallArgs {
                positional: vec![Value::str("F451")],
                keyword,
            })
            .unwrap();
        assert_eq!(
            value,
            class.instance([
                ("title", Value::str("F451")),
                ("price", Value::Int(100)),
                ("author", Value::str("Unknown")),
            ])
        );
    }

    #[test]
    fn test_constructor_rejects_unknown_keyword() {
        let shape = RecordIntrospector.input_shape(&book()).unwrap().unwrap();
        let mut keyword = IndexMap::new();
        keyword.insert("title".to_string(), Value::str("a"));
        keyword.insert("price".to_string(), Value::Int(1));
        keyword.insert("isbn".to_string(), Value::str("x"));
        let err = shape.constructor.call(CallArgs { positional: vec![], keyword }).unwrap_err();
        assert!(err.to_string().contains("isbn"));
    }

    #[test]
    fn test_init_var_and_non_init_fields() {
        let class = ClassDef::record("Session")
            .field("token", TypeExpr::tagged(TypeTag::InitVar, TypeExpr::str()))
            .field_def(RecordField::new("created", TypeExpr::int()).init(false).default(0))
            .field("ignored", TypeExpr::tagged(TypeTag::ClassVar, TypeExpr::int()))
            .build();
        let input = RecordIntrospector.input_shape(&class).unwrap().unwrap();
        assert_eq!(input.fields.len(), 1);
        assert_eq!(input.fields[0].ty, TypeExpr::str());
        let output = RecordIntrospector.output_shape(&class).unwrap().unwrap();
        let ids: Vec<&str> = output.fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["created"]);
    }

    #[test]
    fn test_inherited_fields_come_first() {
        let base = ClassDef::record("Base").field("id", TypeExpr::int()).build();
        let child = ClassDef::record("Child").base(&base).field("name", TypeExpr::str()).build();
        let shape = RecordIntrospector.output_shape(&child).unwrap().unwrap();
        let ids: Vec<&str> = shape.fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["id", "name"]);
    }

    #[test]
    fn test_kw_only_allows_required_after_optional() {
        let class = ClassDef::record("Opts")
            .kw_only()
            .field_def(RecordField::new("verbose", TypeExpr::bool()).default(false))
            .field("path", TypeExpr::str())
            .build();
        let shape = RecordIntrospector.input_shape(&class).unwrap().unwrap();
        assert!(shape.params.iter().all(|p| p.kind == ParamKind::KwOnly));
    }

    #[test]
    fn test_other_kinds_are_not_recognised() {
        let class = ClassDef::typed_dict("Movie").field("title", TypeExpr::str()).build();
        assert!(RecordIntrospector.input_shape(&class).unwrap().is_none());
    }
}
