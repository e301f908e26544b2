//! Named tuples
//!
//! Fields are positional-or-keyword; only trailing fields may have defaults.

use super::Introspector;
use crate::morphing::LoadError;
use crate::shape::{
    Accessor, CallArgs, Constructor, FieldDefault, InputField, InputShape, OutputField, OutputShape, Param, ParamKind,
};
use crate::types::{ClassKind, ClassRef, NamedTupleField};
use crate::value::{Instance, Value};
use crate::Result;
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct NamedTupleIntrospector;

fn tuple_fields(class: &ClassRef) -> Option<&[NamedTupleField]> {
    match class.kind() {
        ClassKind::NamedTuple(def) => Some(&def.fields),
        _ => None,
    }
}

fn field_default(field: &NamedTupleField) -> FieldDefault {
    field.default.clone().map_or(FieldDefault::NoDefault, FieldDefault::Value)
}

impl Introspector for NamedTupleIntrospector {
    fn kind(&self) -> &'static str {
        "named tuple"
    }

    fn input_shape(&self, class: &ClassRef) -> Result<Option<InputShape>> {
        let Some(declared) = tuple_fields(class) else {
            return Ok(None);
        };
        let fields = declared
            .iter()
            .map(|field| {
                let input = InputField::new(field.name.clone(), field.ty.clone());
                match field_default(field) {
                    FieldDefault::NoDefault => input,
                    default => input.optional(default),
                }
            })
            .collect();
        let params = declared
            .iter()
            .map(|field| Param {
                field_id: field.name.clone(),
                name: field.name.clone(),
                kind: ParamKind::PosOrKw,
            })
            .collect();

        let class_ref = class.clone();
        let declared = declared.to_vec();
        let constructor = Constructor::new(move |args: CallArgs| {
            let CallArgs { positional, mut keyword } = args;
            if positional.len() > declared.len() {
                return Err(LoadError::msg(format!(
                    "{}() takes {} positional arguments but {} were given",
                    class_ref.name(),
                    declared.len(),
                    positional.len()
                )));
            }
            let mut positional = positional.into_iter();
            let mut attrs = IndexMap::new();
            for field in &declared {
                let value = positional
                    .next()
                    .or_else(|| keyword.shift_remove(&field.name))
                    .or_else(|| field.default.clone())
                    .ok_or_else(|| {
                        LoadError::msg(format!("{}() missing required argument {:?}", class_ref.name(), field.name))
                    })?;
                attrs.insert(field.name.clone(), value);
            }
            if let Some(name) = keyword.keys().next() {
                return Err(LoadError::msg(format!(
                    "{}() got an unexpected keyword argument {:?}",
                    class_ref.name(),
                    name
                )));
            }
            Ok(Value::Instance(Instance::new(class_ref.clone(), attrs)))
        });
        InputShape::new(constructor, fields, params, None).map(Some)
    }

    fn output_shape(&self, class: &ClassRef) -> Result<Option<OutputShape>> {
        let Some(declared) = tuple_fields(class) else {
            return Ok(None);
        };
        let fields = declared
            .iter()
            .map(|field| {
                let mut output = OutputField::new(field.name.clone(), field.ty.clone(), Accessor::attr(field.name.clone()));
                output.default = field_default(field);
                output
            })
            .collect();
        OutputShape::new(fields).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClassDef, TypeExpr};
    use crate::Error;

    #[test]
    fn test_positional_construction() {
        let class = ClassDef::named_tuple("Point")
            .field("x", TypeExpr::int())
            .field_default("y", TypeExpr::int(), 0)
            .build();
        let shape = NamedTupleIntrospector.input_shape(&class).unwrap().unwrap();
        let value = shape
            .constructor
            .call(CallArgs {
                positional: vec![Value::Int(3)],
                keyword: IndexMap::new(),
            })
            .unwrap();
        assert_eq!(value, class.instance([("x", Value::Int(3)), ("y", Value::Int(0))]));
    }

    #[test]
    fn test_defaults_must_be_trailing() {
        let class = ClassDef::named_tuple("Bad")
            .field_default("x", TypeExpr::int(), 0)
            .field("y", TypeExpr::int())
            .build();
        assert!(matches!(
            NamedTupleIntrospector.input_shape(&class),
            Err(Error::InvalidShape { .. })
        ));
    }
}
