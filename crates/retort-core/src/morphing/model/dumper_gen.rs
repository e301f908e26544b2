//! Model dumper generation
//!
//! [`ModelDumperGen`] compiles the output crown into a [`ModelDumperPlan`].
//! Fields are read through their accessors; a field whose accessor tolerates
//! absence is left out when missing, and a sieve drops a field whose value
//! equals its default. Nested dicts left empty that way are dropped too,
//! unless they hold a required field.

use crate::morphing::{strip_dump_trail, DebugTrail, DumpError, DumpErrorKind, Dumper, TrailElement};
use crate::name_layout::{Extractor, OutCrown, OutExtraMove, OutputNameLayout, Sieve};
use crate::provider::{CannotProvide, ProvideResult};
use crate::shape::{AccessFailure, Accessor, FieldDefault, OutputShape};
use crate::value::Value;
use indexmap::IndexMap;

struct CompiledField {
    accessor: Accessor,
    dumper: Dumper,
    trail: TrailElement,
}

enum CompiledOutCrown {
    Dict(Vec<OutEntry>),
    List(Vec<CompiledOutCrown>),
    Field(CompiledField),
    None(FieldDefault),
}

struct OutEntry {
    key: Value,
    crown: CompiledOutCrown,
    sieve: Option<Sieve>,
    /// Kept even when it dumps to an empty dict
    required: bool,
}

enum CompiledExtraMove {
    Targets(Vec<CompiledField>),
    Extract(Extractor),
}

/// Compiled form of a model dumper
pub struct ModelDumperPlan {
    model_name: String,
    root: CompiledOutCrown,
    extra_move: Option<CompiledExtraMove>,
    debug_trail: DebugTrail,
}

/// Builds a [`ModelDumperPlan`] from a shape, a layout and field dumpers
pub struct ModelDumperGen<'a> {
    pub model_name: String,
    pub shape: &'a OutputShape,
    pub layout: &'a OutputNameLayout,
    pub field_dumpers: &'a IndexMap<String, Dumper>,
    pub debug_trail: DebugTrail,
}

impl ModelDumperGen<'_> {
    pub fn compile(self) -> ProvideResult<ModelDumperPlan> {
        let root = self.compile_crown(&self.layout.crown)?;
        let extra_move = match &self.layout.extra_move {
            None => None,
            Some(OutExtraMove::Targets(ids)) => Some(CompiledExtraMove::Targets(
                ids.iter().map(|id| self.compile_field(id)).collect::<ProvideResult<Vec<_>>>()?,
            )),
            Some(OutExtraMove::Extract(extractor)) => Some(CompiledExtraMove::Extract(extractor.clone())),
        };
        Ok(ModelDumperPlan {
            model_name: self.model_name,
            root,
            extra_move,
            debug_trail: self.debug_trail,
        })
    }

    fn compile_field(&self, id: &str) -> ProvideResult<CompiledField> {
        let field = self
            .shape
            .field(id)
            .ok_or_else(|| CannotProvide::terminal(format!("Field {:?} is not in the output shape", id)))?;
        let dumper = self
            .field_dumpers
            .get(id)
            .cloned()
            .ok_or_else(|| CannotProvide::terminal(format!("No dumper for field {:?}", id)))?;
        let trail = match &field.accessor {
            Accessor::Item { key, .. } => TrailElement::Key(key.clone()),
            Accessor::Attr { name, .. } | Accessor::Method { name, .. } | Accessor::Property { name, .. } => {
                TrailElement::Attr(name.clone())
            }
        };
        Ok(CompiledField {
            accessor: field.accessor.clone(),
            dumper,
            trail,
        })
    }

    fn compile_crown(&self, crown: &OutCrown) -> ProvideResult<CompiledOutCrown> {
        let compiled = match crown {
            OutCrown::Dict(dict) => CompiledOutCrown::Dict(
                dict.map
                    .iter()
                    .map(|(key, sub)| {
                        Ok(OutEntry {
                            key: Value::str(key.as_str()),
                            crown: self.compile_crown(sub)?,
                            sieve: dict.sieves.get(key).cloned(),
                            required: self.is_required(sub),
                        })
                    })
                    .collect::<ProvideResult<Vec<_>>>()?,
            ),
            OutCrown::List(list) => CompiledOutCrown::List(
                list.map
                    .iter()
                    .map(|sub| self.compile_crown(sub))
                    .collect::<ProvideResult<Vec<_>>>()?,
            ),
            OutCrown::Field(id) => CompiledOutCrown::Field(self.compile_field(id)?),
            OutCrown::None(default) => CompiledOutCrown::None(default.clone()),
        };
        Ok(compiled)
    }

    fn is_required(&self, crown: &OutCrown) -> bool {
        match crown {
            OutCrown::Field(id) => self.shape.field(id).is_some_and(|f| f.is_required()),
            OutCrown::None(_) => false,
            OutCrown::List(_) => true,
            OutCrown::Dict(dict) => dict.map.values().any(|sub| self.is_required(sub)),
        }
    }
}

impl CompiledField {
    /// Raw field value, `None` when a tolerated field is missing
    fn read(&self, model: &Value) -> Result<Option<Value>, DumpError> {
        match self.accessor.get(model) {
            Ok(value) => Ok(Some(value)),
            Err(AccessFailure::Missing { .. }) if self.accessor.access_error() => Ok(None),
            Err(failure) => Err(DumpError::from(failure).at(self.trail.clone())),
        }
    }

    fn dump(&self, raw: &Value) -> Result<Value, DumpError> {
        self.dumper.call(raw).map_err(|err| err.at(self.trail.clone()))
    }
}

impl ModelDumperPlan {
    fn stops_early(&self, errors: &[DumpError]) -> bool {
        self.debug_trail != DebugTrail::All && !errors.is_empty()
    }

    fn dump_crown(&self, crown: &CompiledOutCrown, model: &Value, errors: &mut Vec<DumpError>) -> Option<Value> {
        match crown {
            CompiledOutCrown::Field(field) => match field.read(model).and_then(|raw| raw.map(|v| field.dump(&v)).transpose()) {
                Ok(value) => value,
                Err(err) => {
                    errors.push(err);
                    None
                }
            },
            CompiledOutCrown::None(default) => Some(default.produce(model).unwrap_or(Value::None)),
            CompiledOutCrown::List(items) => {
                let mut result = Vec::with_capacity(items.len());
                for item in items {
                    result.push(self.dump_crown(item, model, errors).unwrap_or(Value::None));
                    if self.stops_early(errors) {
                        return None;
                    }
                }
                Some(Value::List(result))
            }
            CompiledOutCrown::Dict(entries) => {
                let mut result = IndexMap::with_capacity(entries.len());
                for entry in entries {
                    if let Some(value) = self.dump_entry(entry, model, errors) {
                        result.insert(entry.key.clone(), value);
                    }
                    if self.stops_early(errors) {
                        return None;
                    }
                }
                Some(Value::Dict(result))
            }
        }
    }

    fn dump_entry(&self, entry: &OutEntry, model: &Value, errors: &mut Vec<DumpError>) -> Option<Value> {
        if let (Some(sieve), CompiledOutCrown::Field(field)) = (&entry.sieve, &entry.crown) {
            let raw = match field.read(model) {
                Ok(raw) => raw?,
                Err(err) => {
                    errors.push(err);
                    return None;
                }
            };
            if !sieve.keeps(model, &raw) {
                return None;
            }
            return match field.dump(&raw) {
                Ok(value) => Some(value),
                Err(err) => {
                    errors.push(err);
                    None
                }
            };
        }
        let value = self.dump_crown(&entry.crown, model, errors)?;
        match &value {
            Value::Dict(map) if map.is_empty() && !entry.required => None,
            _ => Some(value),
        }
    }

    fn extra(&self, model: &Value) -> Result<Vec<Value>, DumpError> {
        match &self.extra_move {
            None => Ok(Vec::new()),
            Some(CompiledExtraMove::Extract(extractor)) => Ok(vec![extractor.call(model)?]),
            Some(CompiledExtraMove::Targets(fields)) => {
                let mut extras = Vec::with_capacity(fields.len());
                for field in fields {
                    if let Some(raw) = field.read(model)? {
                        extras.push(field.dump(&raw)?);
                    }
                }
                Ok(extras)
            }
        }
    }

    fn merge_extra(&self, dumped: &mut Value, extras: Vec<Value>) -> Result<(), DumpError> {
        if extras.is_empty() {
            return Ok(());
        }
        let Value::Dict(root) = dumped else {
            return Err(DumpError::msg("Extra data can only be merged into a dict"));
        };
        for extra in extras {
            let Value::Dict(extra) = extra else {
                return Err(DumpError::type_error("dict", extra.type_name()));
            };
            let collisions: Vec<String> = extra
                .keys()
                .filter(|key| root.contains_key(*key))
                .map(|key| key.as_str().map_or_else(|| key.to_string(), str::to_string))
                .collect();
            if !collisions.is_empty() {
                return Err(DumpError::new(DumpErrorKind::ExtraCollision { keys: collisions }));
            }
            root.extend(extra);
        }
        Ok(())
    }

    fn fail(&self, mut errors: Vec<DumpError>) -> DumpError {
        match self.debug_trail {
            DebugTrail::All => DumpError::aggregate(format!("while dumping model {}", self.model_name), errors),
            DebugTrail::First => errors.swap_remove(0),
            DebugTrail::Disable => strip_dump_trail(errors.swap_remove(0)),
        }
    }

    /// Run the plan over a model value
    pub fn dump(&self, model: &Value) -> Result<Value, DumpError> {
        let mut errors = Vec::new();
        let dumped = self.dump_crown(&self.root, model, &mut errors);
        if !errors.is_empty() {
            return Err(self.fail(errors));
        }
        let mut dumped = dumped.unwrap_or(Value::None);
        let extras = self.extra(model)?;
        self.merge_extra(&mut dumped, extras)?;
        Ok(dumped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name_layout::{OutDictCrown, OutListCrown};
    use crate::shape::OutputField;
    use crate::types::{ClassDef, TypeExpr};

    fn shape() -> OutputShape {
        let mut b = OutputField::new(
            "b",
            TypeExpr::int(),
            Accessor::Attr {
                name: "b".to_string(),
                access_error: false,
            },
        );
        b.default = FieldDefault::Value(Value::Int(0));
        let c = OutputField::new(
            "c",
            TypeExpr::int(),
            Accessor::Attr {
                name: "c".to_string(),
                access_error: true,
            },
        );
        OutputShape::new(vec![OutputField::new("a", TypeExpr::int(), Accessor::attr("a")), b, c]).unwrap()
    }

    fn plan(crown: OutCrown, debug_trail: DebugTrail) -> ModelDumperPlan {
        let shape = shape();
        let layout = OutputNameLayout { crown, extra_move: None };
        let int_dumper = Dumper::new(|value| match value {
            Value::Int(_) => Ok(value.clone()),
            other => Err(DumpError::type_error("int", other.type_name())),
        });
        let dumpers: IndexMap<String, Dumper> = ["a", "b", "c"].into_iter().map(|id| (id.to_string(), int_dumper.clone())).collect();
        ModelDumperGen {
            model_name: "Model".to_string(),
            shape: &shape,
            layout: &layout,
            field_dumpers: &dumpers,
            debug_trail,
        }
        .compile()
        .unwrap()
    }

    fn field(id: &str) -> OutCrown {
        OutCrown::Field(id.to_string())
    }

    #[test]
    fn test_sieve_and_missing_optional() {
        let crown = OutCrown::Dict(OutDictCrown {
            map: IndexMap::from([
                ("a".to_string(), field("a")),
                ("b".to_string(), field("b")),
                ("c".to_string(), field("c")),
            ]),
            sieves: IndexMap::from([("b".to_string(), Sieve::omit_default(FieldDefault::Value(Value::Int(0))))]),
        });
        let plan = plan(crown, DebugTrail::All);
        let class = ClassDef::record("Model").build();

        let model = class.instance([("a", Value::Int(1)), ("b", Value::Int(0))]);
        assert_eq!(plan.dump(&model).unwrap(), Value::dict([("a", Value::Int(1))]));

        let model = class.instance([("a", Value::Int(1)), ("b", Value::Int(2)), ("c", Value::Int(3))]);
        assert_eq!(
            plan.dump(&model).unwrap(),
            Value::dict([("a", Value::Int(1)), ("b", Value::Int(2)), ("c", Value::Int(3))])
        );
    }

    #[test]
    fn test_errors_carry_attr_trail() {
        let crown = OutCrown::Dict(OutDictCrown {
            map: IndexMap::from([("a".to_string(), field("a")), ("b".to_string(), field("b"))]),
            sieves: IndexMap::new(),
        });
        let class = ClassDef::record("Model").build();
        let model = class.instance([("a", Value::str("x")), ("b", Value::str("y"))]);

        let err = plan(crown.clone(), DebugTrail::All).dump(&model).unwrap_err();
        let leaves = err.flatten();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[1].trail.elements(), &[TrailElement::attr("b")]);

        let err = plan(crown, DebugTrail::First).dump(&class.instance([("b", Value::Int(1))])).unwrap_err();
        assert!(matches!(err.kind, DumpErrorKind::Access { .. }));
        assert_eq!(err.trail.elements(), &[TrailElement::attr("a")]);
    }

    #[test]
    fn test_list_crown_with_placeholder() {
        let crown = OutCrown::List(OutListCrown {
            map: vec![field("a"), OutCrown::None(FieldDefault::NoDefault), field("b")],
        });
        let class = ClassDef::record("Model").build();
        let model = class.instance([("a", Value::Int(1)), ("b", Value::Int(2))]);
        assert_eq!(
            plan(crown, DebugTrail::All).dump(&model).unwrap(),
            Value::list([Value::Int(1), Value::None, Value::Int(2)])
        );
    }
}
