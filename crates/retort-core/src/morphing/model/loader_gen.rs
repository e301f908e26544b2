//! Model loader generation
//!
//! [`ModelLoaderGen`] walks the input crown once at build time and produces
//! a [`ModelLoaderPlan`]: the crown with field loaders attached, the
//! constructor call layout and the extra data move. The loader closure only
//! interprets the plan.
//!
//! Errors found while walking the crown carry the trail from the model root.
//! In `All` mode every error of the model is gathered into one aggregate,
//! otherwise loading stops at the first one.

use crate::morphing::{strip_load_trail, DebugTrail, LoadError, LoadErrorKind, Loader, TrailElement};
use crate::name_layout::{
    DictExtraPolicy, InpCrown, InpExtraMove, InputNameLayout, ListExtraPolicy, Saturator,
};
use crate::provider::{CannotProvide, ProvideResult};
use crate::shape::{CallArgs, Constructor, InputShape, Param, ParamKind};
use crate::value::Value;
use indexmap::IndexMap;

enum CompiledInpCrown {
    Dict {
        entries: Vec<DictEntry>,
        extra_policy: DictExtraPolicy,
    },
    List {
        items: Vec<CompiledInpCrown>,
        extra_policy: ListExtraPolicy,
    },
    Field {
        id: String,
        loader: Loader,
    },
    None,
}

struct DictEntry {
    key: Value,
    crown: CompiledInpCrown,
    /// The key must be present: the branch holds a required field
    required: bool,
}

enum CompiledExtraMove {
    Targets(Vec<(String, Loader)>),
    Kwargs(Option<Loader>),
    Saturate(Saturator),
}

/// Compiled form of a model loader
pub struct ModelLoaderPlan {
    model_name: String,
    root: CompiledInpCrown,
    params: Vec<Param>,
    constructor: Constructor,
    extra_move: Option<CompiledExtraMove>,
    debug_trail: DebugTrail,
}

/// Builds a [`ModelLoaderPlan`] from a shape, a layout and field loaders
pub struct ModelLoaderGen<'a> {
    pub model_name: String,
    pub shape: &'a InputShape,
    pub layout: &'a InputNameLayout,
    pub field_loaders: &'a IndexMap<String, Loader>,
    /// Loader of values spread into keyword arguments
    pub kwargs_loader: Option<Loader>,
    pub debug_trail: DebugTrail,
}

impl ModelLoaderGen<'_> {
    pub fn compile(self) -> ProvideResult<ModelLoaderPlan> {
        let root = self.compile_crown(&self.layout.crown)?;
        let extra_move = match &self.layout.extra_move {
            None => None,
            Some(InpExtraMove::Targets(ids)) => Some(CompiledExtraMove::Targets(
                ids.iter()
                    .map(|id| Ok((id.clone(), self.field_loader(id)?)))
                    .collect::<ProvideResult<Vec<_>>>()?,
            )),
            Some(InpExtraMove::Kwargs) => Some(CompiledExtraMove::Kwargs(self.kwargs_loader.clone())),
            Some(InpExtraMove::Saturate(saturator)) => Some(CompiledExtraMove::Saturate(saturator.clone())),
        };
        Ok(ModelLoaderPlan {
            model_name: self.model_name,
            root,
            params: self.shape.params.clone(),
            constructor: self.shape.constructor.clone(),
            extra_move,
            debug_trail: self.debug_trail,
        })
    }

    fn field_loader(&self, id: &str) -> ProvideResult<Loader> {
        self.field_loaders
            .get(id)
            .cloned()
            .ok_or_else(|| CannotProvide::terminal(format!("No loader for field {:?}", id)).into())
    }

    fn compile_crown(&self, crown: &InpCrown) -> ProvideResult<CompiledInpCrown> {
        let compiled = match crown {
            InpCrown::Dict(dict) => CompiledInpCrown::Dict {
                entries: dict
                    .map
                    .iter()
                    .map(|(key, sub)| {
                        Ok(DictEntry {
                            key: Value::str(key.as_str()),
                            crown: self.compile_crown(sub)?,
                            required: self.is_required(sub),
                        })
                    })
                    .collect::<ProvideResult<Vec<_>>>()?,
                extra_policy: dict.extra_policy,
            },
            InpCrown::List(list) => CompiledInpCrown::List {
                items: list
                    .map
                    .iter()
                    .map(|sub| self.compile_crown(sub))
                    .collect::<ProvideResult<Vec<_>>>()?,
                extra_policy: list.extra_policy,
            },
            InpCrown::Field(id) => CompiledInpCrown::Field {
                id: id.clone(),
                loader: self.field_loader(id)?,
            },
            InpCrown::None => CompiledInpCrown::None,
        };
        Ok(compiled)
    }

    fn is_required(&self, crown: &InpCrown) -> bool {
        match crown {
            InpCrown::Field(id) => self.shape.field(id).is_some_and(|f| f.is_required),
            InpCrown::None => false,
            // list positions are occupied by required fields only
            InpCrown::List(list) => !list.map.is_empty(),
            InpCrown::Dict(dict) => dict.map.values().any(|sub| self.is_required(sub)),
        }
    }
}

fn key_name(key: &Value) -> String {
    match key {
        Value::Str(name) => name.clone(),
        other => other.to_string(),
    }
}

/// Mutable state of one load
#[derive(Default)]
struct LoadState {
    values: IndexMap<String, Value>,
    extra: IndexMap<Value, Value>,
}

impl ModelLoaderPlan {
    fn stops_early(&self, errors: &[LoadError]) -> bool {
        self.debug_trail != DebugTrail::All && !errors.is_empty()
    }

    fn load_crown(
        &self,
        crown: &CompiledInpCrown,
        data: &Value,
        values: &mut IndexMap<String, Value>,
        extra: &mut IndexMap<Value, Value>,
    ) -> Vec<LoadError> {
        match crown {
            CompiledInpCrown::Dict { entries, extra_policy } => {
                self.load_dict(entries, *extra_policy, data, values, extra)
            }
            CompiledInpCrown::List { items, extra_policy } => self.load_list(items, *extra_policy, data, values, extra),
            CompiledInpCrown::Field { id, loader } => match loader.call(data) {
                Ok(value) => {
                    values.insert(id.clone(), value);
                    Vec::new()
                }
                Err(err) => vec![err],
            },
            CompiledInpCrown::None => Vec::new(),
        }
    }

    fn load_dict(
        &self,
        entries: &[DictEntry],
        extra_policy: DictExtraPolicy,
        data: &Value,
        values: &mut IndexMap<String, Value>,
        extra: &mut IndexMap<Value, Value>,
    ) -> Vec<LoadError> {
        let Value::Dict(map) = data else {
            return vec![LoadError::type_error("dict", data)];
        };
        let mut errors = Vec::new();

        if extra_policy == DictExtraPolicy::Forbid {
            let unknown: Vec<String> = map
                .keys()
                .filter(|key| !entries.iter().any(|e| e.key == **key))
                .map(key_name)
                .collect();
            if !unknown.is_empty() {
                errors.push(LoadError::new(LoadErrorKind::ExtraFields {
                    fields: unknown,
                    input_value: data.clone(),
                }));
                if self.stops_early(&errors) {
                    return errors;
                }
            }
        }

        let missing: Vec<String> = entries
            .iter()
            .filter(|e| e.required && !map.contains_key(&e.key))
            .map(|e| key_name(&e.key))
            .collect();
        if !missing.is_empty() {
            errors.push(LoadError::new(LoadErrorKind::NoRequiredFields {
                fields: missing,
                input_value: data.clone(),
            }));
            if self.stops_early(&errors) {
                return errors;
            }
        }

        for entry in entries {
            let Some(sub_data) = map.get(&entry.key) else {
                continue;
            };
            let mut sub_extra = IndexMap::new();
            let sub_errors = self.load_crown(&entry.crown, sub_data, values, &mut sub_extra);
            if !sub_extra.is_empty() {
                extra.insert(entry.key.clone(), Value::Dict(sub_extra));
            }
            errors.extend(sub_errors.into_iter().map(|err| err.at(TrailElement::Key(entry.key.clone()))));
            if self.stops_early(&errors) {
                return errors;
            }
        }

        if extra_policy == DictExtraPolicy::Collect {
            for (key, value) in map {
                if !entries.iter().any(|e| e.key == *key) {
                    extra.insert(key.clone(), value.clone());
                }
            }
        }
        errors
    }

    fn load_list(
        &self,
        items: &[CompiledInpCrown],
        extra_policy: ListExtraPolicy,
        data: &Value,
        values: &mut IndexMap<String, Value>,
        extra: &mut IndexMap<Value, Value>,
    ) -> Vec<LoadError> {
        let data_items = match data {
            Value::List(data_items) | Value::Tuple(data_items) => data_items,
            other => return vec![LoadError::type_error("list", other)],
        };
        if data_items.len() < items.len() {
            return vec![LoadError::new(LoadErrorKind::NoRequiredItems {
                expected_len: items.len(),
                input_value: data.clone(),
            })];
        }
        let mut errors = Vec::new();
        if extra_policy == ListExtraPolicy::Forbid && data_items.len() > items.len() {
            errors.push(LoadError::new(LoadErrorKind::ExtraItems {
                expected_len: items.len(),
                input_value: data.clone(),
            }));
            if self.stops_early(&errors) {
                return errors;
            }
        }
        for (index, (crown, item)) in items.iter().zip(data_items).enumerate() {
            let sub_errors = self.load_crown(crown, item, values, extra);
            errors.extend(sub_errors.into_iter().map(|err| err.at(TrailElement::Index(index))));
            if self.stops_early(&errors) {
                return errors;
            }
        }
        errors
    }

    fn fail(&self, mut errors: Vec<LoadError>) -> LoadError {
        match self.debug_trail {
            DebugTrail::All => LoadError::aggregate(format!("while loading model {}", self.model_name), errors),
            DebugTrail::First => errors.swap_remove(0),
            DebugTrail::Disable => strip_load_trail(errors.swap_remove(0)),
        }
    }

    fn move_extra(&self, state: &mut LoadState, errors: &mut Vec<LoadError>) {
        let Some(CompiledExtraMove::Targets(targets)) = &self.extra_move else {
            return;
        };
        let extra = Value::Dict(state.extra.clone());
        for (id, loader) in targets {
            match loader.call(&extra) {
                Ok(value) => {
                    state.values.insert(id.clone(), value);
                }
                Err(err) => errors.push(err),
            }
            if self.stops_early(errors) {
                return;
            }
        }
    }

    fn call_args(&self, state: &mut LoadState) -> Result<CallArgs, LoadError> {
        let mut args = CallArgs::default();
        for param in &self.params {
            let Some(value) = state.values.shift_remove(&param.field_id) else {
                continue;
            };
            if param.kind == ParamKind::PosOnly {
                args.positional.push(value);
            } else {
                args.keyword.insert(param.name.clone(), value);
            }
        }
        if let Some(CompiledExtraMove::Kwargs(kwargs_loader)) = &self.extra_move {
            for (key, value) in &state.extra {
                let Value::Str(name) = key else {
                    return Err(LoadError::type_error("str", key));
                };
                let value = match kwargs_loader {
                    Some(loader) => loader.call(value).map_err(|e| e.at(TrailElement::Key(key.clone())))?,
                    None => value.clone(),
                };
                args.keyword.insert(name.clone(), value);
            }
        }
        Ok(args)
    }

    /// Run the plan over wire data
    pub fn load(&self, data: &Value) -> Result<Value, LoadError> {
        match (&self.root, data) {
            (CompiledInpCrown::Dict { .. }, Value::Dict(_)) => {}
            (CompiledInpCrown::List { .. }, Value::List(_) | Value::Tuple(_)) => {}
            (CompiledInpCrown::Dict { .. }, other) => return Err(LoadError::type_error("dict", other)),
            (CompiledInpCrown::List { .. }, other) => return Err(LoadError::type_error("list", other)),
            _ => {}
        }

        let mut state = LoadState::default();
        let mut errors = self.load_crown(&self.root, data, &mut state.values, &mut state.extra);
        if !self.stops_early(&errors) {
            self.move_extra(&mut state, &mut errors);
        }
        if !errors.is_empty() {
            return Err(self.fail(errors));
        }

        let args = self.call_args(&mut state)?;
        let model = self.constructor.call(args)?;
        match &self.extra_move {
            Some(CompiledExtraMove::Saturate(saturator)) => saturator.call(model, &Value::Dict(state.extra)),
            _ => Ok(model),
        }
    }
}
