//! Model loader and dumper providers

use crate::location::Loc;
use crate::morphing::model::{ModelDumperGen, ModelLoaderGen};
use crate::morphing::{DumpError, Dumper, DumperRequest, Loader, LoaderRequest};
use crate::name_layout::{InpExtraMove, InputNameLayoutRequest, OutExtraMove, OutputNameLayoutRequest};
use crate::provider::{Mediator, ProvideResult, Provider};
use crate::shape::{InputShapeRequest, OutputShapeRequest};
use crate::types::{ClassKind, ClassRef};
use crate::value::Value;
use indexmap::IndexMap;

/// Loads any type that has an input shape
#[derive(Debug, Clone, Default)]
pub struct ModelLoaderProvider;

impl Provider for ModelLoaderProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        let shape = mediator.provide(&InputShapeRequest::new(request.loc_stack.clone()))?;
        let model_name = request.last_type().to_string();
        let layout = mediator.mandatory_provide(
            &InputNameLayoutRequest::new(request.loc_stack.clone(), shape.clone()),
            |_| format!("Cannot create loader for model {}. Cannot fetch input name layout", model_name),
        )?;

        let targets = layout.extra_move.as_ref().map(|m| m.targets().to_vec()).unwrap_or_default();
        let crown_ids = layout.crown.field_ids();
        let fields: Vec<_> = shape
            .fields
            .iter()
            .filter(|f| crown_ids.contains(&f.id.as_str()) || targets.contains(&f.id))
            .collect();
        let loaders = mediator.mandatory_provide_all(
            fields.iter().map(|f| request.append_loc(Loc::input_field(f))),
            || format!("Cannot create loader for model {}. Loaders for some fields cannot be created", model_name),
        )?;
        let field_loaders: IndexMap<String, Loader> = fields.iter().map(|f| f.id.clone()).zip(loaders).collect();

        let kwargs_loader = match (&layout.extra_move, &shape.kwargs) {
            (Some(InpExtraMove::Kwargs), Some(kwargs)) => Some(mediator.mandatory_provide(
                &request.append_loc(Loc::field("**kwargs", kwargs.ty.clone())),
                |_| format!("Cannot create loader for extra keyword arguments of {}", model_name),
            )?),
            _ => None,
        };

        let plan = ModelLoaderGen {
            model_name: model_name.clone(),
            shape: &shape,
            layout: &layout,
            field_loaders: &field_loaders,
            kwargs_loader,
            debug_trail: request.debug_trail,
        }
        .compile()?;
        log::trace!("compiled loader for model {} with fields {:?}", model_name, crown_ids);
        Ok(Loader::new(move |data| plan.load(data)))
    }
}

/// Dumps any type that has an output shape
#[derive(Debug, Clone, Default)]
pub struct ModelDumperProvider;

/// Whether `value` may be dumped as a model of `class`
fn is_model_value(class: &ClassRef, value: &Value) -> bool {
    match value {
        Value::Instance(instance) => instance.class().is_subclass_of(class),
        Value::Dict(_) => matches!(class.kind(), ClassKind::TypedDict(_)),
        _ => false,
    }
}

impl Provider for ModelDumperProvider {
    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        let shape = mediator.provide(&OutputShapeRequest::new(request.loc_stack.clone()))?;
        let model_name = request.last_type().to_string();
        let layout = mediator.mandatory_provide(
            &OutputNameLayoutRequest::new(request.loc_stack.clone(), shape.clone()),
            |_| format!("Cannot create dumper for model {}. Cannot fetch output name layout", model_name),
        )?;

        let targets = match &layout.extra_move {
            Some(OutExtraMove::Targets(targets)) => targets.clone(),
            _ => Vec::new(),
        };
        let crown_ids = layout.crown.field_ids();
        let fields: Vec<_> = shape
            .fields
            .iter()
            .filter(|f| crown_ids.contains(&f.id.as_str()) || targets.contains(&f.id))
            .collect();
        let dumpers = mediator.mandatory_provide_all(
            fields.iter().map(|f| request.append_loc(Loc::output_field(f))),
            || format!("Cannot create dumper for model {}. Dumpers for some fields cannot be created", model_name),
        )?;
        let field_dumpers: IndexMap<String, Dumper> = fields.iter().map(|f| f.id.clone()).zip(dumpers).collect();

        let plan = ModelDumperGen {
            model_name: model_name.clone(),
            shape: &shape,
            layout: &layout,
            field_dumpers: &field_dumpers,
            debug_trail: request.debug_trail,
        }
        .compile()?;
        log::trace!("compiled dumper for model {} with fields {:?}", model_name, crown_ids);

        let class = mediator.normalize(request.last_type())?.class().cloned();
        Ok(Dumper::new(move |value| match &class {
            Some(class) if !is_model_value(class, value) => {
                let actual = match value.type_name() {
                    name if name == class.name() => format!("another class named {}", name),
                    name => name,
                };
                Err(DumpError::type_error(&model_name, actual))
            }
            _ => plan.dump(value),
        }))
    }
}
