//! Model to model coercion
//!
//! The destination's input shape is paired with the source's output shape.
//! Every destination field gets a linking, every linking a sub-plan, and the
//! sub-plans become the arguments of the destination constructor. The
//! resulting [`BroachingPlan`] is a closure tree evaluated on each call.

use crate::conversion::{
    Coercer, CoercerRequest, ConversionError, ConversionErrorKind, LinkFunction, LinkingRequest, LinkingResult,
    UnlinkedOptionalPolicyRequest,
};
use crate::location::{Loc, LocStack};
use crate::morphing::TrailElement;
use crate::provider::{CannotProvide, Mediator, ProvideError, ProvideResult, Provider};
use crate::shape::{
    Accessor, CallArgs, Constructor, FieldDefault, InputField, InputShape, InputShapeRequest, OutputShape,
    OutputShapeRequest, ParamKind,
};
use crate::value::Value;
use indexmap::IndexMap;

/// Argument of a call in a plan
#[derive(Debug, Clone)]
pub struct PlanArg {
    /// `None` for a positional argument
    pub keyword: Option<String>,
    pub field_id: String,
    pub plan: BroachingPlan,
}

/// Expression tree computing a destination value from the source model and
/// the converter parameters
#[derive(Debug, Clone)]
pub enum BroachingPlan {
    /// The source model itself
    Source,
    /// A converter parameter by position
    Context(usize),
    Constant(FieldDefault),
    Access { target: Box<BroachingPlan>, accessor: Accessor },
    Coerce { coercer: Coercer, arg: Box<BroachingPlan> },
    Call { func: LinkFunction, args: Vec<PlanArg> },
    Construct { model: String, constructor: Constructor, args: Vec<PlanArg> },
}

impl BroachingPlan {
    pub fn eval(&self, data: &Value, ctx: &[Value]) -> Result<Value, ConversionError> {
        match self {
            BroachingPlan::Source => Ok(data.clone()),
            BroachingPlan::Context(index) => ctx
                .get(*index)
                .cloned()
                .ok_or_else(|| ConversionError::msg(format!("converter parameter #{} is missing", index))),
            BroachingPlan::Constant(constant) => Ok(constant.produce(data).unwrap_or(Value::None)),
            BroachingPlan::Access { target, accessor } => Ok(accessor.get(&target.eval(data, ctx)?)?),
            BroachingPlan::Coerce { coercer, arg } => coercer.call(&arg.eval(data, ctx)?, ctx),
            BroachingPlan::Call { func, args } => func.call(call_args(args, data, ctx)?),
            BroachingPlan::Construct { model, constructor, args } => {
                constructor.call(call_args(args, data, ctx)?).map_err(|source| {
                    ConversionError::new(ConversionErrorKind::Construction {
                        model: model.clone(),
                        source,
                    })
                })
            }
        }
    }
}

fn call_args(args: &[PlanArg], data: &Value, ctx: &[Value]) -> Result<CallArgs, ConversionError> {
    let mut call = CallArgs::default();
    for arg in args {
        let value = arg
            .plan
            .eval(data, ctx)
            .map_err(|e| e.at(TrailElement::attr(&arg.field_id)))?;
        match &arg.keyword {
            Some(keyword) => {
                call.keyword.insert(keyword.clone(), value);
            }
            None => call.positional.push(value),
        }
    }
    Ok(call)
}

/// Coerces a model into another model field by field
#[derive(Debug, Clone, Default)]
pub struct ModelCoercerProvider;

const REQUIRED_NOTE: &str = "Note: This is a required field, so it must take value";
const POLICY_NOTE: &str = "Note: Current policy forbids unlinked optional fields, so you need to link it to \
                           another field or explicitly confirm the desire to skipping using `allow_unlinked_optional`";

fn fetch_shapes(mediator: &Mediator<'_>, request: &CoercerRequest) -> ProvideResult<(InputShape, OutputShape)> {
    let dst = mediator.provide(&InputShapeRequest::new(request.dst.clone()));
    let src = mediator.provide(&OutputShapeRequest::new(request.src.clone()));
    match (dst, src) {
        (Ok(dst), Ok(src)) => Ok((dst, src)),
        (Err(ProvideError::Fatal(e)), _) | (_, Err(ProvideError::Fatal(e))) => Err(ProvideError::Fatal(e)),
        (Err(_), Ok(_)) => Err(not_a_model(&request.dst).into()),
        (Ok(_), Err(_)) => Err(not_a_model(&request.src).into()),
        (Err(_), Err(_)) => Err(ProvideError::skip()),
    }
}

fn not_a_model(loc_stack: &LocStack) -> CannotProvide {
    CannotProvide::new(format!("Type {} is not recognized as model", loc_stack.last_type())).with_note(
        "Hint: declare it as a record, a typed dict or a named tuple, or link the field explicitly",
    )
}

fn name_cause(mut cause: CannotProvide, message: impl FnOnce() -> String) -> CannotProvide {
    if cause.message.is_empty() {
        cause.message = message();
    }
    cause
}

impl ModelCoercerProvider {
    fn fetch_linkings<'s>(
        &self,
        mediator: &Mediator<'_>,
        request: &CoercerRequest,
        dst_shape: &'s InputShape,
        src_shape: &OutputShape,
    ) -> ProvideResult<Vec<(&'s InputField, Option<LinkingResult>)>> {
        let sources: Vec<LocStack> = src_shape
            .fields
            .iter()
            .map(|field| request.src.append(Loc::output_field(field)))
            .collect();

        let mut linkings = Vec::new();
        let mut failures = Vec::new();
        for field in &dst_shape.fields {
            let destination = request.dst.append(Loc::input_field(field));
            let linking_request = LinkingRequest {
                sources: sources.clone(),
                context: request.ctx.clone(),
                destination: destination.clone(),
            };
            let cause = match mediator.provide(&linking_request) {
                Ok(linking) => {
                    linkings.push((field, Some(linking)));
                    continue;
                }
                Err(ProvideError::Fatal(e)) => return Err(ProvideError::Fatal(e)),
                Err(ProvideError::CannotProvide(cause)) => {
                    name_cause(cause, || format!("Cannot find linking for {}", destination))
                }
            };
            if field.is_required {
                failures.push(if cause.is_terminal { cause } else { cause.with_note(REQUIRED_NOTE) });
                continue;
            }
            let policy = mediator.mandatory_provide(&UnlinkedOptionalPolicyRequest::new(destination), |_| {
                format!("Cannot fetch unlinked optional policy for field {}", field.id)
            })?;
            if policy.is_allowed {
                linkings.push((field, None));
            } else {
                failures.push(cause.with_note(POLICY_NOTE));
            }
        }

        if failures.is_empty() {
            Ok(linkings)
        } else {
            Err(CannotProvide::aggregate(
                "Cannot create coercer for models. Linkings for some fields are not found",
                failures,
            )
            .make_terminal()
            .into())
        }
    }

    fn field_plan(
        &self,
        mediator: &Mediator<'_>,
        request: &CoercerRequest,
        source: &LocStack,
        coercer: &Option<Coercer>,
    ) -> ProvideResult<BroachingPlan> {
        let coercer = match coercer {
            Some(coercer) => coercer.clone(),
            None => mediator
                .provide(&CoercerRequest::new(source.clone(), request.ctx.clone(), request.dst.clone()))
                .map_err(|err| match err {
                    ProvideError::CannotProvide(cause) => ProvideError::CannotProvide(name_cause(cause, || {
                        format!("Cannot find coercer for linking {} ──▷ {}", source, request.dst)
                    })),
                    fatal => fatal,
                })?,
        };
        let arg = match request.ctx.position(source) {
            Some(index) => BroachingPlan::Context(index),
            None => match source.last() {
                Some(Loc::OutputField { accessor, .. }) => BroachingPlan::Access {
                    target: Box::new(BroachingPlan::Source),
                    accessor: accessor.clone(),
                },
                _ => {
                    return Err(CannotProvide::terminal(format!("Linking source {} cannot be read", source)).into())
                }
            },
        };
        Ok(BroachingPlan::Coerce {
            coercer,
            arg: Box::new(arg),
        })
    }

    fn function_plan(
        &self,
        mediator: &Mediator<'_>,
        request: &CoercerRequest,
        func: &LinkFunction,
        param_specs: &[crate::conversion::ParamSpec],
    ) -> ProvideResult<BroachingPlan> {
        let linkings: Vec<(&InputField, LinkingResult)> =
            param_specs.iter().map(|spec| (&spec.field, spec.linking.clone())).collect();
        let plans = self
            .sub_plans(mediator, request, &linkings, Some(func))
            .map_err(|err| match err {
                ProvideError::CannotProvide(cause) => ProvideError::CannotProvide(
                    cause.with_note(format!("Linking: {} ──▷ {}", request.src, request.dst)),
                ),
                fatal => fatal,
            })?;
        let args = param_specs
            .iter()
            .zip(plans)
            .map(|(spec, plan)| PlanArg {
                keyword: (spec.kind == ParamKind::KwOnly).then(|| spec.field.id.clone()),
                field_id: spec.field.id.clone(),
                plan,
            })
            .collect();
        Ok(BroachingPlan::Call {
            func: func.clone(),
            args,
        })
    }

    fn sub_plan(
        &self,
        mediator: &Mediator<'_>,
        request: &CoercerRequest,
        linking: &LinkingResult,
    ) -> ProvideResult<BroachingPlan> {
        match linking {
            LinkingResult::Constant(constant) => Ok(BroachingPlan::Constant(constant.clone())),
            LinkingResult::Model => Ok(BroachingPlan::Source),
            LinkingResult::Field { source, coercer } => self.field_plan(mediator, request, source, coercer),
            LinkingResult::Function { func, param_specs } => self.function_plan(mediator, request, func, param_specs),
        }
    }

    fn sub_plans(
        &self,
        mediator: &Mediator<'_>,
        request: &CoercerRequest,
        linkings: &[(&InputField, LinkingResult)],
        parent: Option<&LinkFunction>,
    ) -> ProvideResult<Vec<BroachingPlan>> {
        let mut plans = Vec::new();
        let mut failures = Vec::new();
        for (field, linking) in linkings {
            match self.sub_plan(mediator, &request.append_dst_loc(Loc::input_field(field)), linking) {
                Ok(plan) => plans.push(plan),
                Err(ProvideError::CannotProvide(cause)) => failures.push(cause),
                Err(fatal) => return Err(fatal),
            }
        }
        if failures.is_empty() {
            return Ok(plans);
        }
        let message = match parent {
            None => "Cannot create coercer for models. Coercers for some linkings are not found".to_string(),
            Some(func) => format!(
                "Cannot create coercer for model and function ‹{}›. Coercers for some linkings are not found",
                func.name()
            ),
        };
        Err(CannotProvide::aggregate(message, failures).make_terminal().into())
    }

    fn constructor_call(
        &self,
        model: String,
        dst_shape: &InputShape,
        plans: &IndexMap<String, BroachingPlan>,
    ) -> ProvideResult<BroachingPlan> {
        let mut args = Vec::new();
        let mut has_skipped = false;
        for param in &dst_shape.params {
            let Some(plan) = plans.get(&param.field_id) else {
                has_skipped = true;
                continue;
            };
            let keyword = match param.kind {
                ParamKind::PosOnly if has_skipped => {
                    return Err(CannotProvide::new(
                        "Cannot generate consistent constructor call, positional-only parameter is skipped",
                    )
                    .into())
                }
                ParamKind::KwOnly => Some(param.name.clone()),
                _ if has_skipped => Some(param.name.clone()),
                _ => None,
            };
            args.push(PlanArg {
                keyword,
                field_id: param.field_id.clone(),
                plan: plan.clone(),
            });
        }
        Ok(BroachingPlan::Construct {
            model,
            constructor: dst_shape.constructor.clone(),
            args,
        })
    }
}

impl Provider for ModelCoercerProvider {
    fn provide_coercer(&self, mediator: &Mediator<'_>, request: &CoercerRequest) -> ProvideResult<Coercer> {
        let (dst_shape, src_shape) = fetch_shapes(mediator, request)?;
        let linkings = self.fetch_linkings(mediator, request, &dst_shape, &src_shape)?;
        let linked: Vec<(&InputField, LinkingResult)> = linkings
            .into_iter()
            .filter_map(|(field, linking)| linking.map(|linking| (field, linking)))
            .collect();
        let plans = self.sub_plans(mediator, request, &linked, None)?;
        let plans: IndexMap<String, BroachingPlan> =
            linked.iter().map(|(field, _)| field.id.clone()).zip(plans).collect();

        let model = request.dst.last_type().to_string();
        let plan = self.constructor_call(model.clone(), &dst_shape, &plans)?;
        log::trace!("compiled coercer from {} to {}", request.src.last_type(), model);
        Ok(Coercer::new(move |data, ctx| plan.eval(data, ctx)))
    }
}
