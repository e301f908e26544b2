//! Shape providers
//!
//! [`ShapeProvider`] exposes an introspector to the recipe and specialises
//! the shape for the requested type: type parameters are replaced by the
//! request's arguments (or the parameter's bound) and `Self` by the requested
//! type. [`PropertyProvider`] and [`ConstructorProvider`] amend the shapes of
//! individual classes.

use crate::introspection::Introspector;
use crate::provider::{Mediator, ProvideError, ProvideResult, Provider};
use crate::shape::{
    Accessor, Constructor, FieldDefault, Getter, InputField, InputShape, InputShapeRequest, OutputField, OutputShape,
    OutputShapeRequest, Param, ParamKind, ParamKwargs,
};
use crate::types::{ClassRef, NormType, Origin, TypeExpr};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ShapeProvider {
    introspector: Arc<dyn Introspector>,
}

impl ShapeProvider {
    pub fn new(introspector: Arc<dyn Introspector>) -> Self {
        ShapeProvider { introspector }
    }

    fn target(mediator: &Mediator<'_>, ty: &TypeExpr) -> ProvideResult<(NormType, ClassRef)> {
        let norm = mediator.normalize(ty)?;
        match norm.class() {
            Some(class) => {
                let class = class.clone();
                Ok((norm, class))
            }
            None => Err(ProvideError::skip()),
        }
    }
}

/// Type parameter substitutions for a (possibly parameterised) class
fn type_vars(norm: &NormType, class: &ClassRef) -> HashMap<String, TypeExpr> {
    class
        .type_params()
        .iter()
        .enumerate()
        .map(|(pos, param)| {
            let arg = match norm.type_arg(pos) {
                Some(arg) if !matches!(arg.origin(), Origin::Var(_)) => arg.source().clone(),
                _ => param.fallback(),
            };
            (param.name.clone(), arg)
        })
        .collect()
}

fn specialize(ty: &TypeExpr, vars: &HashMap<String, TypeExpr>, owner: &TypeExpr) -> TypeExpr {
    ty.substitute(vars).replace_self(owner)
}

impl Provider for ShapeProvider {
    fn provide_input_shape(&self, mediator: &Mediator<'_>, request: &InputShapeRequest) -> ProvideResult<InputShape> {
        let owner = request.loc_stack.last_type();
        let (norm, class) = Self::target(mediator, owner)?;
        let Some(mut shape) = self.introspector.input_shape(&class)? else {
            return Err(ProvideError::skip());
        };
        log::trace!("{} introspector produced input shape of {}", self.introspector.kind(), class);
        let vars = type_vars(&norm, &class);
        for field in &mut shape.fields {
            field.ty = specialize(&field.ty, &vars, owner);
        }
        if let Some(kwargs) = &mut shape.kwargs {
            kwargs.ty = specialize(&kwargs.ty, &vars, owner);
        }
        Ok(shape)
    }

    fn provide_output_shape(
        &self,
        mediator: &Mediator<'_>,
        request: &OutputShapeRequest,
    ) -> ProvideResult<OutputShape> {
        let owner = request.loc_stack.last_type();
        let (norm, class) = Self::target(mediator, owner)?;
        let Some(mut shape) = self.introspector.output_shape(&class)? else {
            return Err(ProvideError::skip());
        };
        log::trace!("{} introspector produced output shape of {}", self.introspector.kind(), class);
        let vars = type_vars(&norm, &class);
        for field in &mut shape.fields {
            field.ty = specialize(&field.ty, &vars, owner);
        }
        Ok(shape)
    }
}

/// Adds a computed output field read through a getter
#[derive(Debug, Clone)]
pub struct PropertyProvider {
    field: OutputField,
}

impl PropertyProvider {
    pub fn new(name: impl Into<String>, ty: TypeExpr, getter: Getter) -> Self {
        let name = name.into();
        PropertyProvider {
            field: OutputField::new(
                name.clone(),
                ty,
                Accessor::Property {
                    name,
                    getter,
                    access_error: false,
                },
            ),
        }
    }

    /// Default used by `omit_default`
    pub fn default(mut self, default: FieldDefault) -> Self {
        self.field.default = default;
        self
    }

    /// Skip the field when the getter reports a missing value
    pub fn access_error(mut self, tolerate: bool) -> Self {
        if let Accessor::Property { access_error, .. } = &mut self.field.accessor {
            *access_error = tolerate;
        }
        self
    }
}

impl Provider for PropertyProvider {
    fn provide_output_shape(
        &self,
        mediator: &Mediator<'_>,
        request: &OutputShapeRequest,
    ) -> ProvideResult<OutputShape> {
        let mut shape = mediator.provide_from_next(request)?;
        shape.fields.push(self.field.clone());
        Ok(OutputShape::new(shape.fields)?)
    }
}

/// Replaces the input shape of a class with an explicit signature
#[derive(Debug, Clone)]
pub struct ConstructorProvider {
    fields: Vec<(InputField, ParamKind)>,
    kwargs: Option<TypeExpr>,
    constructor: Constructor,
}

impl ConstructorProvider {
    pub fn new(constructor: Constructor) -> Self {
        ConstructorProvider {
            fields: Vec::new(),
            kwargs: None,
            constructor,
        }
    }

    pub fn param(mut self, field: InputField, kind: ParamKind) -> Self {
        self.fields.push((field, kind));
        self
    }

    pub fn kwargs(mut self, ty: TypeExpr) -> Self {
        self.kwargs = Some(ty);
        self
    }
}

impl Provider for ConstructorProvider {
    fn provide_input_shape(&self, _mediator: &Mediator<'_>, _request: &InputShapeRequest) -> ProvideResult<InputShape> {
        let params = self
            .fields
            .iter()
            .map(|(field, kind)| Param {
                field_id: field.id.clone(),
                name: field.id.clone(),
                kind: *kind,
            })
            .collect();
        let fields = self.fields.iter().map(|(field, _)| field.clone()).collect();
        Ok(InputShape::new(
            self.constructor.clone(),
            fields,
            params,
            self.kwargs.clone().map(|ty| ParamKwargs { ty }),
        )?)
    }
}
