//! The retort: a configured engine with cached callables
//!
//! A [`Retort`] holds the user recipe, the built-in recipe, the class
//! namespace and the settings. Loaders, dumpers and converters are built on
//! first use and cached per type; the settings and recipe never change
//! after construction, [`Retort::replace`] and [`Retort::extend`] return
//! new retorts with empty caches.
//!
//! Copyright (c) 2025 Retort Team
//! Licensed under the Apache-2.0 license

use crate::config::RetortConfig;
use crate::conversion::{
    BuiltinConverterProvider, Coercer, CoercerRequest, Converter, ConverterRequest, DefaultLinkingProvider,
    DictCoercerProvider, DstAnyCoercerProvider, IterableCoercerProvider, ModelCoercerProvider,
    OptionalCoercerProvider, SameTypeCoercerProvider, SubclassCoercerProvider, TypeTagsUnwrappingProvider,
    UnionSubcaseCoercerProvider, UnlinkedOptionalPolicyProvider,
};
use crate::introspection::builtin_introspectors;
use crate::location::LocStack;
use crate::morphing::{
    AnyProvider, BoolProvider, BytesBase64Provider, DateProvider, DatetimeIsoProvider, DebugTrail, DictProvider,
    Dumper, DumperRequest, EnumExactValueProvider, FloatProvider, IntProvider, IterableProvider, LiteralProvider,
    Loader, LoaderRequest, ModelDumperProvider, ModelLoaderProvider, NewTypeUnwrappingProvider, NoneProvider,
    StrProvider, TimeProvider, TupleProvider, TypeVarProvider, UnionProvider,
};
use crate::name_layout::BuiltinNameLayoutProvider;
use crate::provider::{Mediator, ProvideResult, Provider, Recipe, Request};
use crate::shape::ShapeProvider;
use crate::types::{ClassKind, ClassRef, Namespace, Prim, TypeExpr};
use crate::value::Value;
use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

/// Providers every retort ends its recipe with
pub fn builtin_recipe() -> Recipe {
    let mut recipe: Recipe = Vec::new();
    for introspector in builtin_introspectors() {
        recipe.push(Arc::new(ShapeProvider::new(introspector)));
    }
    recipe.extend([
        Arc::new(AnyProvider) as Arc<dyn Provider>,
        Arc::new(NoneProvider),
        Arc::new(BoolProvider),
        Arc::new(IntProvider),
        Arc::new(FloatProvider),
        Arc::new(StrProvider),
        Arc::new(BytesBase64Provider),
        Arc::new(DatetimeIsoProvider),
        Arc::new(DateProvider),
        Arc::new(TimeProvider),
        Arc::new(LiteralProvider),
        Arc::new(UnionProvider),
        Arc::new(EnumExactValueProvider),
        Arc::new(TupleProvider),
        Arc::new(IterableProvider),
        Arc::new(DictProvider),
        Arc::new(BuiltinNameLayoutProvider),
        Arc::new(ModelLoaderProvider),
        Arc::new(ModelDumperProvider),
        Arc::new(NewTypeUnwrappingProvider),
        Arc::new(TypeVarProvider),
    ]);
    recipe.extend([
        Arc::new(BuiltinConverterProvider) as Arc<dyn Provider>,
        Arc::new(DefaultLinkingProvider),
        Arc::new(ModelCoercerProvider),
        Arc::new(IterableCoercerProvider),
        Arc::new(DictCoercerProvider),
        Arc::new(OptionalCoercerProvider),
        Arc::new(TypeTagsUnwrappingProvider),
        Arc::new(SameTypeCoercerProvider),
        Arc::new(DstAnyCoercerProvider),
        Arc::new(UnionSubcaseCoercerProvider),
        Arc::new(SubclassCoercerProvider),
        Arc::new(UnlinkedOptionalPolicyProvider::new(false)),
    ]);
    recipe
}

struct Cache<K, V>(Mutex<HashMap<K, V>>);

impl<K: Hash + Eq, V: Clone> Cache<K, V> {
    fn new() -> Self {
        Cache(Mutex::new(HashMap::new()))
    }

    fn get_or_try_insert(&self, key: K, make: impl FnOnce() -> Result<V>) -> Result<V> {
        if let Some(hit) = self.lock().get(&key) {
            return Ok(hit.clone());
        }
        // built outside the lock, a recursive build may come back here
        let value = make()?;
        self.lock().entry(key).or_insert(value.clone());
        Ok(value)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<K, V>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A configured engine
pub struct Retort {
    user_recipe: Recipe,
    recipe: Recipe,
    namespace: Namespace,
    config: RetortConfig,
    loaders: Cache<TypeExpr, Loader>,
    dumpers: Cache<TypeExpr, Dumper>,
    converters: Cache<(TypeExpr, TypeExpr), Converter>,
}

impl Default for Retort {
    fn default() -> Self {
        Self::new()
    }
}

impl Retort {
    pub fn new() -> Self {
        Self::build(Recipe::new(), Namespace::new(), RetortConfig::default())
    }

    /// A retort whose own providers take precedence over the built-in ones
    pub fn with_recipe(recipe: impl IntoIterator<Item = Arc<dyn Provider>>) -> Self {
        Self::build(recipe.into_iter().collect(), Namespace::new(), RetortConfig::default())
    }

    fn build(user_recipe: Recipe, namespace: Namespace, config: RetortConfig) -> Self {
        let mut recipe = user_recipe.clone();
        recipe.extend(builtin_recipe());
        Retort {
            user_recipe,
            recipe,
            namespace,
            config,
            loaders: Cache::new(),
            dumpers: Cache::new(),
            converters: Cache::new(),
        }
    }

    pub fn config(&self) -> &RetortConfig {
        &self.config
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Same retort with other settings
    pub fn replace(&self, config: RetortConfig) -> Self {
        Self::build(self.user_recipe.clone(), self.namespace.clone(), config)
    }

    pub fn strict_coercion(&self, strict: bool) -> Self {
        self.replace(self.config.strict_coercion(strict))
    }

    pub fn debug_trail(&self, debug_trail: DebugTrail) -> Self {
        self.replace(self.config.debug_trail(debug_trail))
    }

    /// Same retort with `recipe` placed ahead of the current user recipe
    pub fn extend(&self, recipe: impl IntoIterator<Item = Arc<dyn Provider>>) -> Self {
        let mut user_recipe: Recipe = recipe.into_iter().collect();
        user_recipe.extend(self.user_recipe.iter().cloned());
        Self::build(user_recipe, self.namespace.clone(), self.config)
    }

    /// Same retort resolving named type references through `namespace`
    pub fn with_namespace(&self, namespace: Namespace) -> Self {
        Self::build(self.user_recipe.clone(), namespace, self.config)
    }

    fn facade_provide<R: Request>(&self, recipe: &[Arc<dyn Provider>], request: &R) -> Result<R::Response> {
        let description = request.describe();
        let span = tracing::debug_span!("provide", request = %description);
        let _enter = span.enter();
        let mediator = Mediator::new(recipe, &self.namespace);
        mediator.provide(request).map_err(|err| {
            log::debug!("cannot produce {}", description);
            err.into_error(description)
        })
    }

    pub fn get_loader(&self, ty: impl Into<TypeExpr>) -> Result<Loader> {
        let ty = ty.into();
        self.loaders.get_or_try_insert(ty.clone(), || {
            let request = LoaderRequest::new(LocStack::from_type(ty), self.config.strict_coercion, self.config.debug_trail);
            self.facade_provide(&self.recipe, &request)
        })
    }

    pub fn get_dumper(&self, ty: impl Into<TypeExpr>) -> Result<Dumper> {
        let ty = ty.into();
        self.dumpers.get_or_try_insert(ty.clone(), || {
            let request = DumperRequest::new(LocStack::from_type(ty), self.config.debug_trail);
            self.facade_provide(&self.recipe, &request)
        })
    }

    pub fn get_converter(&self, src: impl Into<TypeExpr>, dst: impl Into<TypeExpr>) -> Result<Converter> {
        let (src, dst) = (src.into(), dst.into());
        self.converters.get_or_try_insert((src.clone(), dst.clone()), || {
            self.facade_provide(&self.recipe, &ConverterRequest::new(src, dst))
        })
    }

    /// Build a converter, `local` providers going ahead of the retort recipe
    pub fn produce_converter(&self, request: &ConverterRequest, local: &[Arc<dyn Provider>]) -> Result<Converter> {
        if local.is_empty() {
            return self.facade_provide(&self.recipe, request);
        }
        let recipe: Recipe = local.iter().chain(self.recipe.iter()).cloned().collect();
        self.facade_provide(&recipe, request)
    }

    pub fn load(&self, data: &Value, ty: impl Into<TypeExpr>) -> Result<Value> {
        Ok(self.get_loader(ty)?.call(data)?)
    }

    pub fn dump(&self, value: &Value, ty: impl Into<TypeExpr>) -> Result<Value> {
        Ok(self.get_dumper(ty)?.call(value)?)
    }

    /// Dump with the type taken from the value itself
    pub fn dump_inferred(&self, value: &Value) -> Result<Value> {
        self.dump(value, infer_type(value)?)
    }

    pub fn convert(&self, src: &Value, src_ty: impl Into<TypeExpr>, dst_ty: impl Into<TypeExpr>) -> Result<Value> {
        Ok(self.get_converter(src_ty, dst_ty)?.convert(src)?)
    }

    pub fn load_json(&self, json: &str, ty: impl Into<TypeExpr>) -> Result<Value> {
        let data: serde_json::Value = serde_json::from_str(json)?;
        self.load(&Value::from_json(&data), ty)
    }

    pub fn dump_json(&self, value: &Value, ty: impl Into<TypeExpr>) -> Result<String> {
        let dumped = self.dump(value, ty)?;
        Ok(serde_json::to_string(&dumped.to_json()?)?)
    }
}

fn infer_type(value: &Value) -> Result<TypeExpr> {
    let class_type = |class: &ClassRef| {
        if class.is_generic() {
            Err(Error::GenericInference {
                value_type: class.name().to_string(),
            })
        } else {
            Ok(TypeExpr::from(class))
        }
    };
    match value {
        Value::None => Ok(TypeExpr::None),
        Value::Bool(_) => Ok(TypeExpr::Prim(Prim::Bool)),
        Value::Int(_) => Ok(TypeExpr::Prim(Prim::Int)),
        Value::Float(_) => Ok(TypeExpr::Prim(Prim::Float)),
        Value::Str(_) => Ok(TypeExpr::Prim(Prim::Str)),
        Value::Bytes(_) => Ok(TypeExpr::Prim(Prim::Bytes)),
        Value::DateTime(_) | Value::NaiveDateTime(_) => Ok(TypeExpr::Prim(Prim::DateTime)),
        Value::Date(_) => Ok(TypeExpr::Prim(Prim::Date)),
        Value::Time(_) => Ok(TypeExpr::Prim(Prim::Time)),
        Value::Enum(member) => class_type(&member.class),
        Value::Instance(instance) => match instance.class().kind() {
            ClassKind::Opaque => Err(Error::GenericInference {
                value_type: instance.class().name().to_string(),
            }),
            _ => class_type(instance.class()),
        },
        Value::List(_) | Value::Tuple(_) | Value::Set(_) | Value::Dict(_) => Err(Error::GenericInference {
            value_type: value.type_name(),
        }),
    }
}

impl fmt::Debug for Retort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retort")
            .field("user_recipe", &self.user_recipe.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A retort placed in another recipe answers with its own recipe and namespace
impl Provider for Retort {
    fn provide_loader(&self, _mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        Mediator::new(&self.recipe, &self.namespace).provide(request)
    }

    fn provide_dumper(&self, _mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        Mediator::new(&self.recipe, &self.namespace).provide(request)
    }

    fn provide_coercer(&self, _mediator: &Mediator<'_>, request: &CoercerRequest) -> ProvideResult<Coercer> {
        Mediator::new(&self.recipe, &self.namespace).provide(request)
    }
}
