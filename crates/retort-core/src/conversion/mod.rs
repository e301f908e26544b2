//! Model-to-model conversion
//!
//! A converter maps a value of one type into another by pairing the
//! destination's input shape with the source's output shape. Each
//! destination field is fed by a *linking* (a source field, a converter
//! parameter, a constant or a function) and every linked value goes
//! through a *coercer* picked for the pair of field types.
//!
//! - [`request`] - coercer, linking, policy and converter requests
//! - [`callable`] - [`Coercer`] and [`Converter`]
//! - [`coercer`] - built-in coercers for scalars, containers and unions
//! - [`linking`] - default and user linkings
//! - [`model_coercer`] - coercion between models
//! - [`converter`] - converter producer and [`ConverterBuilder`]
//! - [`facade`] - user providers (`coercer`, `link`, `link_constant`, ...)
//!
//! Copyright (c) 2025 Retort Team
//! Licensed under the Apache-2.0 license

pub mod callable;
pub mod coercer;
pub mod converter;
pub mod error;
pub mod facade;
pub mod linking;
pub mod model_coercer;
pub mod request;

pub use callable::{Coercer, Converter};
pub use coercer::{
    DictCoercerProvider, DstAnyCoercerProvider, IterableCoercerProvider, MatchingCoercerProvider,
    OptionalCoercerProvider, SameTypeCoercerProvider, SubclassCoercerProvider, TypeTagsUnwrappingProvider,
    UnionSubcaseCoercerProvider,
};
pub use converter::{BuiltinConverterProvider, ConverterBuilder};
pub use error::{ConversionError, ConversionErrorKind};
pub use facade::{
    allow_unlinked_optional, bind, coercer, forbid_unlinked_optional, from_param, link, link_constant,
    link_constant_factory, link_function,
};
pub use linking::{
    ConstantLinkingProvider, DefaultLinkingProvider, FunctionLinkingProvider, LinkFunction, MatchingLinkingProvider,
    UnlinkedOptionalPolicyProvider,
};
pub use model_coercer::{BroachingPlan, ModelCoercerProvider, PlanArg};
pub use request::{
    CoercerRequest, ConversionContext, ConverterRequest, LinkingRequest, LinkingResult, ParamSpec,
    UnlinkedOptionalPolicy, UnlinkedOptionalPolicyRequest,
};
