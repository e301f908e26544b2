//! Loaders and dumpers
//!
//! Everything needed to turn wire data into model values and back: the
//! produced callables, the load/dump error taxonomy with trails, the
//! loader and dumper requests, and the built-in providers for every kind of
//! type the engine understands.
//!
//! - [`callable`] - [`Loader`] and [`Dumper`]
//! - [`request`] - [`LoaderRequest`] and [`DumperRequest`]
//! - [`concrete`] - scalars and date/time values
//! - [`iterable`], [`dict`], [`tuple`] - containers
//! - [`literal`], [`enums`], [`union`] - choices among values
//! - [`generic`] - newtypes and type parameters
//! - [`model`] - loaders and dumpers generated from shapes and crowns
//! - [`facade`] - user providers (`loader`, `dumper`, `validator`, ...)
//!
//! Copyright (c) 2025 Retort Team
//! Licensed under the Apache-2.0 license

pub mod callable;
pub mod concrete;
pub mod dict;
pub mod dump_error;
pub mod enums;
pub mod facade;
pub mod generic;
pub mod iterable;
pub mod literal;
pub mod load_error;
pub mod model;
pub mod request;
pub mod trail;
pub mod tuple;
pub mod union;

pub use callable::{Dumper, Func, Loader};
pub use concrete::{
    AnyProvider, BoolProvider, BytesBase64Provider, DateProvider, DatetimeFormatProvider, DatetimeIsoProvider,
    DatetimeTimestampProvider, FloatProvider, IntProvider, NoneProvider, StrProvider, TimeProvider,
};
pub use dict::DictProvider;
pub use dump_error::{DumpError, DumpErrorKind};
pub use enums::{EnumExactValueProvider, EnumNameProvider, EnumValueProvider};
pub use facade::{
    as_is_dumper, as_is_loader, datetime_by_format, datetime_by_timestamp, dumper, enum_by_exact_value, enum_by_name,
    enum_by_value, loader, validator, FuncProvider, ValidatorProvider,
};
pub use generic::{NewTypeUnwrappingProvider, TypeVarProvider};
pub use iterable::IterableProvider;
pub use literal::LiteralProvider;
pub use load_error::{LoadError, LoadErrorKind};
pub use model::{ModelDumperProvider, ModelLoaderProvider};
pub use request::{DumperRequest, LoaderRequest};
pub use trail::{DebugTrail, Trail, TrailElement};
pub use tuple::TupleProvider;
pub use union::UnionProvider;

use crate::provider::{Mediator, ProvideResult};

/// Loader of the type at `request`'s location with another last type
pub(crate) fn sub_loader(
    mediator: &Mediator<'_>,
    request: &LoaderRequest,
    ty: crate::types::TypeExpr,
) -> ProvideResult<Loader> {
    mediator.mandatory_provide(&request.with_last_type(ty), |_| {
        format!("Cannot create loader for {}", request.loc_stack)
    })
}

pub(crate) fn sub_dumper(
    mediator: &Mediator<'_>,
    request: &DumperRequest,
    ty: crate::types::TypeExpr,
) -> ProvideResult<Dumper> {
    mediator.mandatory_provide(&request.with_last_type(ty), |_| {
        format!("Cannot create dumper for {}", request.loc_stack)
    })
}

/// Run `f` over every item, honouring the debug trail mode.
///
/// `All` gathers every failure into an aggregate described by `message`,
/// `First` stops at the first failure keeping its trail and `Disable`
/// strips the trail.
pub(crate) fn collect_errors<T, E, I>(
    debug_trail: DebugTrail,
    items: I,
    mut f: impl FnMut(I::Item) -> Result<T, E>,
    aggregate: impl FnOnce(Vec<E>) -> E,
    strip: impl Fn(E) -> E,
) -> Result<Vec<T>, E>
where
    I: IntoIterator,
{
    let mut results = Vec::new();
    let mut errors = Vec::new();
    for item in items {
        match f(item) {
            Ok(value) => results.push(value),
            Err(err) => match debug_trail {
                DebugTrail::All => errors.push(err),
                DebugTrail::First => return Err(err),
                DebugTrail::Disable => return Err(strip(err)),
            },
        }
    }
    if errors.is_empty() {
        Ok(results)
    } else {
        Err(aggregate(errors))
    }
}

pub(crate) fn strip_load_trail(mut err: LoadError) -> LoadError {
    err.trail = Trail::new();
    err
}

pub(crate) fn strip_dump_trail(mut err: DumpError) -> DumpError {
    err.trail = Trail::new();
    err
}
