//! User-level morphing providers
//!
//! Functions here return ready-to-use recipe entries. Each entry applies
//! only to requests whose location matches its predicate.

use crate::morphing::{
    DatetimeFormatProvider, DatetimeTimestampProvider, Dumper, DumperRequest, EnumExactValueProvider,
    EnumNameProvider, EnumValueProvider, DumpError, LoadError, LoadErrorKind, Loader, LoaderRequest,
};
use crate::name_layout::NameStyle;
use crate::predicate::LocStackChecker;
use crate::provider::{BoundProvider, Chain, Mediator, ProvideError, ProvideResult, Provider};
use crate::location::LocStack;
use crate::types::TypeExpr;
use crate::value::Value;
use chrono::FixedOffset;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum UserFunc {
    Loader(Loader),
    Dumper(Dumper),
}

/// A user loader or dumper, optionally chained with the one the rest of
/// the recipe would produce
#[derive(Debug, Clone)]
pub struct FuncProvider {
    checker: LocStackChecker,
    func: UserFunc,
    chain: Option<Chain>,
}

impl FuncProvider {
    pub fn loader(checker: impl Into<LocStackChecker>, loader: Loader, chain: Option<Chain>) -> Self {
        FuncProvider {
            checker: checker.into(),
            func: UserFunc::Loader(loader),
            chain,
        }
    }

    pub fn dumper(checker: impl Into<LocStackChecker>, dumper: Dumper, chain: Option<Chain>) -> Self {
        FuncProvider {
            checker: checker.into(),
            func: UserFunc::Dumper(dumper),
            chain,
        }
    }
}

fn applies(mediator: &Mediator<'_>, checker: &LocStackChecker, loc_stack: &LocStack) -> ProvideResult<()> {
    if mediator.check(checker, loc_stack)? {
        Ok(())
    } else {
        Err(ProvideError::skip())
    }
}

impl Provider for FuncProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        let UserFunc::Loader(func) = &self.func else {
            return Err(ProvideError::skip());
        };
        applies(mediator, &self.checker, &request.loc_stack)?;
        match self.chain {
            None => Ok(func.clone()),
            Some(Chain::First) => Ok(func.then(mediator.provide_from_next(request)?)),
            Some(Chain::Last) => Ok(mediator.provide_from_next(request)?.then(func.clone())),
        }
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        let UserFunc::Dumper(func) = &self.func else {
            return Err(ProvideError::skip());
        };
        applies(mediator, &self.checker, &request.loc_stack)?;
        match self.chain {
            None => Ok(func.clone()),
            Some(Chain::First) => Ok(func.then(mediator.provide_from_next(request)?)),
            Some(Chain::Last) => Ok(mediator.provide_from_next(request)?.then(func.clone())),
        }
    }
}

type ValidatorFn = dyn Fn(&Value) -> bool + Send + Sync;

/// Checks the result of the loader the rest of the recipe produces
#[derive(Clone)]
pub struct ValidatorProvider {
    checker: LocStackChecker,
    func: Arc<ValidatorFn>,
    message: String,
}

impl ValidatorProvider {
    pub fn new(
        checker: impl Into<LocStackChecker>,
        func: impl Fn(&Value) -> bool + Send + Sync + 'static,
        message: impl Into<String>,
    ) -> Self {
        ValidatorProvider {
            checker: checker.into(),
            func: Arc::new(func),
            message: message.into(),
        }
    }
}

impl fmt::Debug for ValidatorProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorProvider")
            .field("checker", &self.checker)
            .field("message", &self.message)
            .finish()
    }
}

impl Provider for ValidatorProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        applies(mediator, &self.checker, &request.loc_stack)?;
        let next = mediator.provide_from_next(request)?;
        let func = self.func.clone();
        let message = self.message.clone();
        Ok(Loader::new(move |data| {
            let value = next.call(data)?;
            if func(&value) {
                Ok(value)
            } else {
                Err(LoadError::new(LoadErrorKind::Validation {
                    message: message.clone(),
                    input_value: data.clone(),
                }))
            }
        }))
    }
}

/// Load matching locations with `func`
pub fn loader(
    pred: impl Into<LocStackChecker>,
    func: impl Fn(&Value) -> Result<Value, LoadError> + Send + Sync + 'static,
    chain: Option<Chain>,
) -> Arc<dyn Provider> {
    Arc::new(FuncProvider::loader(pred, Loader::new(func), chain))
}

/// Dump matching locations with `func`
pub fn dumper(
    pred: impl Into<LocStackChecker>,
    func: impl Fn(&Value) -> Result<Value, DumpError> + Send + Sync + 'static,
    chain: Option<Chain>,
) -> Arc<dyn Provider> {
    Arc::new(FuncProvider::dumper(pred, Dumper::new(func), chain))
}

pub fn as_is_loader(pred: impl Into<LocStackChecker>) -> Arc<dyn Provider> {
    Arc::new(FuncProvider::loader(pred, Loader::as_is(), None))
}

pub fn as_is_dumper(pred: impl Into<LocStackChecker>) -> Arc<dyn Provider> {
    Arc::new(FuncProvider::dumper(pred, Dumper::as_is(), None))
}

/// Reject loaded values for which `func` returns `false`
pub fn validator(
    pred: impl Into<LocStackChecker>,
    func: impl Fn(&Value) -> bool + Send + Sync + 'static,
    message: impl Into<String>,
) -> Arc<dyn Provider> {
    Arc::new(ValidatorProvider::new(pred, func, message))
}

/// Represent enum members by their names, renamed by `name_style` and
/// explicit `renames`
pub fn enum_by_name<K, V>(
    pred: impl Into<LocStackChecker>,
    name_style: Option<NameStyle>,
    renames: impl IntoIterator<Item = (K, V)>,
) -> Arc<dyn Provider>
where
    K: Into<String>,
    V: Into<String>,
{
    let mut provider = EnumNameProvider::new();
    if let Some(style) = name_style {
        provider = provider.name_style(style);
    }
    for (member, wire_name) in renames {
        provider = provider.rename(member, wire_name);
    }
    Arc::new(BoundProvider::new(pred, Arc::new(provider)))
}

/// Represent enum members by their values morphed as `value_type`
pub fn enum_by_value(pred: impl Into<LocStackChecker>, value_type: TypeExpr) -> Arc<dyn Provider> {
    Arc::new(BoundProvider::new(pred, Arc::new(EnumValueProvider::new(value_type))))
}

pub fn enum_by_exact_value(pred: impl Into<LocStackChecker>) -> Arc<dyn Provider> {
    Arc::new(BoundProvider::new(pred, Arc::new(EnumExactValueProvider)))
}

pub fn datetime_by_format(pred: impl Into<LocStackChecker>, format: impl Into<String>) -> Arc<dyn Provider> {
    Arc::new(BoundProvider::new(pred, Arc::new(DatetimeFormatProvider::new(format))))
}

pub fn datetime_by_timestamp(pred: impl Into<LocStackChecker>, tz: FixedOffset) -> Arc<dyn Provider> {
    Arc::new(BoundProvider::new(pred, Arc::new(DatetimeTimestampProvider::new(tz))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::LocStack;
    use crate::morphing::{DebugTrail, IntProvider, StrProvider};
    use crate::provider::Recipe;
    use crate::types::{ClassDef, Namespace, Prim};

    fn build_loader(recipe: &Recipe, ty: TypeExpr) -> ProvideResult<Loader> {
        let ns = Namespace::new();
        Mediator::new(recipe, &ns).provide(&LoaderRequest::new(LocStack::from_type(ty), true, DebugTrail::All))
    }

    fn build_dumper(recipe: &Recipe, ty: TypeExpr) -> ProvideResult<Dumper> {
        let ns = Namespace::new();
        Mediator::new(recipe, &ns).provide(&DumperRequest::new(LocStack::from_type(ty), DebugTrail::All))
    }

    fn double(value: &Value) -> Result<Value, LoadError> {
        match value {
            Value::Int(i) => Ok(Value::Int(i * 2)),
            other => Err(LoadError::type_error("int", other)),
        }
    }

    #[test]
    fn test_user_loader_replaces_default() {
        let recipe: Recipe = vec![loader(Prim::Int, double, None), Arc::new(IntProvider)];
        let loader = build_loader(&recipe, TypeExpr::int()).unwrap();
        assert_eq!(loader.call(&Value::Int(21)).unwrap(), Value::Int(42));
    }

    #[test]
    fn test_chain_order() {
        let parse = |value: &Value| match value {
            Value::Str(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| LoadError::value_error("not a number", value)),
            other => Ok(other.clone()),
        };
        let first: Recipe = vec![loader(Prim::Int, parse, Some(Chain::First)), Arc::new(IntProvider)];
        let loader_first = build_loader(&first, TypeExpr::int()).unwrap();
        assert_eq!(loader_first.call(&Value::str(" 5 ")).unwrap(), Value::Int(5));

        let last: Recipe = vec![loader(Prim::Int, double, Some(Chain::Last)), Arc::new(IntProvider)];
        let loader_last = build_loader(&last, TypeExpr::int()).unwrap();
        assert_eq!(loader_last.call(&Value::Int(3)).unwrap(), Value::Int(6));
        assert!(matches!(
            loader_last.call(&Value::str("3")).unwrap_err().kind,
            LoadErrorKind::Type { .. }
        ));
    }

    #[test]
    fn test_predicate_mismatch_falls_through() {
        let recipe: Recipe = vec![loader(Prim::Str, |_| Ok(Value::None), None), Arc::new(IntProvider)];
        let loader = build_loader(&recipe, TypeExpr::int()).unwrap();
        assert_eq!(loader.call(&Value::Int(1)).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_dumper_chain_first() {
        let upper = |value: &Value| match value {
            Value::Str(s) => Ok(Value::Str(s.to_uppercase())),
            other => Err(DumpError::type_error("str", other.type_name())),
        };
        let recipe: Recipe = vec![dumper(Prim::Str, upper, Some(Chain::First)), Arc::new(StrProvider)];
        let dumper = build_dumper(&recipe, TypeExpr::str()).unwrap();
        assert_eq!(dumper.call(&Value::str("abc")).unwrap(), Value::str("ABC"));
    }

    #[test]
    fn test_validator() {
        let recipe: Recipe = vec![
            validator(Prim::Int, |v| matches!(v, Value::Int(i) if *i >= 0), "must be non-negative"),
            Arc::new(IntProvider),
        ];
        let loader = build_loader(&recipe, TypeExpr::int()).unwrap();
        assert_eq!(loader.call(&Value::Int(3)).unwrap(), Value::Int(3));
        let err = loader.call(&Value::Int(-1)).unwrap_err();
        assert!(matches!(
            err.kind,
            LoadErrorKind::Validation { ref message, ref input_value }
                if message == "must be non-negative" && input_value == &Value::Int(-1)
        ));
        assert!(matches!(
            loader.call(&Value::str("x")).unwrap_err().kind,
            LoadErrorKind::Type { .. }
        ));
    }

    #[test]
    fn test_as_is() {
        let recipe: Recipe = vec![as_is_loader(Prim::Int), as_is_dumper(Prim::Int)];
        let loader = build_loader(&recipe, TypeExpr::int()).unwrap();
        assert_eq!(loader.call(&Value::str("raw")).unwrap(), Value::str("raw"));
        let dumper = build_dumper(&recipe, TypeExpr::int()).unwrap();
        assert_eq!(dumper.call(&Value::Int(1)).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_enum_by_name_is_bound() {
        let status = ClassDef::enumeration("Status").member("DONE", 2).build();
        let other = ClassDef::enumeration("Other").member("DONE", 2).build();
        let recipe: Recipe = vec![
            enum_by_name(&status, Some(NameStyle::Lower), Vec::<(String, String)>::new()),
            enum_by_exact_value(LocStackChecker::Any),
        ];
        let status_loader = build_loader(&recipe, TypeExpr::from(&status)).unwrap();
        assert_eq!(status_loader.call(&Value::str("done")).unwrap(), status.member("DONE").unwrap());
        let other_loader = build_loader(&recipe, TypeExpr::from(&other)).unwrap();
        assert_eq!(other_loader.call(&Value::Int(2)).unwrap(), other.member("DONE").unwrap());
    }
}
