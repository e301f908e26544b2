//! Request bus
//!
//! The [`Mediator`] routes typed requests through the ordered recipe. It owns
//! the state of one build: the call cache, the stack of recipe positions used
//! by [`Mediator::provide_from_next`], the pending recursion stubs and the
//! memoised predicate and normalisation results. A build is single-threaded;
//! the callables it produces are `Send + Sync`.
//!
//! Copyright (c) 2025 Retort Team
//! Licensed under the Apache-2.0 license

use crate::location::LocStack;
use crate::predicate::LocStackChecker;
use crate::provider::error::{CannotProvide, ProvideError, ProvideResult};
use crate::provider::recursion::StubRegistry;
use crate::provider::request::Request;
use crate::provider::Provider;
use crate::types::{normalize_type, Namespace, NormType, TypeExpr};
use crate::Result;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub struct Mediator<'r> {
    recipe: &'r [Arc<dyn Provider>],
    namespace: &'r Namespace,
    cache: RefCell<HashMap<TypeId, Box<dyn Any>>>,
    normalized: RefCell<HashMap<TypeExpr, NormType>>,
    checks: RefCell<HashMap<(LocStackChecker, LocStack), bool>>,
    positions: RefCell<Vec<usize>>,
    stubs: StubRegistry,
}

impl<'r> Mediator<'r> {
    pub fn new(recipe: &'r [Arc<dyn Provider>], namespace: &'r Namespace) -> Self {
        Mediator {
            recipe,
            namespace,
            cache: RefCell::new(HashMap::new()),
            normalized: RefCell::new(HashMap::new()),
            checks: RefCell::new(HashMap::new()),
            positions: RefCell::new(Vec::new()),
            stubs: StubRegistry::default(),
        }
    }

    pub fn namespace(&self) -> &Namespace {
        self.namespace
    }

    /// Answer a request from the start of the recipe
    pub fn provide<R: Request>(&self, request: &R) -> ProvideResult<R::Response> {
        if let Some(hit) = self.cached(request) {
            return Ok(hit);
        }

        if request.loc_stack().is_some_and(LocStack::is_recursive) {
            if let Some(stub) = request.recursion_stub(&self.stubs) {
                log::trace!("recursion detected, returning stub for {}", request.describe());
                return Ok(stub);
            }
        }

        let result = self.search(request, 0);
        match &result {
            Ok(response) => {
                request.resolve_stub(&self.stubs, Some(response));
                self.store(request, response.clone());
            }
            Err(_) => request.resolve_stub(&self.stubs, None),
        }
        result
    }

    /// Continue the current request at the provider after the one handling it
    pub fn provide_from_next<R: Request>(&self, request: &R) -> ProvideResult<R::Response> {
        let start = self.positions.borrow().last().map_or(0, |position| position + 1);
        self.search(request, start)
    }

    /// Answer a derived request (e.g. the same location with an unwrapped type)
    pub fn delegating_provide<R: Request>(&self, request: &R) -> ProvideResult<R::Response> {
        log::trace!("delegating to {}", request.describe());
        self.provide(request)
    }

    /// Answer a request whose failure makes the caller fail too.
    ///
    /// A "not applicable" outcome is wrapped into a terminal error described
    /// by `describe`, so the search for the caller's request stops here.
    pub fn mandatory_provide<R: Request>(
        &self,
        request: &R,
        describe: impl FnOnce(&CannotProvide) -> String,
    ) -> ProvideResult<R::Response> {
        self.provide(request).map_err(|err| match err {
            ProvideError::CannotProvide(cause) => {
                let message = describe(&cause);
                ProvideError::CannotProvide(
                    CannotProvide::aggregate(message, vec![name_failure(request, cause)]).make_terminal(),
                )
            }
            fatal => fatal,
        })
    }

    /// Answer every request, collecting all "not applicable" outcomes into a
    /// single terminal error
    pub fn mandatory_provide_all<R: Request>(
        &self,
        requests: impl IntoIterator<Item = R>,
        describe: impl FnOnce() -> String,
    ) -> ProvideResult<Vec<R::Response>> {
        let mut responses = Vec::new();
        let mut failures = Vec::new();
        for request in requests {
            match self.provide(&request) {
                Ok(response) => responses.push(response),
                Err(ProvideError::CannotProvide(cause)) => failures.push(name_failure(&request, cause)),
                Err(fatal) => return Err(fatal),
            }
        }
        if failures.is_empty() {
            Ok(responses)
        } else {
            Err(CannotProvide::aggregate(describe(), failures).make_terminal().into())
        }
    }

    /// Normalise a type, memoised for the build
    pub fn normalize(&self, ty: &TypeExpr) -> Result<NormType> {
        if let Some(norm) = self.normalized.borrow().get(ty) {
            return Ok(norm.clone());
        }
        let norm = normalize_type(ty, self.namespace)?;
        self.normalized.borrow_mut().insert(ty.clone(), norm.clone());
        Ok(norm)
    }

    /// Evaluate a predicate against a location stack, memoised for the build
    pub fn check(&self, checker: &LocStackChecker, loc_stack: &LocStack) -> Result<bool> {
        let key = (checker.clone(), loc_stack.clone());
        if let Some(hit) = self.checks.borrow().get(&key) {
            return Ok(*hit);
        }
        let result = checker.evaluate(self, loc_stack)?;
        self.checks.borrow_mut().insert(key, result);
        Ok(result)
    }

    fn search<R: Request>(&self, request: &R, start: usize) -> ProvideResult<R::Response> {
        let mut causes = Vec::new();
        for (offset, provider) in self.recipe.iter().enumerate().skip(start) {
            self.positions.borrow_mut().push(offset);
            let result = request.dispatch(provider.as_ref(), self);
            self.positions.borrow_mut().pop();
            match result {
                Ok(response) => {
                    if log::log_enabled!(log::Level::Debug) {
                        log::debug!("{} provided by {:?}", request.describe(), provider);
                    }
                    return Ok(response);
                }
                Err(ProvideError::CannotProvide(cause)) => {
                    let is_terminal = cause.is_terminal;
                    if cause.is_demonstrative {
                        causes.push(cause);
                    }
                    if is_terminal {
                        break;
                    }
                }
                Err(fatal) => return Err(fatal),
            }
        }

        let mut failure = CannotProvide::aggregate("", causes);
        if let Some(loc_stack) = request.loc_stack() {
            failure = failure.with_note(format!("Location: {}", loc_stack));
        }
        Err(failure.into())
    }

    fn cached<R: Request>(&self, request: &R) -> Option<R::Response> {
        let cache = self.cache.borrow();
        cache
            .get(&TypeId::of::<R>())?
            .downcast_ref::<HashMap<R, R::Response>>()?
            .get(request)
            .cloned()
    }

    fn store<R: Request>(&self, request: &R, response: R::Response) {
        let mut cache = self.cache.borrow_mut();
        let entry = cache
            .entry(TypeId::of::<R>())
            .or_insert_with(|| Box::new(HashMap::<R, R::Response>::new()));
        if let Some(map) = entry.downcast_mut::<HashMap<R, R::Response>>() {
            map.insert(request.clone(), response);
        }
    }
}

fn name_failure<R: Request>(request: &R, mut cause: CannotProvide) -> CannotProvide {
    if cause.message.is_empty() {
        cause.message = format!("Cannot find {}", request.describe());
    }
    cause.is_demonstrative = true;
    cause
}

impl fmt::Debug for Mediator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mediator")
            .field("recipe_len", &self.recipe.len())
            .field("depth", &self.positions.borrow().len())
            .field("stubs", &self.stubs)
            .finish()
    }
}
