//! Recursion stubs
//!
//! When a request reappears inside its own build, the mediator hands out a
//! stub instead of recursing forever. Every recursive caller of one location
//! shares the same [`StubSlot`]. The slot is filled with a weak reference to
//! the real callable when the outer request completes, or poisoned when the
//! outer request fails; a poisoned stub fails every call with a
//! recursion-aborted error.

use crate::location::Loc;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Why a stub could not forward a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubFailure {
    /// The outer build failed
    Aborted { request: String },
    /// Called before the outer build finished
    Pending { request: String },
    /// The real callable was dropped
    Dropped { request: String },
}

impl fmt::Display for StubFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StubFailure::Aborted { request } => {
                write!(f, "recursive {} was aborted because the outer build failed", request)
            }
            StubFailure::Pending { request } => {
                write!(f, "recursive {} was called before its build finished", request)
            }
            StubFailure::Dropped { request } => {
                write!(f, "recursive {} outlived the callable that owns it", request)
            }
        }
    }
}

/// Callables that can be replaced by a recursion stub
pub trait Recursive: Clone + Send + Sync + Sized + 'static {
    type Weak: Send + Sync + 'static;

    fn downgrade(&self) -> Self::Weak;

    fn upgrade(weak: &Self::Weak) -> Option<Self>;

    /// Callable forwarding every call to the slot's target
    fn from_slot(slot: Arc<StubSlot<Self>>) -> Self;
}

enum SlotState<W> {
    Filled(W),
    Aborted,
}

/// Shared cell patched once the outer build completes
pub struct StubSlot<T: Recursive> {
    request: String,
    state: OnceLock<SlotState<T::Weak>>,
}

impl<T: Recursive> StubSlot<T> {
    fn new(request: String) -> Self {
        StubSlot {
            request,
            state: OnceLock::new(),
        }
    }

    pub fn get(&self) -> Result<T, StubFailure> {
        match self.state.get() {
            Some(SlotState::Filled(weak)) => T::upgrade(weak).ok_or_else(|| StubFailure::Dropped {
                request: self.request.clone(),
            }),
            Some(SlotState::Aborted) => Err(StubFailure::Aborted {
                request: self.request.clone(),
            }),
            None => Err(StubFailure::Pending {
                request: self.request.clone(),
            }),
        }
    }

    fn fill(&self, target: &T) {
        let _ = self.state.set(SlotState::Filled(target.downgrade()));
    }

    fn abort(&self) {
        let _ = self.state.set(SlotState::Aborted);
    }
}

type StubKey = (TypeId, Loc);

/// Pending stubs of one build
#[derive(Default)]
pub struct StubRegistry {
    slots: RefCell<HashMap<StubKey, Box<dyn Any>>>,
}

impl StubRegistry {
    /// Stub for `loc`, shared by every recursive caller
    pub fn stub<T: Recursive>(&self, loc: &Loc, request: impl FnOnce() -> String) -> T {
        let key = (TypeId::of::<T>(), loc.clone());
        let mut slots = self.slots.borrow_mut();
        if let Some(slot) = slots.get(&key).and_then(|boxed| boxed.downcast_ref::<Arc<StubSlot<T>>>()) {
            return T::from_slot(slot.clone());
        }
        let slot = Arc::new(StubSlot::<T>::new(request()));
        slots.insert(key, Box::new(slot.clone()));
        T::from_slot(slot)
    }

    /// Patch the stub for `loc` (if any) with the finished callable
    pub fn fill<T: Recursive>(&self, loc: &Loc, target: &T) {
        if let Some(slot) = self.take::<T>(loc) {
            log::trace!("filling recursion stub for {}", slot.request);
            slot.fill(target);
        }
    }

    /// Poison the stub for `loc` (if any)
    pub fn abort<T: Recursive>(&self, loc: &Loc) {
        if let Some(slot) = self.take::<T>(loc) {
            log::trace!("aborting recursion stub for {}", slot.request);
            slot.abort();
        }
    }

    fn take<T: Recursive>(&self, loc: &Loc) -> Option<Arc<StubSlot<T>>> {
        let boxed = self.slots.borrow_mut().remove(&(TypeId::of::<T>(), loc.clone()))?;
        boxed.downcast::<Arc<StubSlot<T>>>().ok().map(|slot| *slot)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }
}

impl fmt::Debug for StubRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubRegistry")
            .field("pending", &self.slots.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morphing::{LoadErrorKind, Loader};
    use crate::types::TypeExpr;
    use crate::value::Value;

    #[test]
    fn test_stub_forwards_after_fill() {
        let registry = StubRegistry::default();
        let loc = Loc::type_hint(TypeExpr::int());
        let stub: Loader = registry.stub(&loc, || "loader for type int".to_string());
        let real = Loader::new(|data| Ok(data.clone()));
        registry.fill(&loc, &real);
        assert_eq!(stub.call(&Value::Int(5)).unwrap(), Value::Int(5));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_stubs_share_a_slot() {
        let registry = StubRegistry::default();
        let loc = Loc::type_hint(TypeExpr::int());
        let first: Loader = registry.stub(&loc, || "loader".to_string());
        let second: Loader = registry.stub(&loc, || "loader".to_string());
        let real = Loader::new(|_| Ok(Value::Int(1)));
        registry.fill(&loc, &real);
        assert_eq!(first.call(&Value::None).unwrap(), Value::Int(1));
        assert_eq!(second.call(&Value::None).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_aborted_stub_fails() {
        let registry = StubRegistry::default();
        let loc = Loc::type_hint(TypeExpr::int());
        let stub: Loader = registry.stub(&loc, || "loader for type int".to_string());
        registry.abort::<Loader>(&loc);
        let err = stub.call(&Value::Int(1)).unwrap_err();
        assert!(matches!(err.kind, LoadErrorKind::RecursionAborted { .. }));
    }

    #[test]
    fn test_second_stub_keeps_first_description() {
        let registry = StubRegistry::default();
        let loc = Loc::type_hint(TypeExpr::int());
        let first: Loader = registry.stub(&loc, || "loader for type int".to_string());
        let second: Loader = registry.stub(&loc, || panic!("description is built once per slot"));
        registry.abort::<Loader>(&loc);
        for stub in [first, second] {
            match stub.call(&Value::Int(1)).unwrap_err().kind {
                LoadErrorKind::RecursionAborted { request } => {
                    assert!(request.starts_with("recursive loader for type int was aborted"), "{}", request)
                }
                other => panic!("unexpected error kind: {:?}", other),
            }
        }
    }
}
