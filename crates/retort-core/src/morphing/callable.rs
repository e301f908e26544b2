//! Produced callables
//!
//! Loaders and dumpers are reference-counted closures over [`Value`]. They
//! are cheap to clone, `Send + Sync`, and compare by identity.

use crate::morphing::{DumpError, LoadError};
use crate::provider::{Recursive, StubFailure, StubSlot};
use crate::value::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

type FuncBody<E> = dyn Fn(&Value) -> Result<Value, E> + Send + Sync;

/// A unary function over values failing with `E`
pub struct Func<E: 'static>(Arc<FuncBody<E>>);

/// Turns wire data into a model value
pub type Loader = Func<LoadError>;

/// Turns a model value into wire data
pub type Dumper = Func<DumpError>;

impl<E: 'static> Func<E> {
    pub fn new(f: impl Fn(&Value) -> Result<Value, E> + Send + Sync + 'static) -> Self {
        Func(Arc::new(f))
    }

    /// Returns the input unchanged
    pub fn as_is() -> Self {
        Func::new(|value| Ok(value.clone()))
    }

    pub fn call(&self, value: &Value) -> Result<Value, E> {
        (self.0)(value)
    }

    /// Feed the output of `self` into `next`
    pub fn then(&self, next: Func<E>) -> Self {
        let first = self.clone();
        Func::new(move |value| next.call(&first.call(value)?))
    }
}

impl<E: 'static> Clone for Func<E> {
    fn clone(&self) -> Self {
        Func(self.0.clone())
    }
}

impl<E: 'static> PartialEq for Func<E> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<E: 'static> Eq for Func<E> {}

impl<E: 'static> Hash for Func<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const () as usize).hash(state);
    }
}

impl<E: 'static> fmt::Debug for Func<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Func({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

impl<E> Recursive for Func<E>
where
    E: From<StubFailure> + 'static,
{
    type Weak = Weak<FuncBody<E>>;

    fn downgrade(&self) -> Self::Weak {
        Arc::downgrade(&self.0)
    }

    fn upgrade(weak: &Self::Weak) -> Option<Self> {
        weak.upgrade().map(Func)
    }

    fn from_slot(slot: Arc<StubSlot<Self>>) -> Self {
        Func::new(move |value| slot.get()?.call(value))
    }
}
