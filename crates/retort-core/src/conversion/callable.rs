//! Produced conversion callables

use crate::conversion::{ConversionError, ConversionErrorKind};
use crate::provider::{Recursive, StubSlot};
use crate::value::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

type CoercerBody = dyn Fn(&Value, &[Value]) -> Result<Value, ConversionError> + Send + Sync;

/// Converts a source value into a destination value.
///
/// The second argument holds the extra parameters of the converter being
/// built, in declaration order.
pub struct Coercer(Arc<CoercerBody>);

impl Coercer {
    pub fn new(f: impl Fn(&Value, &[Value]) -> Result<Value, ConversionError> + Send + Sync + 'static) -> Self {
        Coercer(Arc::new(f))
    }

    /// Coercer ignoring the context
    pub fn unary(f: impl Fn(&Value) -> Result<Value, ConversionError> + Send + Sync + 'static) -> Self {
        Coercer::new(move |value, _| f(value))
    }

    pub fn as_is() -> Self {
        Coercer::new(|value, _| Ok(value.clone()))
    }

    pub fn call(&self, value: &Value, ctx: &[Value]) -> Result<Value, ConversionError> {
        (self.0)(value, ctx)
    }
}

impl Clone for Coercer {
    fn clone(&self) -> Self {
        Coercer(self.0.clone())
    }
}

impl PartialEq for Coercer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Coercer {}

impl Hash for Coercer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const () as usize).hash(state);
    }
}

impl fmt::Debug for Coercer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coercer({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

impl Recursive for Coercer {
    type Weak = Weak<CoercerBody>;

    fn downgrade(&self) -> Self::Weak {
        Arc::downgrade(&self.0)
    }

    fn upgrade(weak: &Self::Weak) -> Option<Self> {
        weak.upgrade().map(Coercer)
    }

    fn from_slot(slot: Arc<StubSlot<Self>>) -> Self {
        Coercer::new(move |value, ctx| slot.get()?.call(value, ctx))
    }
}

/// A named source-to-destination function with extra parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Converter {
    name: String,
    params: Vec<String>,
    body: Coercer,
}

impl Converter {
    pub fn new(name: impl Into<String>, params: Vec<String>, body: Coercer) -> Self {
        Converter {
            name: name.into(),
            params,
            body,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the extra parameters
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Convert `src`, passing `extra` as the extra parameters
    pub fn call(&self, src: &Value, extra: &[Value]) -> Result<Value, ConversionError> {
        if extra.len() != self.params.len() {
            return Err(ConversionError::new(ConversionErrorKind::Arity {
                expected: self.params.len(),
                actual: extra.len(),
            }));
        }
        self.body.call(src, extra)
    }

    /// Convert a value when the converter has no extra parameters
    pub fn convert(&self, src: &Value) -> Result<Value, ConversionError> {
        self.call(src, &[])
    }
}
