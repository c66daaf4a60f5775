//! Native function storage and callable trait.

use std::fmt;
use std::sync::Arc;

use crate::{CallContext, NativeError, TypeHash};

/// Type-erased native target.
///
/// Wraps any callable implementing [`NativeCallable`] so that targets of
/// different signatures are stored uniformly in overload candidates. The
/// callable sits behind an `Arc`, so cloning is cheap and shares it.
pub struct NativeFn {
    /// Identity of the entry point this target implements.
    pub id: TypeHash,
    inner: Arc<dyn NativeCallable + Send + Sync>,
}

impl NativeFn {
    pub fn new<F>(id: TypeHash, f: F) -> Self
    where
        F: NativeCallable + Send + Sync + 'static,
    {
        Self { id, inner: Arc::new(f) }
    }

    /// Call this target with the given context.
    pub fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), NativeError> {
        self.inner.call(ctx)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn").field("id", &self.id).finish_non_exhaustive()
    }
}

impl Clone for NativeFn {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Arc::clone(&self.inner),
        }
    }
}

/// A callable native target.
///
/// Receives a [`CallContext`] holding the converted receiver and arguments,
/// and stores its result there.
pub trait NativeCallable {
    fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), NativeError>;
}

impl<F> NativeCallable for F
where
    F: Fn(&mut CallContext<'_>) -> Result<(), NativeError>,
{
    fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), NativeError> {
        (self)(ctx)
    }
}
