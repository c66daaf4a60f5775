//! Dynamic-side references to native objects.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::{ObjectHandle, ObjectRef, Ownership, TypeHash};

/// Receiver of the loss-of-reference signal for owning proxies.
pub trait Finalizer {
    /// Called once, when the last clone of a live owning proxy is dropped.
    fn finalize(&self, object: &ObjectRef);
}

struct ProxyInner {
    object: ObjectRef,
    ownership: Ownership,
    class_name: String,
    released: Cell<bool>,
    finalizer: Option<Weak<dyn Finalizer>>,
}

impl Drop for ProxyInner {
    fn drop(&mut self) {
        if self.released.get() || self.ownership == Ownership::Borrowed {
            return;
        }
        if let Some(finalizer) = self.finalizer.as_ref().and_then(Weak::upgrade) {
            finalizer.finalize(&self.object);
        }
    }
}

/// A dynamic-side object exposing a native object.
///
/// Clones are the same dynamic object. Identity is [`Proxy::ptr_eq`].
#[derive(Clone)]
pub struct Proxy {
    inner: Rc<ProxyInner>,
}

impl Proxy {
    pub fn new(
        object: ObjectRef,
        ownership: Ownership,
        class_name: impl Into<String>,
        finalizer: Option<Weak<dyn Finalizer>>,
    ) -> Self {
        Self {
            inner: Rc::new(ProxyInner {
                object,
                ownership,
                class_name: class_name.into(),
                released: Cell::new(false),
                finalizer,
            }),
        }
    }

    /// The native pointer this proxy exposes.
    pub fn object(&self) -> &ObjectRef {
        &self.inner.object
    }

    pub fn handle(&self) -> ObjectHandle {
        self.inner.object.handle
    }

    /// The class this proxy presents itself as.
    pub fn view_type(&self) -> TypeHash {
        self.inner.object.view
    }

    pub fn class_name(&self) -> &str {
        &self.inner.class_name
    }

    pub fn ownership(&self) -> Ownership {
        self.inner.ownership
    }

    pub fn is_const(&self) -> bool {
        self.inner.object.is_const
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.get()
    }

    /// Flip to released. Returns `false` if it already was.
    pub fn mark_released(&self) -> bool {
        !self.inner.released.replace(true)
    }

    pub fn ptr_eq(&self, other: &Proxy) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.inner.class_name)?;
        if self.is_const() {
            write!(f, " const")?;
        }
        if self.is_released() {
            write!(f, " released")?;
        }
        write!(f, " #{}]", self.inner.object.handle.index)
    }
}
