//! Native-side handle to a dynamic-side function.

use std::fmt;
use std::rc::Rc;

use crate::{FromNative, Native, NativeError};

/// Something native code can call back into.
///
/// The runtime implements this for dynamic functions passed to callback
/// parameters; the implementation converts arguments and result according to
/// the callback's declared signature.
pub trait CallbackTarget {
    fn invoke(&self, args: Vec<Native>) -> Result<Native, NativeError>;
}

/// A callable dynamic function, as received by native code.
#[derive(Clone)]
pub struct CallbackHandle {
    target: Rc<dyn CallbackTarget>,
}

impl CallbackHandle {
    pub fn new(target: Rc<dyn CallbackTarget>) -> Self {
        Self { target }
    }

    /// Call with raw native arguments.
    pub fn call(&self, args: Vec<Native>) -> Result<Native, NativeError> {
        self.target.invoke(args)
    }

    /// Call and extract a typed result.
    pub fn call_with<R: FromNative>(&self, args: Vec<Native>) -> Result<R, NativeError> {
        let result = self.call(args)?;
        Ok(R::from_native(&result)?)
    }

    pub fn ptr_eq(&self, other: &CallbackHandle) -> bool {
        Rc::ptr_eq(&self.target, &other.target)
    }
}

impl fmt::Debug for CallbackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallbackHandle")
    }
}
