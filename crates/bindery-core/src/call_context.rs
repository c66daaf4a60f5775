//! Call context bridging the dispatcher and native targets.

use std::any::{Any, type_name};
use std::cell::{RefCell, RefMut};
use std::fmt;

use crate::{
    BufferView, CallbackHandle, FromNative, IntoNative, Native, NativeError, ObjectCell, ObjectHeap,
    ObjectRef, TypeHash,
};

/// An object pinned for the duration of a call.
struct Pinned {
    cell: ObjectCell,
    object: ObjectRef,
}

/// Context for one native invocation.
///
/// Holds the converted receiver and arguments and receives the result.
/// Objects referenced by the receiver and by top-level object arguments are
/// pinned when the context is built, so they stay reachable even if a
/// re-entrant call releases them; each is borrowed only when native code asks
/// for it.
///
/// ## Typed Argument Access
///
/// ```ignore
/// let x: i32 = ctx.arg(0)?;
/// let mut me = ctx.this::<Counter>()?;
/// me.value += x;
/// ```
pub struct CallContext<'a> {
    heap: &'a RefCell<ObjectHeap>,
    this: Option<Pinned>,
    args: Vec<Native>,
    pins: Vec<Option<Pinned>>,
    ret: Native,
}

fn pin(heap: &RefCell<ObjectHeap>, object: &ObjectRef) -> Result<Pinned, NativeError> {
    let cell = heap.borrow().get(object.handle).ok_or(NativeError::StaleHandle {
        index: object.handle.index,
    })?;
    Ok(Pinned {
        cell,
        object: object.clone(),
    })
}

fn borrow_as<'c, T: Any>(pinned: &'c Pinned) -> Result<RefMut<'c, T>, NativeError> {
    let guard = pinned.cell.try_borrow_mut().map_err(|_| NativeError::ObjectBorrowed {
        index: pinned.object.handle.index,
    })?;
    let path = &pinned.object.path;
    RefMut::filter_map(guard, |boxed| {
        path.project(&mut **boxed).and_then(|view| view.downcast_mut::<T>())
    })
    .map_err(|_| NativeError::invalid_this(format!("object is not a {}", type_name::<T>())))
}

impl<'a> CallContext<'a> {
    /// Build a context, pinning the receiver and every object argument.
    ///
    /// Fails with [`NativeError::StaleHandle`] if any of them has been freed.
    pub fn new(
        heap: &'a RefCell<ObjectHeap>,
        this: Option<ObjectRef>,
        args: Vec<Native>,
    ) -> Result<Self, NativeError> {
        let this = this.as_ref().map(|object| pin(heap, object)).transpose()?;
        let pins = args
            .iter()
            .map(|arg| match arg {
                Native::Object(object) => pin(heap, object).map(Some),
                _ => Ok(None),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            heap,
            this,
            args,
            pins,
            ret: Native::Void,
        })
    }

    /// Number of arguments (excluding the receiver).
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    fn out_of_bounds(&self, index: usize) -> NativeError {
        NativeError::ArgumentIndexOutOfBounds {
            index,
            count: self.args.len(),
        }
    }

    /// Raw argument slot.
    pub fn arg_native(&self, index: usize) -> Result<&Native, NativeError> {
        self.args.get(index).ok_or_else(|| self.out_of_bounds(index))
    }

    /// Typed argument value.
    pub fn arg<T: FromNative>(&self, index: usize) -> Result<T, NativeError> {
        let native = self.arg_native(index)?;
        T::from_native(native).map_err(NativeError::Conversion)
    }

    /// Move an argument out, leaving `Void` behind.
    pub fn take_arg(&mut self, index: usize) -> Result<Native, NativeError> {
        let err = self.out_of_bounds(index);
        self.args.get_mut(index).map(|slot| std::mem::replace(slot, Native::Void)).ok_or(err)
    }

    /// Byte span argument, aliasing the caller's storage.
    pub fn bytes(&self, index: usize) -> Result<BufferView, NativeError> {
        self.arg(index)
    }

    /// Callback argument.
    pub fn callback(&self, index: usize) -> Result<CallbackHandle, NativeError> {
        self.arg(index)
    }

    /// Mutably borrow an object argument as `T`.
    pub fn object<T: Any>(&self, index: usize) -> Result<RefMut<'_, T>, NativeError> {
        match self.pins.get(index) {
            Some(Some(pinned)) => borrow_as(pinned),
            Some(None) => Err(NativeError::Conversion(crate::ConversionError::TypeMismatch {
                expected: "object",
                actual: self.args[index].type_name(),
            })),
            None => Err(self.out_of_bounds(index)),
        }
    }

    /// Pointer passed for an object argument.
    pub fn object_ref(&self, index: usize) -> Result<&ObjectRef, NativeError> {
        match self.pins.get(index) {
            Some(Some(pinned)) => Ok(&pinned.object),
            _ => Err(self.out_of_bounds(index)),
        }
    }

    /// Mutably borrow the receiver as `T`.
    ///
    /// Fails with [`NativeError::ObjectBorrowed`] if an enclosing frame holds
    /// the same object.
    pub fn this<T: Any>(&self) -> Result<RefMut<'_, T>, NativeError> {
        let pinned = self.this.as_ref().ok_or_else(|| NativeError::invalid_this("no receiver"))?;
        borrow_as(pinned)
    }

    /// Pointer to the receiver, for returning it or one of its subobjects.
    pub fn this_ref(&self) -> Result<&ObjectRef, NativeError> {
        self.this
            .as_ref()
            .map(|p| &p.object)
            .ok_or_else(|| NativeError::invalid_this("no receiver"))
    }

    /// Place a new object in the heap.
    ///
    /// The heap holds one reference on behalf of the caller, which is
    /// responsible for it (usually by returning it as an owned result).
    pub fn allocate<T: Any>(&self, type_hash: TypeHash, value: T) -> ObjectRef {
        let handle = self.heap.borrow_mut().allocate(type_hash, Box::new(value));
        ObjectRef::new(handle, type_hash)
    }

    /// Set a typed return value.
    pub fn set_return<T: IntoNative>(&mut self, value: T) {
        self.ret = value.into_native();
    }

    /// Set a raw return value.
    pub fn set_return_native(&mut self, value: Native) {
        self.ret = value;
    }

    /// Return a fresh object by value.
    pub fn set_return_object<T: Any>(&mut self, value: T) {
        self.ret = Native::boxed(value);
    }

    /// Take the return value, leaving `Void`.
    pub fn take_return(&mut self) -> Native {
        std::mem::replace(&mut self.ret, Native::Void)
    }
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("this", &self.this.as_ref().map(|p| &p.object))
            .field("args", &self.args)
            .field("ret", &self.ret)
            .finish()
    }
}
