//! Core types shared by the bindery registry and runtime.
//!
//! This crate holds everything that both sides of the boundary need to agree on:
//!
//! - [`TypeHash`]: deterministic identity for types and entry points
//! - [`Value`]: the dynamic-side value model (what the caller passes and receives)
//! - [`Native`]: the native-side representation handed to bound functions
//! - [`TypeSpec`] / [`TypeKind`]: declared parameter and result types
//! - [`ObjectHeap`]: generational table of constructed native objects
//! - [`NativeFn`] / [`CallContext`]: the calling convention for native targets
//! - [`Proxy`]: dynamic-side reference to a native object
//! - [`WideInt`]: lossless transport for 64-bit integers

mod adjust;
mod buffer;
mod callback;
mod call_context;
mod convert;
mod error;
mod native;
mod native_fn;
mod object_heap;
mod proxy;
mod type_hash;
mod type_spec;
mod value;
mod wide_int;

pub use adjust::{Adjustment, BasePath};
pub use buffer::BufferView;
pub use call_context::CallContext;
pub use callback::{CallbackHandle, CallbackTarget};
pub use convert::{FromNative, IntoNative};
pub use error::{ConversionError, NativeError, RegistrationError};
pub use native::{Native, NativeValue, ObjectRef};
pub use native_fn::{NativeCallable, NativeFn};
pub use object_heap::{ObjectCell, ObjectHandle, ObjectHeap};
pub use proxy::{Finalizer, Proxy};
pub use type_hash::{TypeHash, hash_constants, primitives, templates};
pub use type_spec::{CallbackSignature, ConversionPolicy, Ownership, TypeFlags, TypeKind, TypeSpec};
pub use value::{DynFunction, HostError, Record, Value};
pub use wide_int::WideInt;
