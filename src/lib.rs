//! Dynamic binding runtime for native classes and functions.
//!
//! Native types, free functions and classes are described once in a
//! [`TypeRegistry`]. A [`Runtime`] over that registry lets a dynamically
//! typed caller construct objects, call functions and methods, and read or
//! write properties using [`Value`]s, with:
//!
//! - argument conversion under loose or strict policies, priced per argument
//! - overload resolution by total conversion cost, ambiguity reported
//! - receiver adjustment through single, multiple and shared inheritance
//! - proxies tied to native object lifetime, finalized immediately or in
//!   batches
//! - dynamic functions passed to native code as scoped callbacks
//!
//! ```
//! use bindery::{BoundFunction, Runtime, TypeRegistry, TypeSpec, Value, primitives};
//!
//! let int = TypeSpec::of(primitives::INT32);
//! let mut registry = TypeRegistry::with_primitives();
//! registry
//!     .register_function(BoundFunction::simple("twice", vec![int], int, |ctx| {
//!         let n: i32 = ctx.arg(0)?;
//!         ctx.set_return(n * 2);
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! let rt = Runtime::new(registry);
//! assert_eq!(rt.call_function("twice", &[Value::from("21")]).unwrap(), Value::from(42));
//! ```

mod binding;
mod callback;
mod config;
mod convert;
mod dispatch;
mod error;
mod inheritance;
mod lifetime;
mod overload;
mod reflect;
mod runtime;

pub use binding::{Binding, INT64_BINDING, ProxyFactory, ValueFactory};
pub use config::{DEFAULT_LIGHT_GC_BATCH, RuntimeConfig};
pub use convert::{Conversion, ConversionKind};
pub use error::{BindError, ErrorKind, Result};
pub use inheritance::CastFailure;
pub use lifetime::GcStatistics;
pub use reflect::{
    BaseInfo, ClassInfo, FunctionInfo, PropertyInfo, Reflection, SignatureInfo, ValueTypeInfo,
};
pub use runtime::Runtime;

pub use bindery_core::{
    Adjustment, BufferView, CallContext, CallbackHandle, CallbackSignature, ConversionPolicy,
    FromNative, HostError, IntoNative, Native, NativeError, NativeValue, ObjectRef, Ownership,
    Proxy, Record, TypeHash, TypeKind, TypeSpec, Value, WideInt, primitives,
};
pub use bindery_registry::{
    BoundFunction, ClassDescriptor, OverloadCandidate, PropertyDescriptor, TypeDescriptor,
    TypeRegistry, ValueTypeDescriptor,
};
