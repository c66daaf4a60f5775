//! Native-side representation of arguments and results.

use std::any::Any;
use std::fmt;

use crate::{BasePath, BufferView, CallbackHandle, ObjectHandle, TypeHash, WideInt};

/// Pointer to a native object (or one of its base subobjects).
#[derive(Clone)]
pub struct ObjectRef {
    /// The object's slot in the heap.
    pub handle: ObjectHandle,
    /// Type the object was allocated as.
    pub object_type: TypeHash,
    /// Adjustment from the allocated object to the viewed subobject.
    pub path: BasePath,
    /// Type the pointer is viewed as.
    pub view: TypeHash,
    /// Pointer to const.
    pub is_const: bool,
}

impl ObjectRef {
    /// Pointer to a whole object, viewed as its allocated type.
    pub fn new(handle: ObjectHandle, object_type: TypeHash) -> Self {
        Self {
            handle,
            object_type,
            path: BasePath::root(),
            view: object_type,
            is_const: false,
        }
    }

    /// The same pointer, as pointer to const.
    pub fn as_const(mut self) -> Self {
        self.is_const = true;
        self
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("handle", &self.handle)
            .field("view", &self.view)
            .field("path", &self.path)
            .field("is_const", &self.is_const)
            .finish()
    }
}

/// Field-wise copy of a plain native value type.
#[derive(Debug)]
pub struct NativeValue {
    pub type_hash: TypeHash,
    /// Fields in declaration order.
    pub fields: Vec<Native>,
}

impl NativeValue {
    pub fn new(type_hash: TypeHash, fields: Vec<Native>) -> Self {
        Self { type_hash, fields }
    }
}

/// A value as native code sees it.
///
/// Not `Clone`: fresh objects are boxed Rust values owned by the slot.
pub enum Native {
    /// No value (void results, consumed slots).
    Void,
    /// Null pointer / empty optional.
    Null,
    Bool(bool),
    /// Integers up to 32 bits wide.
    Int(i64),
    /// 64-bit integers, signed or unsigned.
    Wide(WideInt),
    Float(f64),
    String(String),
    /// Byte span aliasing caller storage.
    Bytes(BufferView),
    /// Array or vector elements.
    Array(Vec<Native>),
    /// Plain value type.
    Value(NativeValue),
    /// Existing object.
    Object(ObjectRef),
    /// Freshly constructed object, to be placed in the heap by the dispatcher.
    Boxed(Box<dyn Any>),
    /// Dynamic-side function.
    Callback(CallbackHandle),
}

impl Native {
    /// Human-readable kind of this slot.
    pub fn type_name(&self) -> &'static str {
        match self {
            Native::Void => "void",
            Native::Null => "null",
            Native::Bool(_) => "bool",
            Native::Int(_) => "int",
            Native::Wide(_) => "int64",
            Native::Float(_) => "float",
            Native::String(_) => "string",
            Native::Bytes(_) => "buffer",
            Native::Array(_) => "array",
            Native::Value(_) => "value",
            Native::Object(_) => "object",
            Native::Boxed(_) => "new object",
            Native::Callback(_) => "callback",
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Native::Void)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Native::Null)
    }

    /// Box a fresh object as a constructor or by-value result.
    pub fn boxed<T: Any>(value: T) -> Self {
        Native::Boxed(Box::new(value))
    }
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Native::Void => write!(f, "Void"),
            Native::Null => write!(f, "Null"),
            Native::Bool(v) => write!(f, "Bool({})", v),
            Native::Int(v) => write!(f, "Int({})", v),
            Native::Wide(v) => write!(f, "Wide({})", v),
            Native::Float(v) => write!(f, "Float({})", v),
            Native::String(s) => write!(f, "String({:?})", s),
            Native::Bytes(b) => write!(f, "Bytes({:?})", b),
            Native::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Native::Value(v) => write!(f, "Value({:?})", v),
            Native::Object(o) => write!(f, "Object({:?})", o),
            Native::Boxed(_) => write!(f, "Boxed(...)"),
            Native::Callback(_) => write!(f, "Callback(...)"),
        }
    }
}
