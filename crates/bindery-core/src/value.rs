//! Dynamic-side values.
//!
//! [`Value`] models what a dynamically typed caller hands to the runtime and
//! receives back: doubles, strings, booleans, the two empty values, big
//! integers, arrays, plain records, byte views, functions and proxies of
//! native objects.

use std::fmt;
use std::rc::Rc;

use num_bigint::BigInt;
use thiserror::Error;

use crate::{BufferView, Proxy};

/// An error raised by dynamic-side code (a thrown exception).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct HostError {
    pub message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A dynamic-side function.
pub type DynFunction = Rc<dyn Fn(&[Value]) -> Result<Value, HostError>>;

/// A plain dynamic object: named fields plus an optional class name.
///
/// A record produced by a proxy wrapper carries the proxy it wraps in
/// `backing`; such a record is accepted wherever the proxy is.
#[derive(Clone, Default)]
pub struct Record {
    /// Name of the dynamic class that produced the record, if any.
    pub class: Option<String>,
    pub fields: Vec<(String, Value)>,
    pub backing: Option<Proxy>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    pub fn with_backing(mut self, proxy: Proxy) -> Self {
        self.backing = Some(proxy);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Insert or overwrite a field, keeping insertion order.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        let backing_eq = match (&self.backing, &other.backing) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            (None, None) => true,
            _ => false,
        };
        self.class == other.class && self.fields == other.fields && backing_eq
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(class) = &self.class {
            write!(f, "{} ", class)?;
        }
        let mut map = f.debug_map();
        for (name, value) in &self.fields {
            map.entry(name, value);
        }
        map.finish()
    }
}

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    BigInt(BigInt),
    Array(Vec<Value>),
    Object(Record),
    Buffer(BufferView),
    Function(DynFunction),
    Proxy(Proxy),
}

impl Value {
    /// Wrap a closure as a dynamic function.
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, HostError> + 'static,
    {
        Value::Function(Rc::new(f))
    }

    /// `typeof`-style kind name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::BigInt(_) => "bigint",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Buffer(_) => "buffer",
            Value::Function(_) => "function",
            Value::Proxy(_) => "proxy",
        }
    }

    /// Null or undefined.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Object(record) => Some(record),
            _ => None,
        }
    }

    /// The proxy behind this value: a proxy itself, or a wrapper record's backing.
    pub fn as_proxy(&self) -> Option<&Proxy> {
        match self {
            Value::Proxy(p) => Some(p),
            Value::Object(record) => record.backing.as_ref(),
            _ => None,
        }
    }

    /// Field of a record, `None` for anything else.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.as_record().and_then(|r| r.get(name))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Buffer(a), Value::Buffer(b)) => {
                a.shares_storage(b) && a.offset() == b.offset() && a.len() == b.len()
            }
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Proxy(a), Value::Proxy(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::BigInt(n) => write!(f, "{}n", n),
            Value::Array(items) => f.debug_list().entries(items).finish(),
            Value::Object(record) => write!(f, "{:?}", record),
            Value::Buffer(view) => write!(f, "{:?}", view),
            Value::Function(_) => write!(f, "[function]"),
            Value::Proxy(p) => write!(f, "{:?}", p),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<BigInt> for Value {
    fn from(value: BigInt) -> Self {
        Value::BigInt(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Object(value)
    }
}

impl From<Proxy> for Value {
    fn from(value: Proxy) -> Self {
        Value::Proxy(value)
    }
}

impl From<BufferView> for Value {
    fn from(value: BufferView) -> Self {
        Value::Buffer(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}
