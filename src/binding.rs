//! Dynamic-side constructors bound to native value types and classes.
//!
//! A value type with no binding crosses as a plain [`Record`] holding its
//! declared fields. Binding a [`ValueFactory`] under the type's name makes
//! results come out as whatever the factory builds, and lets arguments be
//! read back through its extractor. The name `Int64` is reserved for the
//! 64-bit integer factory, which receives `lo`, `hi` and `negative`.
//!
//! Binding a [`ProxyFactory`] under a class name wraps every proxy of that
//! class leaving the runtime.

use std::fmt;
use std::rc::Rc;

use bindery_core::{HostError, Proxy, Record, Value};

/// Name under which the 64-bit integer factory is bound.
pub const INT64_BINDING: &str = "Int64";

type CreateFn = Rc<dyn Fn(&[Value]) -> Result<Value, HostError>>;
type ExtractFn = Rc<dyn Fn(&Value) -> Option<Vec<Value>>>;

/// Builds dynamic objects for a native value type.
#[derive(Clone)]
pub struct ValueFactory {
    create: CreateFn,
    extract: Option<ExtractFn>,
}

impl ValueFactory {
    /// Factory called with the field values in declaration order.
    pub fn new<F>(create: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, HostError> + 'static,
    {
        Self {
            create: Rc::new(create),
            extract: None,
        }
    }

    /// Factory producing a [`Record`] tagged with `class` and the given field
    /// names.
    pub fn record(class: impl Into<String>, fields: &[&str]) -> Self {
        let class = class.into();
        let names: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        Self::new(move |values| {
            let record = names
                .iter()
                .zip(values)
                .fold(Record::new().with_class(class.clone()), |record, (name, value)| {
                    record.with_field(name.clone(), value.clone())
                });
            Ok(Value::Object(record))
        })
    }

    /// Reads the field values back out of a dynamic object, in declaration
    /// order. Returning `None` rejects the object.
    pub fn with_extract<F>(mut self, extract: F) -> Self
    where
        F: Fn(&Value) -> Option<Vec<Value>> + 'static,
    {
        self.extract = Some(Rc::new(extract));
        self
    }

    pub fn create(&self, fields: &[Value]) -> Result<Value, HostError> {
        (self.create)(fields)
    }

    /// Custom extraction, if one was given.
    pub fn extract(&self, value: &Value) -> Option<Option<Vec<Value>>> {
        self.extract.as_ref().map(|extract| extract(value))
    }
}

impl fmt::Debug for ValueFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueFactory")
            .field("extract", &self.extract.is_some())
            .finish()
    }
}

/// Wraps proxies of one class as they leave the runtime.
#[derive(Clone)]
pub struct ProxyFactory {
    wrap: Rc<dyn Fn(Proxy) -> Value>,
}

impl ProxyFactory {
    pub fn new<F>(wrap: F) -> Self
    where
        F: Fn(Proxy) -> Value + 'static,
    {
        Self { wrap: Rc::new(wrap) }
    }

    pub fn wrap(&self, proxy: Proxy) -> Value {
        (self.wrap)(proxy)
    }
}

impl fmt::Debug for ProxyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProxyFactory")
    }
}

/// A dynamic-side constructor registered with [`Runtime::bind`](crate::Runtime::bind).
#[derive(Debug, Clone)]
pub enum Binding {
    Value(ValueFactory),
    Proxy(ProxyFactory),
}

impl From<ValueFactory> for Binding {
    fn from(factory: ValueFactory) -> Self {
        Binding::Value(factory)
    }
}

impl From<ProxyFactory> for Binding {
    fn from(factory: ProxyFactory) -> Self {
        Binding::Proxy(factory)
    }
}
