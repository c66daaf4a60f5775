//! The runtime facade.
//!
//! A [`Runtime`] owns the registry, the heap of native objects, the bindings
//! of dynamic-side constructors and the callback frames. Cloning it is cheap
//! and yields another handle to the same runtime. The last handle going away
//! destroys every object still alive.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use bindery_core::{ConversionPolicy, Native, ObjectHeap, TypeSpec, Value};
use bindery_registry::TypeRegistry;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::binding::Binding;
use crate::callback::CallbackScope;
use crate::config::RuntimeConfig;
use crate::convert::{self, wrap_proxy};
use crate::dispatch;
use crate::error::{BindError, Result};
use crate::inheritance;
use crate::lifetime::{Collector, GcStatistics};
use crate::reflect::Reflection;

/// Shared state behind every [`Runtime`] handle.
pub(crate) struct State {
    pub(crate) registry: Rc<TypeRegistry>,
    pub(crate) default_policy: ConversionPolicy,
    pub(crate) heap: RefCell<ObjectHeap>,
    pub(crate) callbacks: CallbackScope,
    pub(crate) collector: Collector,
    bindings: RefCell<FxHashMap<String, Binding>>,
    pub(crate) weak_self: Weak<State>,
}

impl State {
    /// Binding registered under `name`, cloned so no borrow is held while it
    /// runs.
    pub(crate) fn binding(&self, name: &str) -> Option<Binding> {
        self.bindings.borrow().get(name).cloned()
    }
}

impl Drop for State {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Entry point for calls from the dynamic side.
///
/// ```
/// use bindery::{Runtime, TypeRegistry, Value};
///
/// let rt = Runtime::new(TypeRegistry::with_primitives());
/// assert_eq!(rt.live_objects(), 0);
/// assert!(rt.call_function("missing", &[Value::from(1)]).is_err());
/// ```
#[derive(Clone)]
pub struct Runtime {
    state: Rc<State>,
}

impl Runtime {
    pub fn new(registry: TypeRegistry) -> Self {
        Self::with_config(registry, RuntimeConfig::default())
    }

    pub fn with_config(registry: TypeRegistry, config: RuntimeConfig) -> Self {
        debug!(
            policy = config.default_policy.as_str(),
            light_gc = config.light_gc,
            batch = config.light_gc_batch,
            "creating runtime"
        );
        let state = Rc::new_cyclic(|weak_self| State {
            registry: Rc::new(registry),
            default_policy: config.default_policy,
            heap: RefCell::new(ObjectHeap::new()),
            callbacks: CallbackScope::default(),
            collector: Collector::new(config.light_gc, config.light_gc_batch),
            bindings: RefCell::new(FxHashMap::default()),
            weak_self: weak_self.clone(),
        });
        Self { state }
    }

    pub(crate) fn state(&self) -> &State {
        &self.state
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.state.registry
    }

    // ==========================================================================
    // Bindings
    // ==========================================================================

    /// Register a dynamic-side constructor for the type called `name`.
    ///
    /// Replacing a binding only affects conversions made afterwards.
    pub fn bind(&self, name: impl Into<String>, binding: impl Into<Binding>) {
        let name = name.into();
        let binding = binding.into();
        debug!(name = %name, binding = ?binding, "bound type");
        self.state.bindings.borrow_mut().insert(name, binding);
    }

    /// Remove the binding for `name`, returning it.
    pub fn unbind(&self, name: &str) -> Option<Binding> {
        self.state.bindings.borrow_mut().remove(name)
    }

    // ==========================================================================
    // Calls
    // ==========================================================================

    /// Construct an instance of `class`. The result owns the new object.
    pub fn construct(&self, class: &str, args: &[Value]) -> Result<Value> {
        dispatch::construct(&self.state, class, args)
    }

    /// Call a class as a plain function; same as [`construct`](Self::construct).
    pub fn call_class(&self, class: &str, args: &[Value]) -> Result<Value> {
        self.construct(class, args)
    }

    pub fn call_function(&self, name: &str, args: &[Value]) -> Result<Value> {
        dispatch::call_function(&self.state, name, args)
    }

    pub fn call_static(&self, class: &str, name: &str, args: &[Value]) -> Result<Value> {
        dispatch::call_static(&self.state, class, name, args)
    }

    /// Call a method on `receiver`, found on its class or one of its bases.
    pub fn call_method(&self, receiver: &Value, name: &str, args: &[Value]) -> Result<Value> {
        dispatch::call_method(&self.state, receiver, name, args)
    }

    /// Call `class`'s method `name` on an explicit receiver. The receiver must
    /// be an instance of `class`, otherwise the call fails with
    /// [`BindError::InvalidCast`].
    pub fn invoke_method(
        &self,
        class: &str,
        name: &str,
        receiver: &Value,
        args: &[Value],
    ) -> Result<Value> {
        dispatch::invoke_method(&self.state, class, name, receiver, args)
    }

    /// Read a property.
    pub fn get(&self, receiver: &Value, name: &str) -> Result<Value> {
        dispatch::get_property(&self.state, receiver, name)
    }

    /// Write a property.
    pub fn set(&self, receiver: &Value, name: &str, value: &Value) -> Result<()> {
        dispatch::set_property(&self.state, receiver, name, value)
    }

    // ==========================================================================
    // Objects
    // ==========================================================================

    /// Whether `value` is a proxy for an instance of `class` or a subclass.
    pub fn instance_of(&self, value: &Value, class: &str) -> Result<bool> {
        let registry = &self.state.registry;
        let class = registry
            .class_by_name(class)
            .ok_or_else(|| BindError::UnknownType(class.to_string()))?;
        Ok(value.as_proxy().is_some_and(|proxy| {
            inheritance::instance_of(registry, proxy.view_type(), class.type_hash)
        }))
    }

    /// A non-owning view of `value` as its base `class`.
    pub fn cast(&self, value: &Value, class: &str) -> Result<Value> {
        let registry = &self.state.registry;
        let target = registry
            .class_by_name(class)
            .ok_or_else(|| BindError::UnknownType(class.to_string()))?;
        let Some(proxy) = value.as_proxy() else {
            return Err(BindError::InvalidCast {
                from: value.type_name().to_string(),
                to: target.name.clone(),
            });
        };
        let object = self.state.live_object(proxy)?;
        let view = inheritance::upcast(registry, &object, target.type_hash)
            .map_err(|_| inheritance::invalid_cast(registry, object.view, target.type_hash))?;
        let proxy = self.state.new_proxy(view, bindery_core::Ownership::Borrowed);
        Ok(wrap_proxy(&self.state, proxy))
    }

    /// Destroy (owned), unshare (shared) or detach (borrowed) the object
    /// behind `value` now. Any later use of `value` fails with
    /// [`BindError::UseAfterFree`]. Releasing the last hold on an object that
    /// an enclosing native call is using fails with [`BindError::Native`]
    /// and changes nothing.
    pub fn release(&self, value: &Value) -> Result<()> {
        let proxy = self.proxy_of(value)?;
        self.state.release(proxy)
    }

    /// Hand the object behind `value` to a new proxy, leaving `value`
    /// released. The constructor is not run again.
    pub fn transfer(&self, value: &Value) -> Result<Value> {
        let proxy = self.proxy_of(value)?;
        let moved = self.state.transfer(proxy)?;
        Ok(wrap_proxy(&self.state, moved))
    }

    fn proxy_of<'v>(&self, value: &'v Value) -> Result<&'v bindery_core::Proxy> {
        value
            .as_proxy()
            .ok_or_else(|| BindError::type_mismatch("class instance", value.type_name()))
    }

    // ==========================================================================
    // Lifetime
    // ==========================================================================

    /// Sweep queued finalizations and surface a deferred callback error.
    pub fn collect_garbage(&self) -> Result<()> {
        let swept = self.state.sweep();
        // a destructor failing through a callback also deferred that error
        match self.state.callbacks.take_deferred() {
            Some(err) => Err(err),
            None => swept,
        }
    }

    /// Switch between immediate and batched finalization. Switching batching
    /// off flushes the queue.
    pub fn toggle_light_gc(&self, enabled: bool) -> Result<()> {
        self.state.set_light_gc(enabled)
    }

    pub fn gc_statistics(&self) -> GcStatistics {
        self.state.gc_statistics()
    }

    /// Number of native objects currently alive.
    pub fn live_objects(&self) -> usize {
        self.state.heap.borrow().live_count()
    }

    // ==========================================================================
    // Conversion
    // ==========================================================================

    /// Convert a dynamic value as a parameter of type `spec` would.
    pub fn convert(
        &self,
        value: &Value,
        spec: &TypeSpec,
        policy: ConversionPolicy,
    ) -> Result<Native> {
        convert::to_native(&self.state, value, spec, policy)
    }

    /// Convert a native value as a result of type `spec` would.
    pub fn to_dynamic(&self, native: Native, spec: &TypeSpec) -> Result<Value> {
        convert::to_dynamic(&self.state, native, spec)
    }

    // ==========================================================================
    // Reflection
    // ==========================================================================

    pub fn reflect(&self) -> Reflection {
        Reflection::from_registry(&self.state.registry)
    }

    /// Pseudo-declarations of every registered class, function and value type.
    pub fn dump_pseudo(&self) -> String {
        self.reflect().to_string()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("default_policy", &self.state.default_policy)
            .field("light_gc", &self.state.collector.is_light())
            .field("live_objects", &self.live_objects())
            .finish()
    }
}
