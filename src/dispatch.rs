//! Call dispatch: from a dynamic call to a native entry point and back.
//!
//! ## Algorithm
//!
//! 1. Surface any deferred callback error; the call does not run
//! 2. Resolve the overload against the arguments
//! 3. Open a callback frame, then convert the arguments under the policies
//!    chosen during resolution
//! 4. Pin the receiver and object arguments and invoke the native target
//! 5. Close the frame; a callback error raised in it wins over the result
//! 6. Convert the result as the candidate declares it
//!
//! Conversion failures abort before step 4, so native code never sees a
//! partially converted call.

use std::collections::VecDeque;

use bindery_core::{CallContext, Native, NativeFn, ObjectRef, TypeHash, TypeSpec, Value};
use bindery_registry::{BoundFunction, ClassDescriptor, PropertyDescriptor, TypeRegistry};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::convert::{to_dynamic, to_native};
use crate::error::{BindError, Result};
use crate::inheritance;
use crate::overload::{CallSite, resolve_overload};
use crate::runtime::State;

/// Resolve and run one call.
#[cfg_attr(feature = "profiling", profiling::function)]
fn invoke(
    state: &State,
    site: &CallSite<'_>,
    this: Option<ObjectRef>,
    args: &[Value],
    ret_override: Option<&TypeSpec>,
) -> Result<Value> {
    if let Some(err) = state.callbacks.take_deferred() {
        return Err(err);
    }

    let matched = resolve_overload(state, site, args)?;
    debug!(
        function = site.name,
        cost = matched.total_cost,
        candidates = site.function.candidates.len(),
        "selected overload"
    );

    let candidate = matched.candidate;
    let ret = call_native(state, site.name, &candidate.target, this, || {
        args.iter()
            .zip(&candidate.params)
            .zip(&matched.policies)
            .map(|((arg, param), policy)| to_native(state, arg, param, *policy))
            .collect()
    })?;

    to_dynamic(state, ret, ret_override.unwrap_or(&candidate.ret))
}

/// Run `target` inside a callback frame with arguments built by `convert`.
fn call_native<F>(
    state: &State,
    name: &str,
    target: &NativeFn,
    this: Option<ObjectRef>,
    convert: F,
) -> Result<Native>
where
    F: FnOnce() -> Result<Vec<Native>>,
{
    let frame = state.callbacks.enter();
    let natives = convert()?;

    let outcome = CallContext::new(&state.heap, this, natives).and_then(|mut ctx| {
        target.call(&mut ctx)?;
        Ok(ctx.take_return())
    });

    frame.finish()?;
    outcome.map_err(|err| BindError::from_native(name, err))
}

fn class_by_name<'r>(registry: &'r TypeRegistry, name: &str) -> Result<&'r ClassDescriptor> {
    registry
        .class_by_name(name)
        .ok_or_else(|| BindError::UnknownType(name.to_string()))
}

/// First class in `start` and its bases, breadth first in declaration order,
/// for which `pick` finds something.
fn find_in_bases<'r, T>(
    registry: &'r TypeRegistry,
    start: TypeHash,
    pick: impl Fn(&'r ClassDescriptor) -> Option<&'r T>,
) -> Option<(&'r ClassDescriptor, &'r T)> {
    let mut queue = VecDeque::from([start]);
    let mut seen = FxHashSet::default();
    while let Some(ty) = queue.pop_front() {
        if !seen.insert(ty) {
            continue;
        }
        if let Some(class) = registry.class(ty)
            && let Some(found) = pick(class)
        {
            return Some((class, found));
        }
        queue.extend(registry.hierarchy().direct_bases(ty).into_iter().map(|(base, _)| base));
    }
    None
}

/// The live object behind a receiver, viewed as `owner`.
fn receiver(state: &State, value: &Value, owner: TypeHash) -> Result<ObjectRef> {
    let registry = &state.registry;
    let Some(proxy) = value.as_proxy() else {
        return Err(BindError::InvalidCast {
            from: value.type_name().to_string(),
            to: registry.type_name(owner),
        });
    };
    let object = state.live_object(proxy)?;
    inheritance::upcast(registry, &object, owner)
        .map_err(|_| inheritance::invalid_cast(registry, object.view, owner))
}

fn receiver_proxy<'v>(value: &'v Value) -> Result<&'v bindery_core::Proxy> {
    value.as_proxy().ok_or_else(|| BindError::InvalidCast {
        from: value.type_name().to_string(),
        to: "class instance".to_string(),
    })
}

fn run_method(
    state: &State,
    class: &ClassDescriptor,
    method: &BoundFunction,
    this: ObjectRef,
    args: &[Value],
) -> Result<Value> {
    let name = format!("{}.{}", class.name, method.name);
    let site = CallSite {
        name: &name,
        function: method,
        owner: Some(class),
        receiver_const: Some(this.is_const),
    };
    invoke(state, &site, Some(this), args, None)
}

// ============================================================================
// Entry points
// ============================================================================

pub(crate) fn call_function(state: &State, name: &str, args: &[Value]) -> Result<Value> {
    let function = state
        .registry
        .function(name)
        .ok_or_else(|| BindError::unknown_member("<global>", name))?;
    let site = CallSite {
        name,
        function,
        owner: None,
        receiver_const: None,
    };
    invoke(state, &site, None, args, None)
}

/// Construct an instance; the result is an owned proxy.
pub(crate) fn construct(state: &State, class_name: &str, args: &[Value]) -> Result<Value> {
    let class = class_by_name(&state.registry, class_name)?;
    if !class.has_constructor() {
        return Err(BindError::unknown_member(&class.name, "constructor"));
    }
    let ret = TypeSpec::of(class.type_hash);
    let site = CallSite {
        name: &class.name,
        function: &class.constructors,
        owner: Some(class),
        receiver_const: None,
    };
    invoke(state, &site, None, args, Some(&ret))
}

pub(crate) fn call_static(
    state: &State,
    class_name: &str,
    name: &str,
    args: &[Value],
) -> Result<Value> {
    let class = class_by_name(&state.registry, class_name)?;
    let function = class
        .find_static(name)
        .ok_or_else(|| BindError::unknown_member(&class.name, name))?;
    let qualified = format!("{}.{}", class.name, name);
    let site = CallSite {
        name: &qualified,
        function,
        owner: Some(class),
        receiver_const: None,
    };
    invoke(state, &site, None, args, None)
}

/// Call `name` on `receiver`, looking the method up from its view type.
pub(crate) fn call_method(
    state: &State,
    receiver_value: &Value,
    name: &str,
    args: &[Value],
) -> Result<Value> {
    let proxy = receiver_proxy(receiver_value)?;
    let object = state.live_object(proxy)?;
    let (class, method) =
        find_in_bases(&state.registry, object.view, |class| class.find_method(name))
            .ok_or_else(|| BindError::unknown_member(proxy.class_name(), name))?;
    let this = receiver(state, receiver_value, class.type_hash)?;
    run_method(state, class, method, this, args)
}

/// Call `class_name`'s method `name` with an explicit receiver, which must be
/// an instance of that class.
pub(crate) fn invoke_method(
    state: &State,
    class_name: &str,
    name: &str,
    receiver_value: &Value,
    args: &[Value],
) -> Result<Value> {
    let class = class_by_name(&state.registry, class_name)?;
    let (owner, method) =
        find_in_bases(&state.registry, class.type_hash, |class| class.find_method(name))
            .ok_or_else(|| BindError::unknown_member(&class.name, name))?;
    let registry = &state.registry;
    let as_class = receiver(state, receiver_value, class.type_hash)?;
    let this = inheritance::upcast(registry, &as_class, owner.type_hash)
        .map_err(|_| inheritance::invalid_cast(registry, as_class.view, owner.type_hash))?;
    run_method(state, owner, method, this, args)
}

fn property<'r>(
    state: &'r State,
    receiver_value: &Value,
    name: &str,
) -> Result<(&'r ClassDescriptor, &'r PropertyDescriptor, ObjectRef)> {
    let proxy = receiver_proxy(receiver_value)?;
    let object = state.live_object(proxy)?;
    let (class, property) =
        find_in_bases(&state.registry, object.view, |class| class.find_property(name))
            .ok_or_else(|| BindError::unknown_member(proxy.class_name(), name))?;
    let this = receiver(state, receiver_value, class.type_hash)?;
    Ok((class, property, this))
}

pub(crate) fn get_property(state: &State, receiver_value: &Value, name: &str) -> Result<Value> {
    if let Some(err) = state.callbacks.take_deferred() {
        return Err(err);
    }
    let (class, property, this) = property(state, receiver_value, name)?;
    let qualified = format!("{}.{}", class.name, property.name);
    let ret = call_native(state, &qualified, &property.getter, Some(this), || Ok(Vec::new()))?;
    to_dynamic(state, ret, &property.spec)
}

pub(crate) fn set_property(
    state: &State,
    receiver_value: &Value,
    name: &str,
    value: &Value,
) -> Result<()> {
    if let Some(err) = state.callbacks.take_deferred() {
        return Err(err);
    }
    let (class, property, this) = property(state, receiver_value, name)?;
    if this.is_const {
        return Err(BindError::type_mismatch(
            format!("mutable receiver for {}.{}", class.name, property.name),
            format!("const {}", class.name),
        ));
    }
    let setter = property
        .setter
        .as_ref()
        .ok_or_else(|| {
            BindError::unknown_member(&class.name, format!("{} setter", property.name))
        })?;

    let spec = &property.spec;
    let policy = spec
        .policy
        .or(class.policy)
        .or_else(|| state.registry.lookup(spec.type_hash).ok().and_then(|desc| desc.policy))
        .unwrap_or(state.default_policy);
    let qualified = format!("{}.{}", class.name, property.name);
    call_native(state, &qualified, setter, Some(this), || {
        Ok(vec![to_native(state, value, spec, policy)?])
    })?;
    Ok(())
}
