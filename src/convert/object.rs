//! Class proxies and value types.

use std::any::Any;

use bindery_core::{
    ConversionPolicy, NativeValue, ObjectRef, Ownership, Proxy, Record, TypeSpec, Value,
};
use tracing::debug;

use super::{Conversion, ConversionKind, Mode, marshal, to_dynamic};
use crate::binding::Binding;
use crate::error::{BindError, Result};
use crate::inheritance;
use crate::runtime::State;

/// Proxy argument viewed as the parameter's class.
pub(super) fn to_object(
    state: &State,
    value: &Value,
    spec: &TypeSpec,
) -> Result<(ObjectRef, Conversion)> {
    let registry = &state.registry;
    let Some(proxy) = value.as_proxy() else {
        return Err(BindError::type_mismatch(registry.spec_name(spec), value.type_name()));
    };
    let object = state.live_object(proxy)?;
    if object.is_const && !spec.is_const() {
        return Err(BindError::type_mismatch(
            registry.spec_name(spec),
            format!("const {}", proxy.class_name()),
        ));
    }

    let depth = registry.hierarchy().distance(object.view, spec.type_hash).unwrap_or(0);
    let view = inheritance::upcast(registry, &object, spec.type_hash)
        .map_err(|_| inheritance::invalid_cast(registry, object.view, spec.type_hash))?;

    let mut conversion = if depth == 0 {
        Conversion::identity()
    } else {
        Conversion::new(
            ConversionKind::ReferenceCast { depth },
            Conversion::COST_REFERENCE_CAST + depth as u32 - 1,
        )
    };
    if spec.is_const() && !view.is_const {
        if conversion.is_exact() {
            conversion.kind = ConversionKind::ConstAddition;
        }
        conversion.cost += Conversion::COST_CONST_ADDITION;
    }
    let view = if spec.is_const() { view.as_const() } else { view };
    Ok((view, conversion))
}

/// Field values of a dynamic object, in declaration order.
fn field_values(
    state: &State,
    value: &Value,
    type_name: &str,
    names: &[&str],
) -> Result<Vec<Value>> {
    let mismatch = || BindError::type_mismatch(type_name, value.type_name());

    if let Some(Binding::Value(factory)) = state.binding(type_name)
        && let Some(extracted) = factory.extract(value)
    {
        return extracted.ok_or_else(mismatch);
    }

    match value {
        Value::Object(record) if record.backing.is_none() => names
            .iter()
            .map(|name| {
                record
                    .get(name)
                    .cloned()
                    .ok_or_else(|| {
                        BindError::type_mismatch(type_name, format!("object without {}", name))
                    })
            })
            .collect(),
        _ => Err(mismatch()),
    }
}

/// Dynamic object copied field by field into a fresh native value.
pub(super) fn to_value(
    state: &State,
    value: &Value,
    spec: &TypeSpec,
    policy: ConversionPolicy,
    mode: Mode,
) -> Result<(NativeValue, Conversion)> {
    let desc = state
        .registry
        .value_type(spec.type_hash)
        .ok_or_else(|| BindError::UnknownType(state.registry.type_name(spec.type_hash)))?;
    let names: Vec<&str> = desc.field_names().collect();
    let values = field_values(state, value, &desc.name, &names)?;
    if values.len() != desc.fields.len() {
        return Err(BindError::LengthMismatch {
            expected: desc.fields.len(),
            actual: values.len(),
        });
    }

    let mut fields = Vec::with_capacity(values.len());
    let mut cost = Conversion::COST_EXACT;
    for (value, (_, field_spec)) in values.iter().zip(&desc.fields) {
        let (native, conversion) = marshal(state, value, field_spec, policy, mode)?;
        cost = cost.saturating_add(conversion.cost);
        fields.push(native);
    }
    let kind = if cost == Conversion::COST_EXACT {
        ConversionKind::Identity
    } else {
        ConversionKind::Aggregate
    };
    Ok((NativeValue::new(desc.type_hash, fields), Conversion::new(kind, cost)))
}

/// Native value copied out through the bound factory, or into a plain record.
pub(super) fn value_to_dynamic(state: &State, value: NativeValue) -> Result<Value> {
    let desc = state
        .registry
        .value_type(value.type_hash)
        .ok_or_else(|| BindError::UnknownType(state.registry.type_name(value.type_hash)))?;

    let mut values = Vec::with_capacity(desc.fields.len());
    for (native, (_, field_spec)) in value.fields.into_iter().zip(&desc.fields) {
        values.push(to_dynamic(state, native, field_spec)?);
    }

    match state.binding(&desc.name) {
        Some(Binding::Value(factory)) => factory
            .create(&values)
            .map_err(|err| BindError::Callback { message: err.message }),
        _ => {
            let record = desc
                .field_names()
                .zip(values)
                .fold(Record::new(), |record, (name, value)| record.with_field(name, value));
            Ok(Value::Object(record))
        }
    }
}

/// Wrap a proxy through its class's bound factory, if any.
pub(crate) fn wrap_proxy(state: &State, proxy: Proxy) -> Value {
    match state.binding(proxy.class_name()) {
        Some(Binding::Proxy(factory)) => factory.wrap(proxy),
        _ => Value::Proxy(proxy),
    }
}

fn expose(state: &State, object: ObjectRef, ownership: Ownership) -> Value {
    wrap_proxy(state, state.new_proxy(object, ownership))
}

/// Pointer to an existing object.
///
/// Declared ownership `Owned` cannot apply to an object that already lives in
/// the heap; the result becomes a shared owner instead.
pub(super) fn object_to_dynamic(
    state: &State,
    object: ObjectRef,
    spec: &TypeSpec,
) -> Result<Value> {
    let registry = &state.registry;
    if !state.heap.borrow().is_live(object.handle) {
        return Err(BindError::UseAfterFree {
            class: registry.type_name(object.view),
        });
    }

    let target = match registry.lookup(spec.type_hash) {
        Ok(desc) if desc.is_class() => spec.type_hash,
        _ => object.view,
    };
    let object = inheritance::upcast(registry, &object, target)
        .map_err(|_| inheritance::invalid_cast(registry, object.view, target))?;
    let object = if spec.is_const() { object.as_const() } else { object };

    // an existing object already has an owner, so an owning result shares it
    let ownership = match spec.ownership {
        Ownership::Borrowed => Ownership::Borrowed,
        Ownership::Owned | Ownership::Shared => {
            state.heap.borrow_mut().add_ref(object.handle);
            Ownership::Shared
        }
    };
    Ok(expose(state, object, ownership))
}

/// Freshly built object handed over by native code.
pub(super) fn boxed_to_dynamic(
    state: &State,
    boxed: Box<dyn Any>,
    spec: &TypeSpec,
) -> Result<Value> {
    let registry = &state.registry;
    let desc = registry.lookup(spec.type_hash)?;
    if !desc.is_class() {
        return Err(BindError::type_mismatch(registry.spec_name(spec), "new object"));
    }

    let handle = state.heap.borrow_mut().allocate(spec.type_hash, boxed);
    debug!(class = %desc.name, handle = handle.index, "allocated object");
    let object = ObjectRef::new(handle, spec.type_hash);
    let object = if spec.is_const() { object.as_const() } else { object };
    let ownership = match spec.ownership {
        Ownership::Shared => Ownership::Shared,
        _ => Ownership::Owned,
    };
    Ok(expose(state, object, ownership))
}
