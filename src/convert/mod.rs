//! Argument and result conversion.
//!
//! Converts dynamic [`Value`]s into the [`Native`] form a parameter declares,
//! and native results back into values. Every argument conversion also carries
//! a cost, which the overload resolver sums to rank candidates.
//!
//! ## Conversion Priority
//!
//! 1. Identity (kind matches, including null into a nullable target)
//! 2. Const addition (mutable proxy into a const parameter)
//! 3. Numeric narrowing of 64-bit sources
//! 4. Fractional number to integer (loose only)
//! 5. Derived proxy to base parameter, one step per edge
//! 6. Cross-kind coercions between bool, number and string (loose only)
//!
//! Strict call sites accept only the first, second and fifth group; anything
//! else is a [`BindError::TypeMismatch`].

mod object;
mod primitive;

pub(crate) use object::wrap_proxy;

use bindery_core::{ConversionPolicy, Native, TypeHash, TypeKind, TypeSpec, Value, WideInt};
use tracing::trace;

use crate::error::{BindError, Result};
use crate::runtime::State;

/// A conversion with its cost for overload ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub kind: ConversionKind,
    pub cost: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    /// Kind matches, no coercion.
    Identity,
    /// Null or undefined into a nullable target.
    Null,
    /// Mutable proxy into a const parameter.
    ConstAddition,
    /// Number representation change (64-bit narrowing, truncation).
    Numeric,
    /// Proxy upcast through `depth` base edges.
    ReferenceCast { depth: usize },
    /// Cross-kind coercion between bool, number and string.
    Coercion,
    /// Element-wise conversion of an array or value type.
    Aggregate,
}

impl Conversion {
    pub const COST_EXACT: u32 = 0;
    pub const COST_CONST_ADDITION: u32 = 1;
    pub const COST_PRIMITIVE_NARROWING: u32 = 5;
    pub const COST_FLOAT_TO_INT: u32 = 9;
    pub const COST_REFERENCE_CAST: u32 = 10;
    pub const COST_COERCION: u32 = 11;
    pub const COST_TO_STRING: u32 = 12;

    pub fn identity() -> Self {
        Self::new(ConversionKind::Identity, Self::COST_EXACT)
    }

    pub fn new(kind: ConversionKind, cost: u32) -> Self {
        Self { kind, cost }
    }

    pub fn is_exact(&self) -> bool {
        self.cost == Self::COST_EXACT
    }
}

/// Whether a conversion only prices itself or also produces the native value.
///
/// Ranking never creates callback handles; those are bound to the call that
/// actually runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Rank,
    Apply,
}

/// Cost of converting `value` to `spec`, or the reason it cannot convert.
pub(crate) fn find_conversion(
    state: &State,
    value: &Value,
    spec: &TypeSpec,
    policy: ConversionPolicy,
) -> Result<Conversion> {
    marshal(state, value, spec, policy, Mode::Rank).map(|(_, conversion)| conversion)
}

/// Convert `value` to the native form `spec` declares.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn to_native(
    state: &State,
    value: &Value,
    spec: &TypeSpec,
    policy: ConversionPolicy,
) -> Result<Native> {
    let (native, conversion) = marshal(state, value, spec, policy, Mode::Apply)?;
    trace!(
        from = value.type_name(),
        to = %state.registry.spec_name(spec),
        policy = policy.as_str(),
        cost = conversion.cost,
        "converted argument"
    );
    Ok(native)
}

pub(crate) fn marshal(
    state: &State,
    value: &Value,
    spec: &TypeSpec,
    policy: ConversionPolicy,
    mode: Mode,
) -> Result<(Native, Conversion)> {
    if spec.is_void() {
        return Ok((Native::Void, Conversion::identity()));
    }
    let desc = state.registry.lookup(spec.type_hash)?;

    if value.is_nullish() {
        return if spec.is_nullable() || desc.nullable {
            Ok((Native::Null, Conversion::new(ConversionKind::Null, Conversion::COST_EXACT)))
        } else {
            Err(BindError::NullNotAllowed {
                target: state.registry.spec_name(spec),
            })
        };
    }

    let mismatch = || BindError::type_mismatch(state.registry.spec_name(spec), value.type_name());

    match &desc.kind {
        TypeKind::Void => Ok((Native::Void, Conversion::identity())),
        TypeKind::Bool => {
            let (b, conversion) = primitive::to_bool(value, policy).ok_or_else(mismatch)?;
            Ok((Native::Bool(b), conversion))
        }
        TypeKind::Int { bits, signed } if *bits >= 64 => {
            let (wide, conversion) = primitive::to_wide(state, value, *signed, policy, &desc.name)?;
            Ok((Native::Wide(wide), conversion))
        }
        TypeKind::Int { bits, signed } => {
            let (i, conversion) = primitive::to_int(value, *bits, *signed, policy, &desc.name)?;
            Ok((Native::Int(i), conversion))
        }
        TypeKind::Float { bits } => {
            let (f, conversion) = primitive::to_float(value, *bits, policy).ok_or_else(mismatch)?;
            Ok((Native::Float(f), conversion))
        }
        TypeKind::String | TypeKind::CString => {
            let (s, conversion) = primitive::to_string(value, policy).ok_or_else(mismatch)?;
            Ok((Native::String(s), conversion))
        }
        TypeKind::Buffer => match value {
            Value::Buffer(view) => Ok((Native::Bytes(view.clone()), Conversion::identity())),
            _ => Err(mismatch()),
        },
        TypeKind::Array { element, len } => {
            let items = value.as_array().ok_or_else(mismatch)?;
            if items.len() != *len {
                return Err(BindError::LengthMismatch {
                    expected: *len,
                    actual: items.len(),
                });
            }
            marshal_elements(state, items, &TypeSpec::of(*element), policy, mode)
        }
        TypeKind::Vector { element } => {
            let items = value.as_array().ok_or_else(mismatch)?;
            marshal_elements(state, items, &TypeSpec::of(*element), policy, mode)
        }
        TypeKind::Callback(signature) => {
            let Value::Function(function) = value else {
                return Err(mismatch());
            };
            let native = match mode {
                Mode::Rank => Native::Void,
                Mode::Apply => Native::Callback(state.callback_handle(
                    function.clone(),
                    signature,
                    spec.is_retained(),
                )),
            };
            Ok((native, Conversion::identity()))
        }
        TypeKind::Class => {
            let (object, conversion) = object::to_object(state, value, spec)?;
            Ok((Native::Object(object), conversion))
        }
        TypeKind::Value => {
            let (native, conversion) = object::to_value(state, value, spec, policy, mode)?;
            Ok((Native::Value(native), conversion))
        }
    }
}

fn marshal_elements(
    state: &State,
    items: &[Value],
    element: &TypeSpec,
    policy: ConversionPolicy,
    mode: Mode,
) -> Result<(Native, Conversion)> {
    let mut natives = Vec::with_capacity(items.len());
    let mut cost = Conversion::COST_EXACT;
    for item in items {
        let (native, conversion) = marshal(state, item, element, policy, mode)?;
        cost = cost.saturating_add(conversion.cost);
        natives.push(native);
    }
    let kind = if cost == Conversion::COST_EXACT {
        ConversionKind::Identity
    } else {
        ConversionKind::Aggregate
    };
    Ok((Native::Array(natives), Conversion::new(kind, cost)))
}

/// Convert a native result to a dynamic value as `spec` declares it.
///
/// The native slot must match the declared kind. A mismatch, a missing result
/// or an integer outside the declared width is a defect in the native target
/// and fails as [`BindError::Native`].
pub(crate) fn to_dynamic(state: &State, native: Native, spec: &TypeSpec) -> Result<Value> {
    if spec.is_void() {
        return Ok(Value::Undefined);
    }
    let desc = state.registry.lookup(spec.type_hash)?;
    let invalid = |native: &Native| BindError::Native {
        function: format!("{} result", state.registry.spec_name(spec)),
        message: format!("native code returned {}", native.type_name()),
    };

    match (&desc.kind, native) {
        (TypeKind::CString, Native::Null) => Ok(Value::Null),
        (_, Native::Null) if spec.is_nullable() => Ok(Value::Null),
        (TypeKind::Bool, Native::Bool(b)) => Ok(Value::Bool(b)),
        (TypeKind::Int { bits, signed }, Native::Int(i)) if *bits >= 64 => {
            if !*signed && i < 0 {
                return Err(invalid(&Native::Int(i)));
            }
            primitive::wide_to_dynamic(state, WideInt::from_i64(i))
        }
        (TypeKind::Int { bits, signed }, Native::Int(i)) => {
            if primitive::fits_int(i, *bits, *signed) {
                Ok(Value::Number(i as f64))
            } else {
                Err(invalid(&Native::Int(i)))
            }
        }
        (TypeKind::Int { bits, signed }, Native::Wide(wide)) => {
            if *bits >= 64 {
                return primitive::wide_to_dynamic(state, wide);
            }
            match wide.to_i64() {
                Some(i) if primitive::fits_int(i, *bits, *signed) => Ok(Value::Number(i as f64)),
                _ => Err(invalid(&Native::Wide(wide))),
            }
        }
        (TypeKind::Float { bits }, Native::Float(f)) => Ok(Value::Number(narrow(f, *bits))),
        (TypeKind::Float { bits }, Native::Int(i)) => Ok(Value::Number(narrow(i as f64, *bits))),
        (TypeKind::String | TypeKind::CString, Native::String(s)) => Ok(Value::String(s)),
        (TypeKind::Buffer, Native::Bytes(view)) => Ok(Value::Buffer(view)),
        (TypeKind::Array { element, len }, Native::Array(items)) => {
            if items.len() != *len {
                return Err(BindError::Native {
                    function: format!("{} result", state.registry.spec_name(spec)),
                    message: format!("native code returned {} elements", items.len()),
                });
            }
            elements_to_dynamic(state, items, *element)
        }
        (TypeKind::Vector { element }, Native::Array(items)) => {
            elements_to_dynamic(state, items, *element)
        }
        (TypeKind::Value, Native::Value(value)) => object::value_to_dynamic(state, value),
        (TypeKind::Class, Native::Object(object)) => {
            object::object_to_dynamic(state, object, spec)
        }
        (TypeKind::Class, Native::Boxed(boxed)) => object::boxed_to_dynamic(state, boxed, spec),
        (_, native) => Err(invalid(&native)),
    }
}

fn narrow(f: f64, bits: u8) -> f64 {
    if bits == 32 { f as f32 as f64 } else { f }
}

fn elements_to_dynamic(state: &State, items: Vec<Native>, element: TypeHash) -> Result<Value> {
    let element = TypeSpec::of(element);
    items
        .into_iter()
        .map(|item| to_dynamic(state, item, &element))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}
