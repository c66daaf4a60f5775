//! Bool, number, string and 64-bit integer conversions.

use bindery_core::{ConversionPolicy, Value, WideInt};
use num_bigint::BigInt;
use num_traits::Zero;

use super::{Conversion, ConversionKind};
use crate::binding::{Binding, INT64_BINDING};
use crate::error::{BindError, Result};
use crate::runtime::State;

fn coercion() -> Conversion {
    Conversion::new(ConversionKind::Coercion, Conversion::COST_COERCION)
}

fn is_loose(policy: ConversionPolicy) -> bool {
    policy == ConversionPolicy::Loose
}

/// Render a number the way the dynamic side prints it.
fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        let s = format!("{:e}", n);
        match s.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => s,
        }
    } else {
        n.to_string()
    }
}

/// Trimmed decimal; the empty string reads as zero.
fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    // Rust also accepts "inf" and "nan" spellings
    if trimmed.chars().any(|c| c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E')) {
        return None;
    }
    trimmed.parse().ok()
}

pub(super) fn to_bool(value: &Value, policy: ConversionPolicy) -> Option<(bool, Conversion)> {
    match value {
        Value::Bool(b) => Some((*b, Conversion::identity())),
        _ if !is_loose(policy) => None,
        Value::Number(n) => Some((*n != 0.0 && !n.is_nan(), coercion())),
        Value::String(s) => Some((!s.is_empty(), coercion())),
        Value::BigInt(b) => Some((!b.is_zero(), coercion())),
        _ => None,
    }
}

/// Numeric reading shared by integer and float targets.
fn to_number(value: &Value, policy: ConversionPolicy) -> Option<(f64, Conversion)> {
    match value {
        Value::Number(n) => Some((*n, Conversion::identity())),
        _ if !is_loose(policy) => None,
        Value::Bool(b) => Some((if *b { 1.0 } else { 0.0 }, coercion())),
        Value::String(s) => parse_number(s).map(|n| (n, coercion())),
        Value::BigInt(b) => Some((
            WideInt::from_bigint(b).map(|w| w.to_f64()).unwrap_or(f64::NAN),
            Conversion::new(ConversionKind::Numeric, Conversion::COST_PRIMITIVE_NARROWING),
        )),
        _ => None,
    }
}

pub(super) fn to_float(
    value: &Value,
    bits: u8,
    policy: ConversionPolicy,
) -> Option<(f64, Conversion)> {
    let (n, conversion) = to_number(value, policy)?;
    let n = if bits == 32 { n as f32 as f64 } else { n };
    Some((n, conversion))
}

fn int_range(bits: u8, signed: bool) -> (f64, f64) {
    if signed {
        let max = (1i64 << (bits - 1)) - 1;
        (-(max as f64) - 1.0, max as f64)
    } else {
        (0.0, ((1u64 << bits) - 1) as f64)
    }
}

/// Whether a native integer result fits the declared width.
pub(super) fn fits_int(n: i64, bits: u8, signed: bool) -> bool {
    let (min, max) = int_range(bits, signed);
    (min..=max).contains(&(n as f64))
}

/// Integers up to 32 bits.
pub(super) fn to_int(
    value: &Value,
    bits: u8,
    signed: bool,
    policy: ConversionPolicy,
    type_name: &str,
) -> Result<(i64, Conversion)> {
    let mismatch = || BindError::type_mismatch(type_name, value.type_name());
    let (mut n, mut conversion) = to_number(value, policy).ok_or_else(mismatch)?;
    if !n.is_finite() {
        return Err(BindError::type_mismatch(type_name, format_number(n)));
    }
    if n.fract() != 0.0 {
        if !is_loose(policy) {
            return Err(BindError::type_mismatch(type_name, "fractional number"));
        }
        n = n.trunc();
        if conversion.cost < Conversion::COST_FLOAT_TO_INT {
            conversion = Conversion::new(ConversionKind::Numeric, Conversion::COST_FLOAT_TO_INT);
        }
    }
    let (min, max) = int_range(bits, signed);
    if n < min || n > max {
        return Err(BindError::type_mismatch(
            type_name,
            format!("out of range value {}", format_number(n)),
        ));
    }
    Ok((n as i64, conversion))
}

/// 64-bit integers, without passing through a double when the source is a
/// big integer or an `Int64` object.
pub(super) fn to_wide(
    state: &State,
    value: &Value,
    signed: bool,
    policy: ConversionPolicy,
    type_name: &str,
) -> Result<(WideInt, Conversion)> {
    let mismatch = || BindError::type_mismatch(type_name, value.type_name());
    let out_of_range = |shown: String| {
        BindError::type_mismatch(type_name, format!("out of range value {}", shown))
    };

    let (wide, conversion) = match value {
        Value::Number(n) if n.fract() == 0.0 || !n.is_finite() => {
            let wide = WideInt::from_f64(*n).ok_or_else(|| out_of_range(format_number(*n)))?;
            (wide, Conversion::identity())
        }
        Value::Number(n) if is_loose(policy) => {
            let wide = WideInt::from_f64(n.trunc()).ok_or_else(|| out_of_range(format_number(*n)))?;
            (wide, Conversion::new(ConversionKind::Numeric, Conversion::COST_FLOAT_TO_INT))
        }
        Value::Number(_) => return Err(BindError::type_mismatch(type_name, "fractional number")),
        Value::BigInt(b) => {
            let wide = WideInt::from_bigint(b).ok_or_else(|| out_of_range(b.to_string()))?;
            (wide, Conversion::identity())
        }
        Value::Object(_) => (
            int64_parts(state, value).ok_or_else(mismatch)?,
            Conversion::identity(),
        ),
        Value::String(s) if is_loose(policy) => {
            let parsed: BigInt = s.trim().parse().map_err(|_| mismatch())?;
            let wide =
                WideInt::from_bigint(&parsed).ok_or_else(|| out_of_range(parsed.to_string()))?;
            (wide, coercion())
        }
        Value::Bool(b) if is_loose(policy) => (WideInt::from_u64(u64::from(*b)), coercion()),
        _ => return Err(mismatch()),
    };

    let in_range = if signed {
        wide.to_i64().is_some()
    } else {
        wide.to_u64().is_some()
    };
    if !in_range {
        return Err(out_of_range(wide.to_string()));
    }
    Ok((wide, conversion))
}

/// Read `lo`, `hi` and `negative` from an `Int64` object, through the bound
/// extractor when there is one.
fn int64_parts(state: &State, value: &Value) -> Option<WideInt> {
    let extracted = match state.binding(INT64_BINDING) {
        Some(Binding::Value(factory)) => factory.extract(value),
        _ => None,
    };
    let parts = match extracted {
        Some(parts) => parts?,
        None => vec![
            value.field("lo")?.clone(),
            value.field("hi")?.clone(),
            value.field("negative").cloned().unwrap_or(Value::Bool(false)),
        ],
    };
    let [lo, hi, negative] = parts.as_slice() else {
        return None;
    };
    let word = |v: &Value| {
        v.as_number()
            .filter(|n| n.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(n))
            .map(|n| n as u32)
    };
    Some(WideInt::from_parts(word(lo)?, word(hi)?, negative.as_bool()?))
}

pub(super) fn to_string(value: &Value, policy: ConversionPolicy) -> Option<(String, Conversion)> {
    let to_string = Conversion::new(ConversionKind::Coercion, Conversion::COST_TO_STRING);
    match value {
        Value::String(s) => Some((s.clone(), Conversion::identity())),
        _ if !is_loose(policy) => None,
        Value::Number(n) => Some((format_number(*n), to_string)),
        Value::Bool(b) => Some((b.to_string(), to_string)),
        Value::BigInt(b) => Some((b.to_string(), to_string)),
        _ => None,
    }
}

/// 64-bit result: the bound `Int64` factory, else a number when exact, else a
/// big integer.
pub(super) fn wide_to_dynamic(state: &State, wide: WideInt) -> Result<Value> {
    if let Some(Binding::Value(factory)) = state.binding(INT64_BINDING) {
        let parts = [
            Value::Number(f64::from(wide.lo())),
            Value::Number(f64::from(wide.hi())),
            Value::Bool(wide.is_negative()),
        ];
        return factory
            .create(&parts)
            .map_err(|err| BindError::Callback { message: err.message });
    }
    if wide.is_safe() {
        Ok(Value::Number(wide.to_f64()))
    } else {
        Ok(Value::BigInt(wide.to_bigint()))
    }
}
