//! Conversion traits between Rust values and native slots.
//!
//! - [`FromNative`]: read a Rust value out of a [`Native`] argument
//! - [`IntoNative`]: turn a Rust value into a [`Native`] result
//!
//! These are the typed surface native targets use. They never coerce across
//! kinds (that is the runtime converter's job, before the target runs); they
//! only widen within a kind and range-check narrowing.
//!
//! ## Supported Types
//!
//! - Integers: `i8` through `i64`, `u8` through `u64` (range checked)
//! - Floats: `f32`, `f64`
//! - `bool`, `String`, `()`
//! - [`WideInt`], [`BufferView`], [`CallbackHandle`]
//! - `Option<T>` (null is `None`) and `Vec<T>`

use crate::{BufferView, CallbackHandle, ConversionError, Native, WideInt};

/// Extract a value from a native slot.
pub trait FromNative: Sized {
    fn from_native(native: &Native) -> Result<Self, ConversionError>;
}

/// Convert a value into a native slot.
pub trait IntoNative {
    fn into_native(self) -> Native;
}

fn mismatch(expected: &'static str, native: &Native) -> ConversionError {
    match native {
        Native::Null => ConversionError::NullValue { target_type: expected },
        _ => ConversionError::TypeMismatch {
            expected,
            actual: native.type_name(),
        },
    }
}

fn wide_of(native: &Native, expected: &'static str) -> Result<WideInt, ConversionError> {
    match native {
        Native::Int(v) => Ok(WideInt::from_i64(*v)),
        Native::Wide(w) => Ok(*w),
        _ => Err(mismatch(expected, native)),
    }
}

// ============================================================================
// Integer implementations
// ============================================================================

macro_rules! impl_native_int {
    ($($ty:ty),*) => {
        $(
            impl FromNative for $ty {
                fn from_native(native: &Native) -> Result<Self, ConversionError> {
                    let wide = wide_of(native, stringify!($ty))?;
                    let narrowed = if wide.is_negative() {
                        wide.to_i64().and_then(|v| <$ty>::try_from(v).ok())
                    } else {
                        <$ty>::try_from(wide.magnitude()).ok()
                    };
                    narrowed.ok_or_else(|| ConversionError::IntegerOverflow {
                        value: wide.to_string(),
                        target_type: stringify!($ty),
                    })
                }
            }
        )*
    };
}

impl_native_int!(i8, i16, i32, i64, u8, u16, u32, u64);

macro_rules! impl_into_native_narrow {
    ($($ty:ty),*) => {
        $(
            impl IntoNative for $ty {
                fn into_native(self) -> Native {
                    Native::Int(i64::from(self))
                }
            }
        )*
    };
}

impl_into_native_narrow!(i8, i16, i32, u8, u16, u32);

impl IntoNative for i64 {
    fn into_native(self) -> Native {
        Native::Wide(WideInt::from_i64(self))
    }
}

impl IntoNative for u64 {
    fn into_native(self) -> Native {
        Native::Wide(WideInt::from_u64(self))
    }
}

impl FromNative for WideInt {
    fn from_native(native: &Native) -> Result<Self, ConversionError> {
        wide_of(native, "int64")
    }
}

impl IntoNative for WideInt {
    fn into_native(self) -> Native {
        Native::Wide(self)
    }
}

// ============================================================================
// Float implementations
// ============================================================================

impl FromNative for f64 {
    fn from_native(native: &Native) -> Result<Self, ConversionError> {
        match native {
            Native::Float(v) => Ok(*v),
            Native::Int(v) => Ok(*v as f64),
            Native::Wide(w) => Ok(w.to_f64()),
            _ => Err(mismatch("float", native)),
        }
    }
}

impl FromNative for f32 {
    fn from_native(native: &Native) -> Result<Self, ConversionError> {
        f64::from_native(native).map(|v| v as f32)
    }
}

impl IntoNative for f64 {
    fn into_native(self) -> Native {
        Native::Float(self)
    }
}

impl IntoNative for f32 {
    fn into_native(self) -> Native {
        Native::Float(f64::from(self))
    }
}

// ============================================================================
// Other scalars
// ============================================================================

impl FromNative for bool {
    fn from_native(native: &Native) -> Result<Self, ConversionError> {
        match native {
            Native::Bool(b) => Ok(*b),
            _ => Err(mismatch("bool", native)),
        }
    }
}

impl IntoNative for bool {
    fn into_native(self) -> Native {
        Native::Bool(self)
    }
}

impl FromNative for String {
    fn from_native(native: &Native) -> Result<Self, ConversionError> {
        match native {
            Native::String(s) => Ok(s.clone()),
            _ => Err(mismatch("string", native)),
        }
    }
}

impl IntoNative for String {
    fn into_native(self) -> Native {
        Native::String(self)
    }
}

impl IntoNative for &str {
    fn into_native(self) -> Native {
        Native::String(self.to_string())
    }
}

impl FromNative for () {
    fn from_native(native: &Native) -> Result<Self, ConversionError> {
        match native {
            Native::Void | Native::Null => Ok(()),
            _ => Err(mismatch("void", native)),
        }
    }
}

impl IntoNative for () {
    fn into_native(self) -> Native {
        Native::Void
    }
}

impl FromNative for BufferView {
    fn from_native(native: &Native) -> Result<Self, ConversionError> {
        match native {
            Native::Bytes(view) => Ok(view.clone()),
            _ => Err(mismatch("buffer", native)),
        }
    }
}

impl IntoNative for BufferView {
    fn into_native(self) -> Native {
        Native::Bytes(self)
    }
}

impl FromNative for CallbackHandle {
    fn from_native(native: &Native) -> Result<Self, ConversionError> {
        match native {
            Native::Callback(handle) => Ok(handle.clone()),
            _ => Err(mismatch("callback", native)),
        }
    }
}

impl IntoNative for Native {
    fn into_native(self) -> Native {
        self
    }
}

// ============================================================================
// Containers
// ============================================================================

impl<T: FromNative> FromNative for Option<T> {
    fn from_native(native: &Native) -> Result<Self, ConversionError> {
        match native {
            Native::Null => Ok(None),
            other => T::from_native(other).map(Some),
        }
    }
}

impl<T: IntoNative> IntoNative for Option<T> {
    fn into_native(self) -> Native {
        match self {
            Some(v) => v.into_native(),
            None => Native::Null,
        }
    }
}

impl<T: FromNative> FromNative for Vec<T> {
    fn from_native(native: &Native) -> Result<Self, ConversionError> {
        match native {
            Native::Array(items) => items.iter().map(T::from_native).collect(),
            _ => Err(mismatch("array", native)),
        }
    }
}

impl<T: IntoNative> IntoNative for Vec<T> {
    fn into_native(self) -> Native {
        Native::Array(self.into_iter().map(IntoNative::into_native).collect())
    }
}
