//! Errors surfaced to dynamic callers.
//!
//! Every failure carries an [`ErrorKind`] so callers can branch on the
//! category without matching message text. Messages name the function, the
//! argument kinds and the candidate signatures where that helps.

use bindery_core::{ConversionError, NativeError, RegistrationError};
use thiserror::Error;

/// Result alias used across the runtime.
pub type Result<T> = std::result::Result<T, BindError>;

/// Category of a [`BindError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TypeMismatch,
    NullNotAllowed,
    LengthMismatch,
    AmbiguousOverload,
    NoMatchingOverload,
    InvalidCast,
    UseAfterFree,
    NativeError,
    CallbackError,
    UnknownType,
    UnknownMember,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("null is not allowed for {target}")]
    NullNotAllowed { target: String },

    #[error("length mismatch: expected {expected} elements, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("ambiguous call to {name}({}); candidates: {}", args.join(", "), candidates.join(", "))]
    AmbiguousOverload {
        name: String,
        args: Vec<String>,
        candidates: Vec<String>,
    },

    #[error("no matching overload for {name}({}); candidates: {}", args.join(", "), candidates.join(", "))]
    NoMatchingOverload {
        name: String,
        args: Vec<String>,
        candidates: Vec<String>,
    },

    #[error("invalid cast from {from} to {to}")]
    InvalidCast { from: String, to: String },

    #[error("use after free: {class} object has been released")]
    UseAfterFree { class: String },

    #[error("native error in {function}: {message}")]
    Native { function: String, message: String },

    #[error("callback error: {message}")]
    Callback { message: String },

    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("unknown member {name} of {owner}")]
    UnknownMember { owner: String, name: String },

    #[error("registration failed: {0}")]
    Registration(#[from] RegistrationError),
}

impl BindError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BindError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            BindError::NullNotAllowed { .. } => ErrorKind::NullNotAllowed,
            BindError::LengthMismatch { .. } => ErrorKind::LengthMismatch,
            BindError::AmbiguousOverload { .. } => ErrorKind::AmbiguousOverload,
            BindError::NoMatchingOverload { .. } => ErrorKind::NoMatchingOverload,
            BindError::InvalidCast { .. } => ErrorKind::InvalidCast,
            BindError::UseAfterFree { .. } => ErrorKind::UseAfterFree,
            BindError::Native { .. } => ErrorKind::NativeError,
            BindError::Callback { .. } => ErrorKind::CallbackError,
            BindError::UnknownType(_) => ErrorKind::UnknownType,
            BindError::UnknownMember { .. } => ErrorKind::UnknownMember,
            BindError::Registration(RegistrationError::UnknownType(_)) => ErrorKind::UnknownType,
            BindError::Registration(_) => ErrorKind::NativeError,
        }
    }

    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        BindError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn unknown_member(owner: impl Into<String>, name: impl Into<String>) -> Self {
        BindError::UnknownMember {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Map a failure reported by native code during `function`.
    pub fn from_native(function: &str, err: NativeError) -> Self {
        match err {
            NativeError::CallbackRaised { message } => BindError::Callback { message },
            NativeError::StaleHandle { .. } => BindError::UseAfterFree {
                class: format!("object passed to {}", function),
            },
            NativeError::Conversion(ConversionError::LengthMismatch { expected, actual }) => {
                BindError::LengthMismatch { expected, actual }
            }
            other => BindError::Native {
                function: function.to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl From<ConversionError> for BindError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::TypeMismatch { expected, actual } => {
                BindError::type_mismatch(expected, actual)
            }
            ConversionError::NullValue { target_type } => BindError::NullNotAllowed {
                target: target_type.to_string(),
            },
            ConversionError::IntegerOverflow { value, target_type } => {
                BindError::type_mismatch(target_type, format!("out of range value {}", value))
            }
            ConversionError::LengthMismatch { expected, actual } => {
                BindError::LengthMismatch { expected, actual }
            }
            ConversionError::Failed { message } => {
                BindError::type_mismatch("convertible value", message)
            }
        }
    }
}
