//! Error types shared across the boundary.
//!
//! ```text
//! RegistrationError - building the registry (types, bases, functions, classes)
//! ConversionError   - extracting typed values from native slots
//! NativeError       - failures reported by (or while running) a native target
//! ```

use thiserror::Error;

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors that occur while populating the type registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    /// A referenced type has not been registered.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// A type with this name already exists.
    #[error("duplicate type: {0}")]
    DuplicateType(String),

    /// An entry point with this signature already exists.
    #[error("duplicate registration: {name} already registered as {kind}")]
    DuplicateRegistration {
        /// The name that was duplicated.
        name: String,
        /// What was already registered under it ("function", "method", ...).
        kind: String,
    },

    /// The registration is malformed.
    #[error("invalid declaration: {0}")]
    InvalidDeclaration(String),
}

// ============================================================================
// Conversion Errors
// ============================================================================

/// Errors converting a native slot into a Rust value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// The slot holds a different kind of value.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// A null slot was read as a non-optional type.
    #[error("null cannot be converted to {target_type}")]
    NullValue { target_type: &'static str },

    /// An integer does not fit the requested type.
    #[error("integer overflow: value {value} does not fit in {target_type}")]
    IntegerOverflow { value: String, target_type: &'static str },

    /// A fixed-length array had the wrong number of elements.
    #[error("length mismatch: expected {expected} elements, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Generic conversion failure.
    #[error("conversion failed: {message}")]
    Failed { message: String },
}

// ============================================================================
// Native Errors
// ============================================================================

/// Errors raised by, or while running, a native target.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NativeError {
    /// Error converting arguments or return values.
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// The receiver is missing or is not of the requested Rust type.
    #[error("invalid 'this' reference: {message}")]
    InvalidThis { message: String },

    /// Argument index out of bounds.
    #[error("argument index {index} out of bounds (function has {count} arguments)")]
    ArgumentIndexOutOfBounds { index: usize, count: usize },

    /// The object is already mutably borrowed by an enclosing native frame.
    #[error("object at index {index} is already in use by an enclosing call")]
    ObjectBorrowed { index: u32 },

    /// The object behind a handle has been destroyed.
    #[error("stale object handle: object at index {index} has been freed")]
    StaleHandle { index: u32 },

    /// A dynamic-side callback raised; the error is re-raised at the boundary.
    #[error("callback raised: {message}")]
    CallbackRaised { message: String },

    /// A callback handle was invoked after its call extent ended.
    #[error("callback invoked after the call that received it returned")]
    CallbackExpired,

    /// Failure reported by the native implementation.
    #[error("{message}")]
    Other { message: String },
}

impl NativeError {
    /// Create an "invalid this" error with a message.
    pub fn invalid_this(message: impl Into<String>) -> Self {
        NativeError::InvalidThis {
            message: message.into(),
        }
    }

    /// Create a native failure carrying the native-reported message.
    pub fn other(message: impl Into<String>) -> Self {
        NativeError::Other {
            message: message.into(),
        }
    }
}
