//! Declared types: what a parameter or result is, and how it converts.

use bitflags::bitflags;

use crate::{TypeHash, primitives};

/// Coercion regime for a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConversionPolicy {
    /// Numeric, string and boolean cross-coercion is attempted before failing.
    #[default]
    Loose,
    /// Only the value's native-compatible kind is accepted.
    Strict,
}

impl ConversionPolicy {
    /// Lower-case name used in messages and reflection output.
    pub fn as_str(self) -> &'static str {
        match self {
            ConversionPolicy::Loose => "loose",
            ConversionPolicy::Strict => "strict",
        }
    }
}

bitflags! {
    /// Modifiers on a declared parameter or result type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u8 {
        /// Null/undefined is accepted (and produced for null natives).
        const NULLABLE = 0x01;
        /// Points to a const object: non-const methods cannot be reached through it.
        const CONST = 0x02;
        /// A callback parameter that the native side keeps past the call.
        const RETAINED = 0x04;
    }
}

/// How a class-typed result relates to the object it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Ownership {
    /// A fresh object (constructor result or by-value return) owned by the new proxy.
    #[default]
    Owned,
    /// A reference-counted share of an existing object (smart pointer).
    Shared,
    /// A non-owning pointer or reference; the proxy never destroys the object.
    Borrowed,
}

/// A declared parameter or result type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeSpec {
    /// The registered type.
    pub type_hash: TypeHash,
    /// Nullability, constness, retention.
    pub flags: TypeFlags,
    /// Ownership of class-typed results; ignored for other kinds.
    pub ownership: Ownership,
    /// Parameter-level policy override.
    pub policy: Option<ConversionPolicy>,
}

impl TypeSpec {
    /// A plain, non-nullable type.
    pub const fn of(type_hash: TypeHash) -> Self {
        Self {
            type_hash,
            flags: TypeFlags::empty(),
            ownership: Ownership::Owned,
            policy: None,
        }
    }

    /// The `void` type.
    pub const fn void() -> Self {
        Self::of(primitives::VOID)
    }

    /// Accept null/undefined.
    pub fn nullable(mut self) -> Self {
        self.flags |= TypeFlags::NULLABLE;
        self
    }

    /// Mark as pointing to a const object.
    pub fn constant(mut self) -> Self {
        self.flags |= TypeFlags::CONST;
        self
    }

    /// Mark a callback parameter as retained past the call.
    pub fn retained(mut self) -> Self {
        self.flags |= TypeFlags::RETAINED;
        self
    }

    /// Non-owning pointer/reference result.
    pub fn borrowed(mut self) -> Self {
        self.ownership = Ownership::Borrowed;
        self
    }

    /// Reference-counted (smart pointer) result.
    pub fn shared(mut self) -> Self {
        self.ownership = Ownership::Shared;
        self
    }

    /// Force a policy for this parameter.
    pub fn with_policy(mut self, policy: ConversionPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn is_nullable(&self) -> bool {
        self.flags.contains(TypeFlags::NULLABLE)
    }

    pub fn is_const(&self) -> bool {
        self.flags.contains(TypeFlags::CONST)
    }

    pub fn is_retained(&self) -> bool {
        self.flags.contains(TypeFlags::RETAINED)
    }

    pub fn is_void(&self) -> bool {
        self.type_hash == primitives::VOID
    }
}

impl From<TypeHash> for TypeSpec {
    fn from(type_hash: TypeHash) -> Self {
        TypeSpec::of(type_hash)
    }
}

/// Signature of a dynamic-side function accepted as a callback.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallbackSignature {
    /// What native code passes in.
    pub params: Vec<TypeSpec>,
    /// What the dynamic function must return.
    pub ret: TypeSpec,
    /// Policy for converting the arguments and result; loose when unset.
    pub policy: Option<ConversionPolicy>,
}

impl CallbackSignature {
    pub fn new(params: Vec<TypeSpec>, ret: TypeSpec) -> Self {
        Self {
            params,
            ret,
            policy: None,
        }
    }

    pub fn with_policy(mut self, policy: ConversionPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Hash identifying this signature as a type.
    pub fn type_hash(&self) -> TypeHash {
        let mut args = Vec::with_capacity(self.params.len() + 1);
        args.push(self.ret.type_hash);
        args.extend(self.params.iter().map(|p| p.type_hash));
        TypeHash::from_template_instance(crate::templates::CALLBACK, &args)
    }
}

/// Shape of a registered type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Void,
    Bool,
    /// Integer of the given width. 64-bit integers travel as [`WideInt`](crate::WideInt).
    Int { bits: u8, signed: bool },
    Float { bits: u8 },
    /// Owned string.
    String,
    /// C string; nullable unless the declaration says otherwise.
    CString,
    /// Byte span aliasing dynamic-side storage.
    Buffer,
    /// Fixed-length array.
    Array { element: TypeHash, len: usize },
    /// Variable-length vector.
    Vector { element: TypeHash },
    /// Dynamic-side function invocable from native code.
    Callback(CallbackSignature),
    /// Class with identity and lifetime, exposed through proxies.
    Class,
    /// Plain value type, copied field by field.
    Value,
}

impl TypeKind {
    /// Whether this is an integer at least 64 bits wide.
    pub fn is_wide_int(&self) -> bool {
        matches!(self, TypeKind::Int { bits, .. } if *bits >= 64)
    }

    /// Short name for messages.
    pub fn describe(&self) -> &'static str {
        match self {
            TypeKind::Void => "void",
            TypeKind::Bool => "bool",
            TypeKind::Int { .. } => "integer",
            TypeKind::Float { .. } => "number",
            TypeKind::String | TypeKind::CString => "string",
            TypeKind::Buffer => "buffer",
            TypeKind::Array { .. } => "array",
            TypeKind::Vector { .. } => "vector",
            TypeKind::Callback(_) => "function",
            TypeKind::Class => "object",
            TypeKind::Value => "value object",
        }
    }
}
