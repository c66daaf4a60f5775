//! Type descriptor entry.

use bindery_core::{ConversionPolicy, TypeHash, TypeKind, primitives};

/// Registry entry identifying a native type.
///
/// Immutable once registered.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// Display name (`int32`, `vector<string>`, `Coord`).
    pub name: String,
    /// Identity, derived from the name for named types.
    pub type_hash: TypeHash,
    pub kind: TypeKind,
    /// Default policy for conversions into this type.
    pub policy: Option<ConversionPolicy>,
    /// Null converts to this type without a nullable declaration.
    pub nullable: bool,
}

impl TypeDescriptor {
    /// Create a descriptor whose hash is derived from `name`.
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        let name = name.into();
        let type_hash = TypeHash::from_name(&name);
        Self::with_hash(name, type_hash, kind)
    }

    /// Create a descriptor with an explicit hash (derived types).
    pub fn with_hash(name: impl Into<String>, type_hash: TypeHash, kind: TypeKind) -> Self {
        let nullable = matches!(kind, TypeKind::CString);
        Self {
            name: name.into(),
            type_hash,
            kind,
            policy: None,
            nullable,
        }
    }

    /// A class type.
    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Class)
    }

    /// A plain value type.
    pub fn value(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Value)
    }

    // === Builder Methods ===

    pub fn with_policy(mut self, policy: ConversionPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Set whether null converts without a nullable declaration.
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    // === Query Methods ===

    pub fn is_class(&self) -> bool {
        matches!(self.kind, TypeKind::Class)
    }

    pub fn is_value(&self) -> bool {
        matches!(self.kind, TypeKind::Value)
    }

    /// The built-in primitive catalog.
    pub fn primitives() -> Vec<TypeDescriptor> {
        let int = |name: &str, hash, bits, signed| {
            TypeDescriptor::with_hash(name, hash, TypeKind::Int { bits, signed })
        };
        vec![
            TypeDescriptor::with_hash("void", primitives::VOID, TypeKind::Void),
            TypeDescriptor::with_hash("bool", primitives::BOOL, TypeKind::Bool),
            int("int8", primitives::INT8, 8, true),
            int("int16", primitives::INT16, 16, true),
            int("int32", primitives::INT32, 32, true),
            int("int64", primitives::INT64, 64, true),
            int("uint8", primitives::UINT8, 8, false),
            int("uint16", primitives::UINT16, 16, false),
            int("uint32", primitives::UINT32, 32, false),
            int("uint64", primitives::UINT64, 64, false),
            TypeDescriptor::with_hash("float32", primitives::FLOAT32, TypeKind::Float { bits: 32 }),
            TypeDescriptor::with_hash("float64", primitives::FLOAT64, TypeKind::Float { bits: 64 }),
            TypeDescriptor::with_hash("string", primitives::STRING, TypeKind::String),
            TypeDescriptor::with_hash("cstring", primitives::CSTRING, TypeKind::CString),
            TypeDescriptor::with_hash("buffer", primitives::BUFFER, TypeKind::Buffer),
        ]
    }
}
