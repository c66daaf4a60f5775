//! Value type descriptor entry.

use bindery_core::{TypeHash, TypeSpec};

/// Field layout of a plain native value type.
///
/// Values of this type are copied field by field in both directions; they
/// have no identity and no lifetime on the dynamic side.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTypeDescriptor {
    pub name: String,
    pub type_hash: TypeHash,
    /// Fields in declaration order; this is also the factory argument order.
    pub fields: Vec<(String, TypeSpec)>,
}

impl ValueTypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            type_hash: TypeHash::from_name(&name),
            name,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, spec: TypeSpec) -> Self {
        self.fields.push((name.into(), spec));
        self
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }
}
