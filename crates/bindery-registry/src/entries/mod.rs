//! Registry entry types.
//!
//! - [`TypeDescriptor`] - identity, kind and conversion defaults of any type
//! - [`ClassDescriptor`] - members of a class type
//! - [`BoundFunction`] / [`OverloadCandidate`] - named entry points
//! - [`PropertyDescriptor`] - getter/setter pairs
//! - [`ValueTypeDescriptor`] - field layout of a plain value type

mod class;
mod function;
mod type_entry;
mod value_type;

pub use class::{ClassDescriptor, PropertyDescriptor};
pub use function::{BoundFunction, OverloadCandidate};
pub use type_entry::TypeDescriptor;
pub use value_type::ValueTypeDescriptor;
