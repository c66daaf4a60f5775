//! Type registry for the bindery runtime.
//!
//! Holds every type, free function, class and value type exposed across the
//! boundary, plus the inheritance graph between classes. Built once, in
//! dependency order, then shared read-only by the runtime.

mod entries;
mod hierarchy;
mod registry;

pub use entries::{
    BoundFunction, ClassDescriptor, OverloadCandidate, PropertyDescriptor, TypeDescriptor,
    ValueTypeDescriptor,
};
pub use hierarchy::{BaseEdge, BaseStep, Hierarchy};
pub use registry::TypeRegistry;
