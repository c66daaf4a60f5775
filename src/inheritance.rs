//! Upcasts through the base graph.
//!
//! A proxy's [`ObjectRef`] records the allocated type, the path of base edges
//! already taken and the type it is viewed as. Casting to a base enumerates
//! every path from the view type up to the target and composes the
//! adjustments along it.
//!
//! # Shared Bases
//!
//! Paths that cross a virtual edge all land on the one shared subobject of the
//! allocated type, located through the allocated type's virtual base location
//! rather than through the path taken. Paths are therefore compared by the
//! subobject they reach: when they reach the same one the cast succeeds, when
//! they reach distinct non-virtual subobjects it is ambiguous.

use bindery_core::{BasePath, ObjectRef, TypeHash};
use bindery_registry::{BaseStep, Hierarchy, TypeRegistry};

use crate::error::BindError;

/// Why an upcast failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastFailure {
    /// The target is not the view type or one of its bases.
    Unrelated,
    /// The target is reachable through distinct subobjects.
    Ambiguous,
}

pub(crate) fn invalid_cast(registry: &TypeRegistry, from: TypeHash, to: TypeHash) -> BindError {
    BindError::InvalidCast {
        from: registry.type_name(from),
        to: registry.type_name(to),
    }
}

/// View `object` as `target`.
pub(crate) fn upcast(
    registry: &TypeRegistry,
    object: &ObjectRef,
    target: TypeHash,
) -> Result<ObjectRef, CastFailure> {
    if object.view == target {
        return Ok(object.clone());
    }
    let hierarchy = registry.hierarchy();
    let paths = hierarchy.paths(object.view, target);
    if paths.is_empty() {
        return Err(CastFailure::Unrelated);
    }

    let mut resolved: Vec<(Vec<TypeHash>, BasePath)> = Vec::with_capacity(paths.len());
    for steps in &paths {
        let (key, path) = resolve_path(hierarchy, object, steps);
        if !resolved.iter().any(|(existing, _)| *existing == key) {
            resolved.push((key, path));
        }
    }

    match resolved.len() {
        1 => {
            let (_, path) = resolved.remove(0);
            Ok(ObjectRef {
                path,
                view: target,
                ..object.clone()
            })
        }
        _ => Err(CastFailure::Ambiguous),
    }
}

/// The full path from the allocated object for one edge sequence, and the key
/// identifying the subobject it reaches.
fn resolve_path(
    hierarchy: &Hierarchy,
    object: &ObjectRef,
    steps: &[BaseStep],
) -> (Vec<TypeHash>, BasePath) {
    if let Some(i) = steps.iter().rposition(|step| step.is_virtual)
        && let Some(location) = hierarchy.virtual_location(object.object_type, steps[i].base)
    {
        let mut path = BasePath::root();
        path.push(steps[i].base, location.clone());
        for step in &steps[i + 1..] {
            path.push(step.base, step.adjustment.clone());
        }
        // EMPTY marks a key rooted at a shared subobject
        let mut key = vec![TypeHash::EMPTY];
        key.extend_from_slice(path.nodes());
        return (key, path);
    }

    let mut tail = BasePath::root();
    for step in steps {
        tail.push(step.base, step.adjustment.clone());
    }
    let path = object.path.join(&tail);
    (path.nodes().to_vec(), path)
}

/// Whether an object viewed as `view` is an instance of `class`.
pub(crate) fn instance_of(registry: &TypeRegistry, view: TypeHash, class: TypeHash) -> bool {
    registry.is_subtype(view, class)
}
