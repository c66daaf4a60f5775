//! Base-subobject adjustment.
//!
//! Native objects are stored as their most-derived Rust type. Reaching a base
//! class means projecting from the derived value to the embedded base value,
//! which is what a pointer offset does in a systems language. An [`Adjustment`]
//! is one such projection (one base edge); a [`BasePath`] is the composition of
//! the edges the inheritance resolver chose, applied at access time.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::TypeHash;

type Projector = dyn for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync;

fn projector<F>(f: F) -> F
where
    F: for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any>,
{
    f
}

/// Projection from a derived object to one of its base subobjects.
#[derive(Clone)]
pub struct Adjustment {
    projector: Option<Arc<Projector>>,
}

impl Adjustment {
    /// The base lives at the start of the derived object: the same Rust value
    /// serves both types. Used for primary bases modelled by a single struct.
    pub fn identity() -> Self {
        Self { projector: None }
    }

    /// Project a `D` to its embedded `B`.
    ///
    /// ```
    /// use bindery_core::Adjustment;
    ///
    /// struct A { tag: i32 }
    /// struct B { a: A }
    ///
    /// let to_a = Adjustment::field(|b: &mut B| &mut b.a);
    /// # let _ = to_a;
    /// ```
    pub fn field<D: Any, B: Any>(project: fn(&mut D) -> &mut B) -> Self {
        let f = projector(move |obj: &mut dyn Any| {
            obj.downcast_mut::<D>().map(|d| project(d) as &mut dyn Any)
        });
        Self {
            projector: Some(Arc::new(f)),
        }
    }

    /// Arbitrary projection, for layouts `field` cannot express.
    pub fn custom<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync + 'static,
    {
        Self {
            projector: Some(Arc::new(f)),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.projector.is_none()
    }

    /// Apply to an object; `None` if the object is not of the expected type.
    pub fn apply<'a>(&self, obj: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        match &self.projector {
            None => Some(obj),
            Some(p) => p(obj),
        }
    }
}

impl fmt::Debug for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_identity() {
            write!(f, "Adjustment(identity)")
        } else {
            write!(f, "Adjustment(projection)")
        }
    }
}

/// A resolved chain of adjustments from an allocated object to a view type.
///
/// `nodes` records the types visited (starting after the allocated type), which
/// is what identifies the reached subobject.
#[derive(Clone, Default)]
pub struct BasePath {
    steps: Vec<Adjustment>,
    nodes: Vec<TypeHash>,
}

impl BasePath {
    /// The empty path: the view is the allocated object itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Extend the path by one edge to `base`.
    pub fn push(&mut self, base: TypeHash, adjustment: Adjustment) {
        self.nodes.push(base);
        self.steps.push(adjustment);
    }

    /// Append another path (used when a view is cast further).
    pub fn join(&self, other: &BasePath) -> BasePath {
        let mut joined = self.clone();
        joined.steps.extend(other.steps.iter().cloned());
        joined.nodes.extend(other.nodes.iter().copied());
        joined
    }

    /// Number of edges.
    pub fn depth(&self) -> usize {
        self.steps.len()
    }

    pub fn nodes(&self) -> &[TypeHash] {
        &self.nodes
    }

    /// Walk the path from the allocated object to the viewed subobject.
    pub fn project<'a>(&self, obj: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        let mut current = obj;
        for step in &self.steps {
            current = step.apply(current)?;
        }
        Some(current)
    }
}

impl fmt::Debug for BasePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.nodes.iter()).finish()
    }
}
