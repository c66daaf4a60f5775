//! Base graph - the static inheritance DAG of class types.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: class `TypeHash`es
//! - Edges: derived -> base, carrying the [`Adjustment`] that projects a
//!   derived object to the base subobject and whether the base is shared
//!   (virtual)
//!
//! Shared bases resolve to one subobject per most-derived object. Where that
//! subobject lives is recorded per most-derived type with
//! [`Hierarchy::set_virtual_location`]; without an entry the edge's own
//! adjustment is used, which is right when the derived type is itself the
//! most-derived one.

use bindery_core::{Adjustment, TypeHash};
use petgraph::Direction;
use petgraph::algo::{all_simple_paths, has_path_connecting};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;

/// A derived -> base edge.
#[derive(Debug, Clone)]
pub struct BaseEdge {
    pub adjustment: Adjustment,
    pub is_virtual: bool,
}

/// One edge along a path from a derived type up to a base.
#[derive(Debug, Clone)]
pub struct BaseStep {
    /// The base reached by this step.
    pub base: TypeHash,
    pub adjustment: Adjustment,
    pub is_virtual: bool,
}

/// The inheritance graph.
#[derive(Default)]
pub struct Hierarchy {
    graph: DiGraph<TypeHash, BaseEdge>,
    nodes: FxHashMap<TypeHash, NodeIndex>,
    virtual_locations: FxHashMap<(TypeHash, TypeHash), Adjustment>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, ty: TypeHash) -> NodeIndex {
        if let Some(&index) = self.nodes.get(&ty) {
            return index;
        }
        let index = self.graph.add_node(ty);
        self.nodes.insert(ty, index);
        index
    }

    /// Whether an edge `derived -> base` already exists.
    pub fn has_edge(&self, derived: TypeHash, base: TypeHash) -> bool {
        match (self.nodes.get(&derived), self.nodes.get(&base)) {
            (Some(&d), Some(&b)) => self.graph.find_edge(d, b).is_some(),
            _ => false,
        }
    }

    /// Add a base edge.
    ///
    /// # Panics
    ///
    /// Panics if the edge would close a cycle. The base graph is declared by
    /// the binding tables, so a cycle is a defect in them, not a runtime
    /// condition.
    pub fn add_base(
        &mut self,
        derived: TypeHash,
        base: TypeHash,
        adjustment: Adjustment,
        is_virtual: bool,
    ) {
        let d = self.node(derived);
        let b = self.node(base);
        assert!(
            d != b && !has_path_connecting(&self.graph, b, d, None),
            "base edge {:?} -> {:?} would create an inheritance cycle",
            derived,
            base
        );
        self.graph.add_edge(d, b, BaseEdge { adjustment, is_virtual });
    }

    /// Record where the shared `base` subobject lives inside `most_derived`.
    pub fn set_virtual_location(
        &mut self,
        most_derived: TypeHash,
        base: TypeHash,
        adjustment: Adjustment,
    ) {
        self.virtual_locations.insert((most_derived, base), adjustment);
    }

    pub fn virtual_location(&self, most_derived: TypeHash, base: TypeHash) -> Option<&Adjustment> {
        self.virtual_locations.get(&(most_derived, base))
    }

    /// Whether `base` is a proper base of `derived`.
    pub fn is_base_of(&self, base: TypeHash, derived: TypeHash) -> bool {
        match (self.nodes.get(&derived), self.nodes.get(&base)) {
            (Some(&d), Some(&b)) => d != b && has_path_connecting(&self.graph, d, b, None),
            _ => false,
        }
    }

    /// Whether `target` is `ty` or one of its bases.
    pub fn reaches(&self, ty: TypeHash, target: TypeHash) -> bool {
        ty == target || self.is_base_of(target, ty)
    }

    /// Direct bases in declaration order.
    pub fn direct_bases(&self, ty: TypeHash) -> Vec<(TypeHash, bool)> {
        let Some(&n) = self.nodes.get(&ty) else {
            return Vec::new();
        };
        // petgraph yields the most recently added edge first
        let mut bases: Vec<_> = self
            .graph
            .edges_directed(n, Direction::Outgoing)
            .map(|e| (self.graph[e.target()], e.weight().is_virtual))
            .collect();
        bases.reverse();
        bases
    }

    /// Every path from `from` up to `to`, as edge sequences.
    ///
    /// Empty when `to` is not a base of `from`; a single empty path when they
    /// are the same type.
    pub fn paths(&self, from: TypeHash, to: TypeHash) -> Vec<Vec<BaseStep>> {
        if from == to {
            return vec![Vec::new()];
        }
        let (Some(&f), Some(&t)) = (self.nodes.get(&from), self.nodes.get(&to)) else {
            return Vec::new();
        };

        all_simple_paths::<Vec<NodeIndex>, _>(&self.graph, f, t, 0, None)
            .map(|nodes| {
                nodes
                    .windows(2)
                    .filter_map(|pair| {
                        let edge = self.graph.find_edge(pair[0], pair[1])?;
                        let weight = &self.graph[edge];
                        Some(BaseStep {
                            base: self.graph[pair[1]],
                            adjustment: weight.adjustment.clone(),
                            is_virtual: weight.is_virtual,
                        })
                    })
                    .collect()
            })
            .collect()
    }

    /// Number of edges on the shortest path from `from` up to `to`.
    pub fn distance(&self, from: TypeHash, to: TypeHash) -> Option<usize> {
        self.paths(from, to).iter().map(Vec::len).min()
    }
}

impl std::fmt::Debug for Hierarchy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hierarchy")
            .field("types", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .field("virtual_locations", &self.virtual_locations.len())
            .finish()
    }
}
