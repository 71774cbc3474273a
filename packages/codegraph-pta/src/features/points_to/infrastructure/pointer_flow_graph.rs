//! Pointer flow graph
//!
//! Edges are only ever added. Adding an edge that already exists (same
//! endpoints, kind and filter) is a no-op.

use crate::features::points_to::domain::{Pointer, PointerFlowEdge};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Default)]
pub struct PointerFlowGraph {
    successors: FxHashMap<Pointer, Vec<PointerFlowEdge>>,
    edges: FxHashSet<PointerFlowEdge>,
}

impl PointerFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the edge is new
    pub fn add_edge(&mut self, edge: PointerFlowEdge) -> bool {
        if !self.edges.insert(edge.clone()) {
            return false;
        }
        self.successors.entry(edge.source).or_default().push(edge);
        true
    }

    pub fn outgoing(&self, pointer: &Pointer) -> &[PointerFlowEdge] {
        self.successors
            .get(pointer)
            .map(|edges| edges.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, edge: &PointerFlowEdge) -> bool {
        self.edges.contains(edge)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = &PointerFlowEdge> {
        self.successors.values().flatten()
    }
}
