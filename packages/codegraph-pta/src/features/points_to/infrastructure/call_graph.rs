//! Context-sensitive call graph
//!
//! Tracks reachable methods (with and without context) and call edges. All
//! additions are idempotent and nothing is ever removed.

use crate::features::points_to::domain::{CSCallSite, CSMethod, CallEdge, InvokeId, MethodId};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Default)]
pub struct CallGraph {
    reachable_methods: Vec<MethodId>,
    reachable_set: FxHashSet<MethodId>,
    reachable_cs: FxHashSet<CSMethod>,
    edges: Vec<CallEdge>,
    edge_set: FxHashSet<CallEdge>,
    by_call_site: FxHashMap<CSCallSite, Vec<usize>>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time `method` becomes reachable in any context
    pub fn add_reachable_method(&mut self, method: MethodId) -> bool {
        if self.reachable_set.insert(method) {
            self.reachable_methods.push(method);
            true
        } else {
            false
        }
    }

    /// Returns `true` the first time `(context, method)` becomes reachable
    pub fn add_reachable(&mut self, method: CSMethod) -> bool {
        self.reachable_cs.insert(method)
    }

    pub fn is_reachable(&self, method: MethodId) -> bool {
        self.reachable_set.contains(&method)
    }

    pub fn is_cs_reachable(&self, method: CSMethod) -> bool {
        self.reachable_cs.contains(&method)
    }

    /// Reachable methods in discovery order
    pub fn reachable_methods(&self) -> &[MethodId] {
        &self.reachable_methods
    }

    pub fn cs_method_count(&self) -> usize {
        self.reachable_cs.len()
    }

    /// Returns `true` if the edge is new
    pub fn add_edge(&mut self, edge: CallEdge) -> bool {
        if !self.edge_set.insert(edge.clone()) {
            return false;
        }
        self.by_call_site
            .entry(edge.call_site)
            .or_default()
            .push(self.edges.len());
        self.edges.push(edge);
        true
    }

    pub fn edges(&self) -> &[CallEdge] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges_out_of(&self, call_site: CSCallSite) -> impl Iterator<Item = &CallEdge> {
        self.by_call_site
            .get(&call_site)
            .into_iter()
            .flatten()
            .map(|i| &self.edges[*i])
    }

    /// Callees of `invoke` in any context, deduplicated, in edge order
    pub fn callees_of(&self, invoke: InvokeId) -> Vec<MethodId> {
        let mut seen = FxHashSet::default();
        self.edges
            .iter()
            .filter(|e| e.call_site.invoke == invoke)
            .map(|e| e.callee.method)
            .filter(|m| seen.insert(*m))
            .collect()
    }
}
