//! Wait-for graph rebuilt from scratch after every state change.
//!
//! An edge P → Q exists iff P still needs units of some kind that is fully
//! exhausted in the pool while Q holds units of that kind. A kind with free
//! units never produces an edge: the request can still be served from the
//! pool. The graph is a pure view of (pool, registry), never patched
//! incrementally.

use crate::process::{ProcessId, ProcessRegistry};
use crate::resources::ResourcePool;

/// A "waiting on" dependency between two processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WaitEdge {
    pub waiting: ProcessId,
    pub held_by: ProcessId,
}

/// Directed wait-for graph over pending processes.
///
/// Edges are deduplicated per (waiting, held_by) pair and sorted, so two
/// rebuilds from identical state compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitGraph {
    edges: Vec<WaitEdge>,
}

impl WaitGraph {
    /// Build a graph from raw edges (sorted and deduplicated).
    pub fn from_edges(edges: impl IntoIterator<Item = WaitEdge>) -> Self {
        let mut edges: Vec<WaitEdge> = edges.into_iter().collect();
        edges.sort_unstable();
        edges.dedup();
        Self { edges }
    }

    /// Rebuild the full edge set from current pool and registry state.
    pub fn rebuild(pool: &ResourcePool, registry: &ProcessRegistry) -> Self {
        let mut edges = Vec::new();
        for waiting in registry.pending() {
            for (kind, _needed) in waiting.outstanding().nonzero() {
                if !pool.is_exhausted(kind) {
                    continue;
                }
                for holder in registry.pending() {
                    if holder.id != waiting.id && holder.held.get(kind) > 0 {
                        edges.push(WaitEdge {
                            waiting: waiting.id,
                            held_by: holder.id,
                        });
                    }
                }
            }
        }
        Self::from_edges(edges)
    }

    pub fn edges(&self) -> &[WaitEdge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Every process appearing in any edge, ascending and deduplicated.
    pub fn nodes(&self) -> Vec<ProcessId> {
        let mut nodes: Vec<ProcessId> = self
            .edges
            .iter()
            .flat_map(|e| [e.waiting, e.held_by])
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }

    /// Processes that `id` is waiting on, ascending.
    pub fn successors(&self, id: ProcessId) -> impl Iterator<Item = ProcessId> + '_ {
        self.edges
            .iter()
            .filter(move |e| e.waiting == id)
            .map(|e| e.held_by)
    }
}
