//! Dependency graph between nodes.
//!
//! An edge `from -> to` means evaluating `from` consulted `to`. Edges are
//! stored in both directions: forward for inspecting what a node used,
//! reverse for finding everything that must be recomputed when a node
//! changes.
//!
//! Reverse adjacency uses ordered sets so transitive walks visit nodes in a
//! deterministic order.
//!
//! A node can be evaluated in several scopes during one pass, for instance a
//! symbol shared by two declarations. Edge sets are stamped with the pass
//! that committed them: the first commit of a pass replaces the old set, and
//! later commits in the same pass add to it.

use std::collections::{BTreeSet, VecDeque};

use garden_ir::NodeId;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// Why one node depends on another.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// The target is a child of the source.
    Structural,
    /// The source is a symbol that resolved to the target.
    Symbolic,
}

#[derive(Default)]
struct GraphInner {
    forward: FxHashMap<NodeId, Vec<(NodeId, EdgeKind)>>,
    reverse: FxHashMap<NodeId, BTreeSet<NodeId>>,
    /// Pass that last committed each node's outgoing edges.
    stamps: FxHashMap<NodeId, u64>,
}

impl GraphInner {
    fn unlink_outgoing(&mut self, from: NodeId) -> Option<Vec<(NodeId, EdgeKind)>> {
        let old = self.forward.remove(&from)?;
        for (to, _) in &old {
            if let Some(consumers) = self.reverse.get_mut(to) {
                consumers.remove(&from);
                if consumers.is_empty() {
                    self.reverse.remove(to);
                }
            }
        }
        Some(old)
    }
}

/// Thread-safe bidirectional dependency graph.
#[derive(Default)]
pub struct DependencyGraph {
    inner: RwLock<GraphInner>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one edge, keeping existing edges of `from`.
    pub fn record_edge(&self, from: NodeId, to: NodeId, kind: EdgeKind) {
        let mut inner = self.inner.write();
        let edges = inner.forward.entry(from).or_default();
        if !edges.contains(&(to, kind)) {
            edges.push((to, kind));
        }
        inner.reverse.entry(to).or_default().insert(from);
    }

    /// Record the outgoing edges of `from` as consulted during `pass`.
    ///
    /// The first commit for `from` in a pass replaces its previous edges;
    /// later commits in the same pass merge into them. Readers never observe
    /// a mix of old and new edges.
    pub fn commit(
        &self,
        from: NodeId,
        pass: u64,
        edges: impl IntoIterator<Item = (NodeId, EdgeKind)>,
    ) {
        let mut inner = self.inner.write();
        let mut merged = if inner.stamps.insert(from, pass) == Some(pass) {
            inner.forward.remove(&from).unwrap_or_default()
        } else {
            inner.unlink_outgoing(from);
            Vec::new()
        };
        for edge in edges {
            if !merged.contains(&edge) {
                merged.push(edge);
            }
        }

        for (to, _) in &merged {
            inner.reverse.entry(*to).or_default().insert(from);
        }
        if !merged.is_empty() {
            inner.forward.insert(from, merged);
        }
    }

    /// Nodes with an edge into `id`.
    pub fn dependents_of(&self, id: NodeId) -> BTreeSet<NodeId> {
        self.inner
            .read()
            .reverse
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    /// Outgoing edges of `id`, in the order they were consulted.
    pub fn dependencies_of(&self, id: NodeId) -> Vec<(NodeId, EdgeKind)> {
        self.inner
            .read()
            .forward
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    /// Every node that transitively depends on `seed`, breadth first.
    ///
    /// The seed itself is not included. Each node appears once even when
    /// reachable along several paths, and cycles terminate.
    pub fn mark_dirty_transitive(&self, seed: NodeId) -> Vec<NodeId> {
        let inner = self.inner.read();
        let mut visited = FxHashSet::default();
        visited.insert(seed);
        let mut queue = VecDeque::from([seed]);
        let mut dirty = Vec::new();

        while let Some(id) = queue.pop_front() {
            let Some(consumers) = inner.reverse.get(&id) else {
                continue;
            };
            for &consumer in consumers {
                if visited.insert(consumer) {
                    dirty.push(consumer);
                    queue.push_back(consumer);
                }
            }
        }
        dirty
    }

    /// Drop `id` and every edge touching it.
    pub fn remove_node(&self, id: NodeId) {
        let mut inner = self.inner.write();
        inner.unlink_outgoing(id);
        inner.stamps.remove(&id);
        if let Some(consumers) = inner.reverse.remove(&id) {
            for consumer in consumers {
                if let Some(edges) = inner.forward.get_mut(&consumer) {
                    edges.retain(|(to, _)| *to != id);
                    if edges.is_empty() {
                        inner.forward.remove(&consumer);
                    }
                }
            }
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.forward.clear();
        inner.reverse.clear();
        inner.stamps.clear();
    }

    pub fn edge_count(&self) -> usize {
        self.inner.read().forward.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests;
