//! Content-addressed node store.
//!
//! Interning a node that already exists returns the existing id, which is how
//! structural sharing falls out: an edit re-interns the changed path from the
//! edited leaf to the root, and every untouched subtree keeps its id.

mod render;

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::identity::node_identity;
use crate::node::{Node, NodeId, NodeKind};
use crate::{Name, SharedInterner, Span, StringInterner};

/// Errors from node store lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("node {0} is not in the store")]
    NotFound(NodeId),
}

/// Shared, thread-safe storage for nodes keyed by their identity.
pub struct NodeStore {
    interner: SharedInterner,
    nodes: RwLock<FxHashMap<NodeId, Arc<Node>>>,
    /// Most recent source span each node was read at.
    spans: RwLock<FxHashMap<NodeId, Span>>,
    roots: RwLock<Vec<NodeId>>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::with_interner(SharedInterner::new())
    }

    pub fn with_interner(interner: SharedInterner) -> Self {
        NodeStore {
            interner,
            nodes: RwLock::new(FxHashMap::default()),
            spans: RwLock::new(FxHashMap::default()),
            roots: RwLock::new(Vec::new()),
        }
    }

    #[inline]
    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    pub fn shared_interner(&self) -> SharedInterner {
        self.interner.clone()
    }

    /// Intern a string through the store's interner.
    #[inline]
    pub fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    /// String for an interned name.
    #[inline]
    pub fn name_str(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    /// Intern a node, returning its identity.
    ///
    /// All children must already be in the store. Re-interning existing
    /// content returns the same id and only refreshes the recorded span.
    pub fn intern(
        &self,
        kind: NodeKind,
        children: &[NodeId],
        span: Span,
    ) -> Result<NodeId, StoreError> {
        let id = node_identity(&kind, children, &self.interner);
        {
            let mut nodes = self.nodes.write();
            if let Some(existing) = nodes.get(&id) {
                debug_assert_eq!(existing.kind, kind, "identity collision on {id}");
            } else {
                if let Some(missing) = children.iter().find(|c| !nodes.contains_key(c)) {
                    return Err(StoreError::NotFound(*missing));
                }
                nodes.insert(id, Arc::new(Node::new(kind, children)));
            }
        }
        if span != Span::DUMMY {
            self.spans.write().insert(id, span);
        }
        Ok(id)
    }

    /// Retrieve a node by identity.
    pub fn get(&self, id: NodeId) -> Result<Arc<Node>, StoreError> {
        self.nodes
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.read().contains_key(&id)
    }

    /// Span the node was most recently read at, if it came from source.
    pub fn span(&self, id: NodeId) -> Option<Span> {
        self.spans.read().get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    /// Replace the current set of top-level nodes.
    pub fn set_roots(&self, roots: &[NodeId]) {
        let mut guard = self.roots.write();
        guard.clear();
        guard.extend_from_slice(roots);
    }

    pub fn roots(&self) -> Vec<NodeId> {
        self.roots.read().clone()
    }

    /// Every node reachable through child links from `seeds`.
    ///
    /// Seeds that are not in the store are skipped.
    pub fn closure(&self, seeds: impl IntoIterator<Item = NodeId>) -> FxHashSet<NodeId> {
        let nodes = self.nodes.read();
        let mut seen = FxHashSet::default();
        let mut stack: Vec<NodeId> = seeds.into_iter().collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(node) = nodes.get(&id) {
                stack.extend(node.children.iter().copied());
            } else {
                seen.remove(&id);
            }
        }
        seen
    }

    /// Nodes reachable from the current roots.
    pub fn reachable(&self) -> FxHashSet<NodeId> {
        self.closure(self.roots())
    }

    /// Drop every node not in `keep`, returning how many were removed.
    ///
    /// `keep` must be closed under child links; use [`NodeStore::closure`].
    pub fn collect(&self, keep: &FxHashSet<NodeId>) -> usize {
        let mut nodes = self.nodes.write();
        let before = nodes.len();
        nodes.retain(|id, _| keep.contains(id));
        let removed = before - nodes.len();
        drop(nodes);
        if removed > 0 {
            self.spans.write().retain(|id, _| keep.contains(id));
        }
        removed
    }
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}
