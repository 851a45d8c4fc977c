//! Evaluation cache.
//!
//! Maps a [`NodeId`] to the [`CacheEntry`] from its most recent evaluation.
//! An entry records everything needed to decide, without re-running the
//! node, whether its result still holds:
//!
//! - `reads`: every symbol the subtree resolved through a binding outside
//!   itself, with the node and generation it resolved to. The entry is valid
//!   in an environment only if each read resolves to the same node at the
//!   same generation there.
//! - `expiry`: the tightest effect policy anywhere in the subtree.
//! - `effectful`: whether any effect ran in the subtree. Such results
//!   depend on the outside world and are never persisted.
//!
//! Generations implement early cutoff: a recomputation that produces an
//! equal result keeps the previous generation, so readers of the node stay
//! valid.
//!
//! Storage is a `DashMap`, so concurrent readers and writers of different
//! keys do not contend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use garden_ir::{Name, NodeId};
use rustc_hash::{FxBuildHasher, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::environment::Environment;
use crate::errors::EvalResult;
use crate::graph::EdgeKind;

/// Version stamp of a cached result.
///
/// Stamps come from one monotonically increasing counter per cache, so a
/// stamp seen by a reader identifies one specific result.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Generation(u64);

impl Generation {
    /// Stamp of something that has no result yet.
    pub const NONE: Generation = Generation(0);

    #[inline]
    pub const fn new(raw: u64) -> Self {
        Generation(raw)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// A node consulted while evaluating another.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub node: NodeId,
    pub kind: EdgeKind,
    /// Generation of `node`'s result when it was consulted.
    pub generation: Generation,
}

/// A name resolved through the environment during evaluation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolRead {
    /// Rebuilt from `symbol` when an entry is loaded from persistence.
    #[serde(skip)]
    pub name: Name,
    /// Symbol node that performed the read.
    pub symbol: NodeId,
    /// Node the name resolved to, or `None` if it was unbound.
    pub target: Option<NodeId>,
    pub generation: Generation,
}

impl SymbolRead {
    /// Whether `env` resolves this read the same way it was resolved before.
    pub fn holds_in(&self, env: &Environment) -> bool {
        match env.lookup(self.name) {
            None => self.target.is_none(),
            Some(binding) => {
                self.target == Some(binding.target) && self.generation == binding.generation()
            }
        }
    }
}

/// When a cached result stops being trustworthy on its own.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Expiry {
    /// Valid until invalidated.
    #[default]
    Never,
    /// Valid until the instant passes.
    At(Instant),
    /// Never reused.
    Always,
}

impl Expiry {
    /// The stricter of two expiries.
    #[must_use]
    pub fn min(self, other: Expiry) -> Expiry {
        match (self, other) {
            (Expiry::Always, _) | (_, Expiry::Always) => Expiry::Always,
            (Expiry::At(a), Expiry::At(b)) => Expiry::At(a.min(b)),
            (Expiry::At(a), Expiry::Never) | (Expiry::Never, Expiry::At(a)) => Expiry::At(a),
            (Expiry::Never, Expiry::Never) => Expiry::Never,
        }
    }

    pub fn is_expired(self, now: Instant) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::At(deadline) => now >= deadline,
            Expiry::Always => true,
        }
    }
}

/// The memoized outcome of one node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub result: EvalResult,
    /// Nodes consulted, in the order they were consulted.
    pub deps: Vec<Dependency>,
    /// Free reads of the whole subtree. Names bound inside the subtree are
    /// not listed.
    pub reads: Vec<SymbolRead>,
    pub generation: Generation,
    #[serde(skip)]
    pub expiry: Expiry,
    /// An effect was performed somewhere in the subtree.
    #[serde(skip)]
    pub effectful: bool,
    /// Last pass in which the node was reachable from a root.
    #[serde(skip)]
    pub last_seen: u64,
}

impl CacheEntry {
    /// Whether the entry can stand in for evaluating its node in `env` at `now`.
    pub fn is_valid_in(&self, env: &Environment, now: Instant) -> bool {
        !self.expiry.is_expired(now) && self.reads.iter().all(|read| read.holds_in(env))
    }

    /// Only pure results are saved: a later process cannot tell whether
    /// the outside world an effect observed has changed since.
    pub fn is_persistable(&self) -> bool {
        !self.effectful && self.expiry == Expiry::Never
    }
}

/// Concurrent map from node identity to its latest evaluation.
pub struct EvalCache {
    entries: DashMap<NodeId, CacheEntry, FxBuildHasher>,
    next_generation: AtomicU64,
}

impl EvalCache {
    pub fn new() -> Self {
        EvalCache {
            entries: DashMap::with_hasher(FxBuildHasher),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Snapshot of the entry for `id`.
    pub fn lookup(&self, id: NodeId) -> Option<CacheEntry> {
        self.entries.get(&id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Store the entry for `id`, replacing any previous one.
    pub fn record(&self, id: NodeId, entry: CacheEntry) {
        tracing::trace!(node = %id, generation = entry.generation.get(), "record");
        self.entries.insert(id, entry);
    }

    /// Remove the entry for `id`. Returns whether one was present.
    pub fn invalidate(&self, id: NodeId) -> bool {
        let removed = self.entries.remove(&id).is_some();
        if removed {
            tracing::trace!(node = %id, "invalidate");
        }
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// A fresh generation, never handed out before by this cache.
    pub fn next_generation(&self) -> Generation {
        Generation(self.next_generation.fetch_add(1, Ordering::Relaxed))
    }

    /// Make sure future generations are above `floor`.
    pub fn advance_past(&self, floor: Generation) {
        self.next_generation
            .fetch_max(floor.0.saturating_add(1), Ordering::Relaxed);
    }

    /// Highest generation handed out so far.
    pub fn high_water(&self) -> Generation {
        Generation(self.next_generation.load(Ordering::Relaxed).saturating_sub(1))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<NodeId> {
        self.entries.iter().map(|e| *e.key()).collect()
    }

    /// Stamp every cached node in `reachable` as seen in `pass`, then evict
    /// entries unseen for more than `retention` passes.
    pub fn sweep(&self, reachable: &FxHashSet<NodeId>, pass: u64, retention: u64) -> Vec<NodeId> {
        let mut evicted = Vec::new();
        self.entries.retain(|id, entry| {
            if reachable.contains(id) {
                entry.last_seen = pass;
                return true;
            }
            let keep = entry.last_seen.saturating_add(retention) >= pass;
            if !keep {
                evicted.push(*id);
            }
            keep
        });
        evicted.sort_unstable();
        evicted
    }

    /// Nodes a live entry refers to: its own key plus every dependency and
    /// read target. These must stay in the node store.
    pub fn pinned_nodes(&self) -> Vec<NodeId> {
        let mut pinned = Vec::new();
        for entry in &self.entries {
            pinned.push(*entry.key());
            pinned.extend(entry.deps.iter().map(|d| d.node));
            pinned.extend(entry.reads.iter().map(|r| r.symbol));
            pinned.extend(entry.reads.iter().filter_map(|r| r.target));
        }
        pinned
    }
}

impl Default for EvalCache {
    fn default() -> Self {
        Self::new()
    }
}
