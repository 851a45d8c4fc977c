//! Pass driver.
//!
//! An [`Engine`] owns the cache, the dependency graph and the effect
//! registry, and evaluates successive versions of a program against them.
//! Each call to [`Engine::run_pass`] takes the program's top-level forms in
//! declaration order and:
//!
//! 1. compares the declarations with the previous pass and invalidates,
//!    through the reverse edges of the dependency graph, everything that
//!    consulted a declaration that changed or disappeared;
//! 2. evaluates each form in a root environment that grows one declaration
//!    at a time, so a form sees only the declarations before it;
//! 3. sweeps cache entries, nodes, and persisted entries that are no longer
//!    reachable.

mod report;

use std::collections::BTreeSet;
use std::sync::Arc;

use garden_ir::{Name, NodeId, NodeKind, NodeStore};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::cache::{CacheEntry, EvalCache};
use crate::cancel::CancelToken;
use crate::config::EngineConfig;
use crate::effects::{EffectHandler, EffectRegistry};
use crate::environment::{Binding, Environment};
use crate::errors::{EngineError, EvalResult};
use crate::evaluator::{Context, Evaluator, Interrupt};
use crate::graph::{DependencyGraph, EdgeKind};
use crate::persist::Persistence;

pub use report::{PassReport, RootOutcome};

/// Incremental evaluation engine.
pub struct Engine {
    store: Arc<NodeStore>,
    cache: EvalCache,
    graph: DependencyGraph,
    effects: EffectRegistry,
    persistence: Option<Arc<dyn Persistence>>,
    config: EngineConfig,
    pass: u64,
    /// Declarations of the last completed pass.
    declarations: FxHashMap<Name, NodeId>,
}

impl Engine {
    pub fn new(store: Arc<NodeStore>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: Arc<NodeStore>, config: EngineConfig) -> Self {
        Engine {
            store,
            cache: EvalCache::new(),
            graph: DependencyGraph::new(),
            effects: EffectRegistry::new(),
            persistence: None,
            config,
            pass: 0,
            declarations: FxHashMap::default(),
        }
    }

    /// Read and write cache entries through `persistence`.
    #[must_use]
    pub fn with_persistence(mut self, persistence: Arc<dyn Persistence>) -> Self {
        self.cache.advance_past(persistence.high_water());
        self.persistence = Some(persistence);
        self
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn store_handle(&self) -> Arc<NodeStore> {
        Arc::clone(&self.store)
    }

    pub fn cache(&self) -> &EvalCache {
        &self.cache
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of passes started so far.
    pub fn pass(&self) -> u64 {
        self.pass
    }

    pub fn effects(&self) -> &EffectRegistry {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut EffectRegistry {
        &mut self.effects
    }

    /// Register `handler` for effect nodes named `name`.
    pub fn register_effect(&mut self, name: impl Into<String>, handler: impl EffectHandler + 'static) {
        self.effects.register(name, handler);
    }

    /// Evaluate `roots` without a way to cancel.
    pub fn evaluate(&mut self, roots: &[NodeId]) -> Result<PassReport, EngineError> {
        self.run_pass(roots, &CancelToken::new())
    }

    /// Evaluate the top-level forms `roots`, in order.
    ///
    /// Failures of individual forms are part of the report. An `Err` means
    /// the engine itself failed: a root was not in the store, or persistence
    /// broke.
    #[tracing::instrument(level = "debug", skip_all, fields(pass = self.pass + 1, roots = roots.len()))]
    pub fn run_pass(
        &mut self,
        roots: &[NodeId],
        cancel: &CancelToken,
    ) -> Result<PassReport, EngineError> {
        self.pass += 1;
        let mut report = PassReport::new(self.pass);
        self.store.set_roots(roots);

        let mut forms = Vec::with_capacity(roots.len());
        let mut declared = FxHashMap::default();
        for &root in roots {
            let binder = match self.store.get(root)?.kind {
                NodeKind::Def(name) => Some(name),
                _ => None,
            };
            if let Some(name) = binder {
                declared.insert(name, root);
            }
            forms.push((root, binder));
        }
        report.invalidated = self.invalidate_changed(&declared)?;

        let cx = Context {
            store: &self.store,
            cache: &self.cache,
            graph: &self.graph,
            effects: &self.effects,
            persistence: self.persistence.as_deref(),
            config: &self.config,
            cancel,
        };
        let mut evaluator = Evaluator::new(cx, self.pass);
        let mut env = Environment::new();
        let mut failure = None;
        for (root, binder) in forms {
            match evaluator.evaluate(root, &env) {
                Ok(evaluated) => {
                    if let Some(name) = binder {
                        env = env.define(
                            name,
                            Binding::ready(root, evaluated.result.clone(), evaluated.generation),
                        );
                    }
                    report.outcomes.push(RootOutcome {
                        node: root,
                        name: binder.map(|name| self.store.name_str(name).to_owned()),
                        result: evaluated.result,
                    });
                }
                Err(Interrupt::Cancelled) => {
                    debug!(completed = report.outcomes.len(), "pass cancelled");
                    report.cancelled = true;
                    break;
                }
                Err(Interrupt::Engine(error)) => {
                    failure = Some(error);
                    break;
                }
            }
        }
        report.stats = evaluator.finish();
        if let Some(error) = failure {
            return Err(error);
        }

        if !report.cancelled {
            self.declarations = declared;
            self.collect_garbage(&mut report)?;
        }
        debug!(%report, "pass finished");
        Ok(report)
    }

    /// Drop entries that consulted a declaration which changed or vanished.
    fn invalidate_changed(
        &self,
        declared: &FxHashMap<Name, NodeId>,
    ) -> Result<Vec<NodeId>, EngineError> {
        let mut seeds: Vec<NodeId> = self
            .declarations
            .iter()
            .filter(|(name, old)| declared.get(*name) != Some(*old))
            .map(|(_, old)| *old)
            .collect();
        seeds.sort_unstable();

        let mut dirty = BTreeSet::new();
        for seed in seeds {
            let dependents = self.graph.mark_dirty_transitive(seed);
            debug!(seed = %seed, dependents = dependents.len(), "declaration changed");
            dirty.extend(dependents);
        }
        self.drop_entries(&dirty)?;
        Ok(dirty.into_iter().collect())
    }

    fn drop_entries(&self, ids: &BTreeSet<NodeId>) -> Result<(), EngineError> {
        for &id in ids {
            self.cache.invalidate(id);
            if let Some(persistence) = &self.persistence {
                persistence.remove(id)?;
            }
        }
        Ok(())
    }

    fn collect_garbage(&self, report: &mut PassReport) -> Result<(), EngineError> {
        let reachable = self.store.reachable();
        report.evicted = self
            .cache
            .sweep(&reachable, self.pass, self.config.retention_passes);
        for &id in &report.evicted {
            self.graph.remove_node(id);
        }
        if !report.evicted.is_empty() {
            debug!(evicted = report.evicted.len(), "evicted cache entries");
        }

        if !self.config.collect_nodes && self.persistence.is_none() {
            return Ok(());
        }
        let keep = self
            .store
            .closure(reachable.into_iter().chain(self.cache.pinned_nodes()));
        if self.config.collect_nodes {
            report.collected = self.store.collect(&keep);
        }
        if let Some(persistence) = &self.persistence {
            report.pruned = persistence.retain(&keep)?;
            if report.pruned > 0 {
                debug!(pruned = report.pruned, "pruned persisted entries");
            }
        }
        Ok(())
    }

    /// Invalidate `id` and everything that transitively consulted it, so
    /// the next pass recomputes them. Returns the invalidated nodes.
    ///
    /// This is how results of manual effects are refreshed.
    pub fn refresh(&mut self, id: NodeId) -> Result<Vec<NodeId>, EngineError> {
        let mut dirty: BTreeSet<NodeId> = self.graph.mark_dirty_transitive(id).into_iter().collect();
        dirty.insert(id);
        debug!(node = %id, invalidated = dirty.len(), "refresh");
        self.drop_entries(&dirty)?;
        Ok(dirty.into_iter().collect())
    }

    /// Forget every cached result and edge held in memory.
    ///
    /// Persisted entries are kept; they are revalidated before reuse.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.graph.clear();
        self.declarations.clear();
    }

    /// Write pending persistence state.
    pub fn flush(&self) -> Result<(), EngineError> {
        if let Some(persistence) = &self.persistence {
            persistence.flush()?;
        }
        Ok(())
    }

    /// Cached result of `id`, if it has one.
    pub fn value_of(&self, id: NodeId) -> Option<EvalResult> {
        self.cache.lookup(id).map(|entry| entry.result)
    }

    pub fn entry(&self, id: NodeId) -> Option<CacheEntry> {
        self.cache.lookup(id)
    }

    /// Nodes that consulted `id` directly.
    pub fn dependents_of(&self, id: NodeId) -> BTreeSet<NodeId> {
        self.graph.dependents_of(id)
    }

    /// Nodes `id` consulted directly, in order.
    pub fn dependencies_of(&self, id: NodeId) -> Vec<(NodeId, EdgeKind)> {
        self.graph.dependencies_of(id)
    }

    /// Every node that transitively consulted `id`.
    pub fn transitive_dependents_of(&self, id: NodeId) -> Vec<NodeId> {
        self.graph.mark_dirty_transitive(id)
    }
}
