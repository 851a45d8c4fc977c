//! Memoized tree-walking evaluation.
//!
//! The evaluator walks one node at a time against an [`Environment`]:
//!
//! 1. A cached entry whose reads all hold in the environment, and whose
//!    effect expiry has not passed, is returned as is.
//! 2. Otherwise the node is computed. Children are consulted in order
//!    through [`Evaluator::evaluate`], so each one goes through step 1 on
//!    its own.
//! 3. The result is recorded with the exact dependencies consulted, edges
//!    are committed to the dependency graph, and the entry is written
//!    through to persistence.
//!
//! Each cache entry plus its edges is committed as a unit, so interrupting
//! evaluation between nodes (cancellation) never leaves a half-recorded
//! entry behind.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use garden_ir::{Literal, Name, Node, NodeId, NodeKind, NodeStore, StoreError};
use garden_stack::ensure_sufficient_stack;
use tracing::{debug, trace};

use crate::builtins;
use crate::cache::{CacheEntry, Dependency, EvalCache, Expiry, Generation, SymbolRead};
use crate::cancel::CancelToken;
use crate::config::EngineConfig;
use crate::effects::{EffectRegistry, EffectRequest};
use crate::environment::{Binding, BindingState, Environment};
use crate::errors::{self, EngineError, EvalError, EvalResult};
use crate::graph::{DependencyGraph, EdgeKind};
use crate::operators;
use crate::persist::Persistence;
use crate::value::Value;

/// Why evaluation stopped without a result.
#[derive(Debug)]
pub enum Interrupt {
    /// The pass was cancelled.
    Cancelled,
    Engine(EngineError),
}

impl From<EngineError> for Interrupt {
    fn from(error: EngineError) -> Self {
        Interrupt::Engine(error)
    }
}

impl From<StoreError> for Interrupt {
    fn from(error: StoreError) -> Self {
        Interrupt::Engine(error.into())
    }
}

/// Outcome of evaluating one node, as seen by its consumer.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluated {
    pub result: EvalResult,
    pub generation: Generation,
    /// Free reads of the node's subtree.
    pub reads: Vec<SymbolRead>,
    pub expiry: Expiry,
    pub effectful: bool,
}

impl Evaluated {
    fn from_entry(entry: CacheEntry) -> Self {
        Evaluated {
            result: entry.result,
            generation: entry.generation,
            reads: entry.reads,
            expiry: entry.expiry,
            effectful: entry.effectful,
        }
    }
}

/// Counters for one pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Cache hits, counting every time a node was served from the cache.
    pub hits: usize,
    /// Nodes computed, counting repeats.
    pub recomputations: usize,
    /// Entries restored from persistence.
    pub restored: usize,
    pub effect_calls: usize,
    /// Distinct nodes served from the cache.
    pub reused: BTreeSet<NodeId>,
    /// Distinct nodes computed.
    pub recomputed: BTreeSet<NodeId>,
}

/// What a node consulted while it was computed.
#[derive(Default)]
struct Trace {
    deps: Vec<Dependency>,
    reads: Vec<SymbolRead>,
    expiry: Expiry,
    effectful: bool,
}

impl Trace {
    /// Fold in a child's outcome. Reads of `bound` are satisfied by the
    /// consuming node itself and do not escape it.
    fn absorb(&mut self, child: NodeId, evaluated: &Evaluated, bound: Option<Name>) {
        self.deps.push(Dependency {
            node: child,
            kind: EdgeKind::Structural,
            generation: evaluated.generation,
        });
        self.reads.extend(
            evaluated
                .reads
                .iter()
                .filter(|read| Some(read.name) != bound)
                .copied(),
        );
        self.expiry = self.expiry.min(evaluated.expiry);
        self.effectful |= evaluated.effectful;
    }
}

/// Shared state the evaluator works against.
pub struct Context<'a> {
    pub store: &'a NodeStore,
    pub cache: &'a EvalCache,
    pub graph: &'a DependencyGraph,
    pub effects: &'a EffectRegistry,
    pub persistence: Option<&'a dyn Persistence>,
    pub config: &'a EngineConfig,
    pub cancel: &'a CancelToken,
}

/// Evaluates nodes for one pass.
pub struct Evaluator<'a> {
    cx: Context<'a>,
    pass: u64,
    /// Clock for effect expiry, fixed for the pass.
    now: Instant,
    /// Declarations whose value is being evaluated, outermost first.
    active: Vec<(NodeId, Name)>,
    stats: PassStats,
}

impl<'a> Evaluator<'a> {
    pub fn new(cx: Context<'a>, pass: u64) -> Self {
        Evaluator {
            cx,
            pass,
            now: Instant::now(),
            active: Vec::new(),
            stats: PassStats::default(),
        }
    }

    /// Use `now` as the pass clock.
    #[must_use]
    pub fn at(mut self, now: Instant) -> Self {
        self.now = now;
        self
    }

    pub fn stats(&self) -> &PassStats {
        &self.stats
    }

    pub fn finish(self) -> PassStats {
        self.stats
    }

    /// Evaluate `id` in `env`, reusing cached results where they still hold.
    pub fn evaluate(&mut self, id: NodeId, env: &Environment) -> Result<Evaluated, Interrupt> {
        ensure_sufficient_stack(|| self.evaluate_node(id, env))
    }

    fn evaluate_node(&mut self, id: NodeId, env: &Environment) -> Result<Evaluated, Interrupt> {
        if self.cx.cancel.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }

        let previous = self.cached(id)?;
        if let Some(entry) = &previous {
            if entry.is_valid_in(env, self.now) {
                trace!(node = %id, "hit");
                self.link(id, entry);
                self.stats.hits += 1;
                self.stats.reused.insert(id);
                return Ok(Evaluated::from_entry(entry.clone()));
            }
            trace!(node = %id, "stale");
        } else {
            trace!(node = %id, "miss");
        }

        let node = self.cx.store.get(id)?;
        let mut trace = Trace::default();
        let result = self.compute(id, &node, env, &mut trace)?;

        let generation = match &previous {
            Some(old) if old.result == result => old.generation,
            _ => self.cx.cache.next_generation(),
        };
        trace.reads.sort_unstable();
        trace.reads.dedup();

        let entry = CacheEntry {
            result,
            deps: trace.deps,
            reads: trace.reads,
            generation,
            expiry: trace.expiry,
            effectful: trace.effectful,
            last_seen: self.pass,
        };
        self.commit(id, &entry)?;
        self.stats.recomputations += 1;
        self.stats.recomputed.insert(id);
        Ok(Evaluated::from_entry(entry))
    }

    /// Record `entry` for `id` along with its edges.
    fn commit(&self, id: NodeId, entry: &CacheEntry) -> Result<(), Interrupt> {
        self.link(id, entry);
        if let Some(persistence) = self.cx.persistence {
            if entry.is_persistable() {
                persistence.save(id, entry).map_err(EngineError::from)?;
            } else {
                persistence.remove(id).map_err(EngineError::from)?;
            }
        }
        self.cx.cache.record(id, entry.clone());
        Ok(())
    }

    /// The entry for `id`, reading through to persistence on a miss.
    fn cached(&mut self, id: NodeId) -> Result<Option<CacheEntry>, Interrupt> {
        if let Some(entry) = self.cx.cache.lookup(id) {
            return Ok(Some(entry));
        }
        let Some(persistence) = self.cx.persistence else {
            return Ok(None);
        };
        let Some(mut entry) = persistence.load(id).map_err(EngineError::from)? else {
            return Ok(None);
        };
        if !self.rehydrate(&mut entry) {
            return Ok(None);
        }
        entry.last_seen = self.pass;
        debug!(node = %id, "restored from persistence");
        self.stats.restored += 1;
        self.cx.cache.record(id, entry.clone());
        Ok(Some(entry))
    }

    /// Add the edges of `entry` to the graph for this pass.
    fn link(&self, id: NodeId, entry: &CacheEntry) {
        self.cx.graph.commit(
            id,
            self.pass,
            entry.deps.iter().map(|dep| (dep.node, dep.kind)),
        );
    }

    /// Restore read names from their symbol nodes. Fails if a symbol node is
    /// not in the store.
    fn rehydrate(&self, entry: &mut CacheEntry) -> bool {
        for read in &mut entry.reads {
            match self.cx.store.get(read.symbol) {
                Ok(node) => match node.kind {
                    NodeKind::Symbol(name) => read.name = name,
                    _ => return false,
                },
                Err(_) => return false,
            }
        }
        true
    }

    /// Evaluate a child and fold it into `trace`.
    fn consult(
        &mut self,
        child: NodeId,
        env: &Environment,
        bound: Option<Name>,
        trace: &mut Trace,
    ) -> Result<(EvalResult, Generation), Interrupt> {
        let evaluated = self.evaluate(child, env)?;
        trace.absorb(child, &evaluated, bound);
        Ok((evaluated.result, evaluated.generation))
    }

    /// Evaluate children left to right, stopping at the first error.
    fn consult_all(
        &mut self,
        children: &[NodeId],
        env: &Environment,
        trace: &mut Trace,
    ) -> Result<Result<Vec<Value>, EvalError>, Interrupt> {
        let mut values = Vec::with_capacity(children.len());
        for &child in children {
            match self.consult(child, env, None, trace)?.0 {
                Ok(value) => values.push(value),
                Err(error) => return Ok(Err(error)),
            }
        }
        Ok(Ok(values))
    }

    fn compute(
        &mut self,
        id: NodeId,
        node: &Node,
        env: &Environment,
        trace: &mut Trace,
    ) -> Result<EvalResult, Interrupt> {
        let children = &node.children[..];
        let malformed = || errors::invalid_argument(node.kind.label(), "malformed node");

        match node.kind {
            NodeKind::Literal(literal) => Ok(Ok(self.literal(literal))),

            NodeKind::Symbol(name) => Ok(self.resolve(id, name, env, trace)),

            NodeKind::Def(name) => {
                let Some(value) = node.child(0) else {
                    return Ok(Err(malformed()));
                };
                let scoped = env.define(name, Binding::pending(id));
                self.active.push((id, name));
                let outcome = self.consult(value, &scoped, Some(name), trace);
                self.active.pop();
                Ok(outcome?.0)
            }

            NodeKind::Let(name) => {
                let (Some(value_id), Some(body)) = (node.child(0), node.child(1)) else {
                    return Ok(Err(malformed()));
                };
                let (value, generation) = match self.consult(value_id, env, None, trace)? {
                    (Ok(value), generation) => (value, generation),
                    (Err(error), _) => return Ok(Err(error)),
                };
                let inner = env.extend([(name, Binding::ready(value_id, Ok(value), generation))]);
                Ok(self.consult(body, &inner, Some(name), trace)?.0)
            }

            NodeKind::If => {
                let [condition, then, otherwise] = children else {
                    return Ok(Err(malformed()));
                };
                let condition = match self.consult(*condition, env, None, trace)?.0 {
                    Ok(value) => value,
                    Err(error) => return Ok(Err(error)),
                };
                let branch = match condition.as_bool() {
                    Some(true) => *then,
                    Some(false) => *otherwise,
                    None => return Ok(Err(errors::type_mismatch("if", "a bool", &condition))),
                };
                Ok(self.consult(branch, env, None, trace)?.0)
            }

            NodeKind::Recover => {
                let [expr, fallback] = children else {
                    return Ok(Err(malformed()));
                };
                match self.consult(*expr, env, None, trace)?.0 {
                    Ok(value) => Ok(Ok(value)),
                    Err(error) => {
                        trace!(node = %id, category = error.category(), "recovering");
                        Ok(self.consult(*fallback, env, None, trace)?.0)
                    }
                }
            }

            NodeKind::Op(op) => {
                let mut operands = Vec::with_capacity(children.len());
                for &child in children {
                    match self.consult(child, env, None, trace)?.0 {
                        Ok(value) => {
                            let stop = operators::short_circuits(op, &value);
                            operands.push(value);
                            if stop {
                                break;
                            }
                        }
                        Err(error) => return Ok(Err(error)),
                    }
                }
                Ok(operators::apply(op, &operands))
            }

            NodeKind::Call(name) => Ok(self
                .consult_all(children, env, trace)?
                .and_then(|args| builtins::call(self.cx.store.name_str(name), &args))),

            NodeKind::Effect(name) => match self.consult_all(children, env, trace)? {
                Ok(args) => Ok(self.perform(name, args, trace)),
                Err(error) => Ok(Err(error)),
            },

            NodeKind::List => Ok(self.consult_all(children, env, trace)?.map(Value::list)),

            NodeKind::Set => Ok(self.consult_all(children, env, trace)?.map(Value::set)),

            NodeKind::Map => {
                if children.len() % 2 != 0 {
                    return Ok(Err(malformed()));
                }
                Ok(self.consult_all(children, env, trace)?.and_then(|items| {
                    let mut items = items.into_iter();
                    let mut entries = BTreeMap::new();
                    while let (Some(key), Some(value)) = (items.next(), items.next()) {
                        if entries.contains_key(&key) {
                            return Err(errors::invalid_argument(
                                node.kind.label(),
                                format!("duplicate key {key}"),
                            ));
                        }
                        entries.insert(key, value);
                    }
                    Ok(Value::map(entries))
                }))
            }
        }
    }

    fn literal(&self, literal: Literal) -> Value {
        match literal {
            Literal::Int(n) => Value::Int(n),
            Literal::Float(bits) => Value::Float(f64::from_bits(bits)),
            Literal::Bool(b) => Value::Bool(b),
            Literal::Text(name) => Value::text(self.cx.store.name_str(name)),
        }
    }

    /// Resolve a symbol node through `env`, recording the read.
    fn resolve(
        &mut self,
        id: NodeId,
        name: Name,
        env: &Environment,
        trace: &mut Trace,
    ) -> EvalResult {
        let text = self.cx.store.name_str(name);
        let Some(binding) = env.lookup(name) else {
            trace.reads.push(SymbolRead {
                name,
                symbol: id,
                target: None,
                generation: Generation::NONE,
            });
            return Err(errors::unresolved_symbol(text));
        };

        let generation = binding.generation();
        trace.reads.push(SymbolRead {
            name,
            symbol: id,
            target: Some(binding.target),
            generation,
        });
        trace.deps.push(Dependency {
            node: binding.target,
            kind: EdgeKind::Symbolic,
            generation,
        });

        if let Some(start) = self
            .active
            .iter()
            .position(|(target, _)| *target == binding.target)
        {
            return Err(self.cycle_error(start, text));
        }

        match &binding.state {
            BindingState::Ready { result, .. } => result.clone(),
            BindingState::Pending => Err(errors::cyclic_dependency(vec![
                text.to_owned(),
                text.to_owned(),
            ])),
        }
    }

    /// Cycle through the active declarations from `start`, closed by `closing`.
    fn cycle_error(&self, start: usize, closing: &str) -> EvalError {
        let limit = self.cx.config.max_cycle_report.max(1);
        let mut cycle: Vec<String> = self.active[start..]
            .iter()
            .map(|(_, name)| self.cx.store.name_str(*name).to_owned())
            .chain(std::iter::once(closing.to_owned()))
            .collect();
        if cycle.len() > limit {
            cycle.truncate(limit);
            cycle.push("...".to_owned());
        }
        debug!(cycle = %cycle.join(" -> "), "cycle detected");
        errors::cyclic_dependency(cycle)
    }

    /// Dispatch an effect call to its handler.
    fn perform(&mut self, effect: Name, args: Vec<Value>, trace: &mut Trace) -> EvalResult {
        let name = self.cx.store.name_str(effect);
        let Some(handler) = self.cx.effects.get(name) else {
            // Retried every pass in case a handler is registered later.
            trace.expiry = Expiry::Always;
            return Err(errors::no_effect_handler(name));
        };
        trace.expiry = trace.expiry.min(handler.policy().expiry_from(self.now));
        trace.effectful = true;

        let request = EffectRequest::new(name, args);
        debug!(effect = name, request = %request.to_json(), "effect call");
        self.stats.effect_calls += 1;
        handler
            .call(&request)
            .map_err(|message| errors::effect_failed(name, message))
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
