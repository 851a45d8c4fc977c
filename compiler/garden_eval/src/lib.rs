//! Garden evaluation engine.
//!
//! Evaluates programs stored in a [`NodeStore`](garden_ir::NodeStore),
//! memoizing every node's result by identity so that re-evaluating an
//! edited program only recomputes what the edit affected.
//!
//! # Architecture
//!
//! ```text
//! Engine::run_pass(roots)
//!   ├── declaration diff ──▶ DependencyGraph::mark_dirty_transitive ──▶ EvalCache::invalidate
//!   ├── Evaluator::evaluate(root, env)   (per root, env grows by declaration)
//!   │     ├── EvalCache::lookup ─▶ valid? ─▶ hit
//!   │     └── compute children ─▶ EvalCache::record + DependencyGraph::commit [+ Persistence::save]
//!   └── sweep: EvalCache::sweep + NodeStore::collect
//! ```
//!
//! Results are [`EvalResult`]s: evaluation failures are values and get
//! cached like any other result. [`EngineError`] is reserved for failures of
//! the engine itself.

mod builtins;
pub mod cache;
mod cancel;
mod config;
mod effects;
mod engine;
pub mod environment;
pub mod errors;
mod evaluator;
pub mod graph;
mod operators;
pub mod persist;
mod value;

pub use cache::{CacheEntry, EvalCache, Expiry, Generation};
pub use cancel::CancelToken;
pub use config::EngineConfig;
pub use effects::{EffectHandler, EffectPolicy, EffectRegistry, EffectRequest, FnHandler};
pub use engine::{Engine, PassReport, RootOutcome};
pub use environment::{Binding, Environment};
pub use errors::{EngineError, EvalError, EvalResult};
pub use evaluator::{Context, Evaluated, Evaluator, Interrupt, PassStats};
pub use graph::{DependencyGraph, EdgeKind};
pub use persist::{FilePersistence, MemoryPersistence, PersistError, Persistence};
pub use value::Value;
