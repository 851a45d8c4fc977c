use std::fmt;

use garden_ir::NodeId;

use crate::errors::EvalResult;
use crate::evaluator::PassStats;

/// Result of one top-level form.
#[derive(Clone, Debug, PartialEq)]
pub struct RootOutcome {
    pub node: NodeId,
    /// Declared name, for `def` forms.
    pub name: Option<String>,
    pub result: EvalResult,
}

/// What a pass did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PassReport {
    pub pass: u64,
    /// One outcome per evaluated root, in order. Shorter than the root list
    /// when the pass was cancelled.
    pub outcomes: Vec<RootOutcome>,
    pub cancelled: bool,
    /// Entries dropped before evaluation because a declaration they
    /// depended on changed or disappeared.
    pub invalidated: Vec<NodeId>,
    /// Entries evicted after the pass.
    pub evicted: Vec<NodeId>,
    /// Nodes dropped from the store after the pass.
    pub collected: usize,
    /// Persisted entries dropped after the pass.
    pub pruned: usize,
    pub stats: PassStats,
}

impl PassReport {
    pub(crate) fn new(pass: u64) -> Self {
        PassReport {
            pass,
            ..PassReport::default()
        }
    }

    /// Outcome of the last root declaring `name`.
    pub fn outcome_of(&self, name: &str) -> Option<&RootOutcome> {
        self.outcomes
            .iter()
            .rev()
            .find(|outcome| outcome.name.as_deref() == Some(name))
    }

    /// Result of the last root declaring `name`.
    pub fn result_of(&self, name: &str) -> Option<&EvalResult> {
        self.outcome_of(name).map(|outcome| &outcome.result)
    }

    pub fn was_reused(&self, id: NodeId) -> bool {
        self.stats.reused.contains(&id)
    }

    pub fn was_recomputed(&self, id: NodeId) -> bool {
        self.stats.recomputed.contains(&id)
    }

    pub fn hits(&self) -> usize {
        self.stats.hits
    }

    pub fn recomputations(&self) -> usize {
        self.stats.recomputations
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pass {}: {} hits, {} recomputed, {} invalidated, {} evicted, {} collected",
            self.pass,
            self.stats.hits,
            self.stats.recomputations,
            self.invalidated.len(),
            self.evicted.len(),
            self.collected,
        )?;
        if self.stats.restored > 0 {
            write!(f, ", {} restored", self.stats.restored)?;
        }
        if self.stats.effect_calls > 0 {
            write!(f, ", {} effect calls", self.stats.effect_calls)?;
        }
        if self.cancelled {
            f.write_str(" (cancelled)")?;
        }
        Ok(())
    }
}
