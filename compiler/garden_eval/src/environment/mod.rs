//! Lexical environments.
//!
//! An environment maps names to [`Binding`]s: the node that defines the name
//! and, once evaluated, its result and generation. Environments are
//! persistent values: extending one returns a new environment and leaves the
//! original untouched, so the evaluator can hold the environment a cache
//! entry was validated against while building the next one.
//!
//! Frames are chained through `Arc`. Each frame's bindings live in an
//! `im::HashMap`, so rebinding at the root (one new top-level declaration per
//! step of a pass) shares structure with the previous root instead of
//! copying it.

use std::fmt;
use std::sync::Arc;

use garden_ir::{Name, NodeId};

use crate::cache::Generation;
use crate::errors::EvalResult;

/// Evaluation state of a bound name.
#[derive(Clone, Debug, PartialEq)]
pub enum BindingState {
    /// The defining node is being evaluated right now. Reading a pending
    /// binding is a cycle.
    Pending,
    Ready {
        result: EvalResult,
        generation: Generation,
    },
}

/// What a name resolves to.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    /// Node whose evaluation produces the bound value.
    pub target: NodeId,
    pub state: BindingState,
}

impl Binding {
    pub fn pending(target: NodeId) -> Self {
        Binding {
            target,
            state: BindingState::Pending,
        }
    }

    pub fn ready(target: NodeId, result: EvalResult, generation: Generation) -> Self {
        Binding {
            target,
            state: BindingState::Ready { result, generation },
        }
    }

    /// Generation readers record. Pending bindings have none.
    pub fn generation(&self) -> Generation {
        match self.state {
            BindingState::Pending => Generation::NONE,
            BindingState::Ready { generation, .. } => generation,
        }
    }
}

struct Frame {
    bindings: im::HashMap<Name, Binding>,
    parent: Option<Arc<Frame>>,
}

/// A chain of frames, innermost first.
#[derive(Clone, Default)]
pub struct Environment {
    frame: Option<Arc<Frame>>,
}

impl Environment {
    /// Empty root environment.
    pub fn new() -> Self {
        Environment { frame: None }
    }

    /// Binding for `name`, searching from the innermost frame outward.
    pub fn lookup(&self, name: Name) -> Option<&Binding> {
        let mut frame = self.frame.as_deref();
        while let Some(f) = frame {
            if let Some(binding) = f.bindings.get(&name) {
                return Some(binding);
            }
            frame = f.parent.as_deref();
        }
        None
    }

    /// Node `name` resolves to, if bound.
    pub fn resolve(&self, name: Name) -> Option<NodeId> {
        self.lookup(name).map(|b| b.target)
    }

    /// New environment with a child frame holding `bindings`.
    ///
    /// Later entries for the same name win. The receiver is unchanged.
    #[must_use]
    pub fn extend(&self, bindings: impl IntoIterator<Item = (Name, Binding)>) -> Environment {
        Environment {
            frame: Some(Arc::new(Frame {
                bindings: bindings.into_iter().collect(),
                parent: self.frame.clone(),
            })),
        }
    }

    /// New environment with `name` rebound in the innermost frame.
    ///
    /// Used for top-level declarations, which accumulate in one frame rather
    /// than nesting one frame per declaration.
    #[must_use]
    pub fn define(&self, name: Name, binding: Binding) -> Environment {
        let (bindings, parent) = match self.frame.as_deref() {
            Some(f) => (f.bindings.update(name, binding), f.parent.clone()),
            None => (im::HashMap::unit(name, binding), None),
        };
        Environment {
            frame: Some(Arc::new(Frame { bindings, parent })),
        }
    }

    /// Number of frames in the chain.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut frame = self.frame.as_deref();
        while let Some(f) = frame {
            depth += 1;
            frame = f.parent.as_deref();
        }
        depth
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("depth", &self.depth())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
