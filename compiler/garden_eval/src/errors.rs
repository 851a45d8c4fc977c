//! Evaluation errors and their constructors.
//!
//! An [`EvalError`] is a value: it is cached, propagated to dependents, and
//! persisted exactly like a successful result. Constructors live here so call
//! sites stay short and message wording stays in one place.
//!
//! [`EngineError`] is different: it reports a failure of the engine itself
//! (a missing node, a broken cache file) and is never cached.

use garden_ir::StoreError;
use serde::{Deserialize, Serialize};

use crate::persist::PersistError;
use crate::value::Value;

/// Outcome of evaluating a node.
pub type EvalResult = Result<Value, EvalError>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum EvalError {
    #[error("parse error: {message}")]
    Parse { message: String },
    #[error("unresolved symbol `{name}`")]
    UnresolvedSymbol { name: String },
    #[error("cyclic dependency: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },
    #[error("effect `{effect}` failed: {message}")]
    Effect { effect: String, message: String },
    #[error("`{op}` expected {expected}, found {found}")]
    TypeMismatch {
        op: String,
        expected: String,
        found: String,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow in `{op}`")]
    Overflow { op: String },
    #[error("`{callee}` expects {expected} argument(s), found {found}")]
    Arity {
        callee: String,
        expected: String,
        found: usize,
    },
    #[error("unknown function `{name}`")]
    UnknownFunction { name: String },
    #[error("key {key} not found")]
    KeyNotFound { key: String },
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },
    #[error("`{callee}`: {message}")]
    InvalidArgument { callee: String, message: String },
}

impl EvalError {
    /// Short category name, used in logs and reports.
    pub fn category(&self) -> &'static str {
        match self {
            EvalError::Parse { .. } => "parse",
            EvalError::UnresolvedSymbol { .. } => "unresolved",
            EvalError::CyclicDependency { .. } => "cycle",
            EvalError::Effect { .. } => "effect",
            EvalError::TypeMismatch { .. } => "type",
            EvalError::DivisionByZero => "division",
            EvalError::Overflow { .. } => "overflow",
            EvalError::Arity { .. } => "arity",
            EvalError::UnknownFunction { .. } => "unknown-function",
            EvalError::KeyNotFound { .. } => "key",
            EvalError::IndexOutOfBounds { .. } => "index",
            EvalError::InvalidArgument { .. } => "argument",
        }
    }
}

/// Failure of the engine itself.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("cache persistence failed: {0}")]
    Persistence(#[from] PersistError),
}

#[cold]
pub fn parse_error(message: impl Into<String>) -> EvalError {
    EvalError::Parse {
        message: message.into(),
    }
}

#[cold]
pub fn unresolved_symbol(name: &str) -> EvalError {
    EvalError::UnresolvedSymbol {
        name: name.to_owned(),
    }
}

#[cold]
pub fn cyclic_dependency(cycle: Vec<String>) -> EvalError {
    EvalError::CyclicDependency { cycle }
}

#[cold]
pub fn effect_failed(effect: &str, message: impl Into<String>) -> EvalError {
    EvalError::Effect {
        effect: effect.to_owned(),
        message: message.into(),
    }
}

#[cold]
pub fn no_effect_handler(effect: &str) -> EvalError {
    effect_failed(effect, "no handler registered")
}

#[cold]
pub fn type_mismatch(op: &str, expected: &str, found: &Value) -> EvalError {
    EvalError::TypeMismatch {
        op: op.to_owned(),
        expected: expected.to_owned(),
        found: found.type_name().to_owned(),
    }
}

#[cold]
pub fn division_by_zero() -> EvalError {
    EvalError::DivisionByZero
}

#[cold]
pub fn overflow(op: &str) -> EvalError {
    EvalError::Overflow { op: op.to_owned() }
}

#[cold]
pub fn wrong_arity(callee: &str, expected: &str, found: usize) -> EvalError {
    EvalError::Arity {
        callee: callee.to_owned(),
        expected: expected.to_owned(),
        found,
    }
}

#[cold]
pub fn unknown_function(name: &str) -> EvalError {
    EvalError::UnknownFunction {
        name: name.to_owned(),
    }
}

#[cold]
pub fn key_not_found(key: &Value) -> EvalError {
    EvalError::KeyNotFound {
        key: key.to_string(),
    }
}

#[cold]
pub fn index_out_of_bounds(index: i64, len: usize) -> EvalError {
    EvalError::IndexOutOfBounds { index, len }
}

#[cold]
pub fn invalid_argument(callee: &str, message: impl Into<String>) -> EvalError {
    EvalError::InvalidArgument {
        callee: callee.to_owned(),
        message: message.into(),
    }
}
