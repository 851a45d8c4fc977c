//! Nodes of the program graph.
//!
//! A node is an immutable pair of a [`NodeKind`] and an ordered list of child
//! [`NodeId`]s. Identity is derived from content (see [`crate::identity`]),
//! so equal subtrees anywhere in a program, or across edits, share one node.

mod id;
mod operator;

pub use id::{NodeId, ParseNodeIdError};
pub use operator::Operator;

use crate::Name;

/// Literal payload of a leaf node.
///
/// Floats are stored as bits for `Eq`/`Hash`. Construction goes through
/// [`Literal::float`], which normalizes `-0.0` and NaN so that values that
/// compare equal also hash equal.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Literal {
    Int(i64),
    Float(u64),
    Bool(bool),
    /// Unescaped text content.
    Text(Name),
}

impl Literal {
    pub fn float(value: f64) -> Self {
        let canonical = if value == 0.0 {
            0.0
        } else if value.is_nan() {
            f64::NAN
        } else {
            value
        };
        Literal::Float(canonical.to_bits())
    }

    pub fn as_float(self) -> Option<f64> {
        match self {
            Literal::Float(bits) => Some(f64::from_bits(bits)),
            _ => None,
        }
    }
}

/// What a node is, independent of its children.
///
/// Child layout per kind:
///
/// | kind       | children                         |
/// |------------|----------------------------------|
/// | `Literal`  | none                             |
/// | `Symbol`   | none                             |
/// | `Def`      | `[value]`                        |
/// | `Let`      | `[value, body]`                  |
/// | `If`       | `[condition, then, else]`        |
/// | `Recover`  | `[expr, fallback]`               |
/// | `Op`       | operands                         |
/// | `Call`     | arguments                        |
/// | `Effect`   | arguments                        |
/// | `List`     | elements                         |
/// | `Set`      | elements                         |
/// | `Map`      | alternating keys and values      |
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum NodeKind {
    Literal(Literal),
    Symbol(Name),
    /// Top-level declaration binding a name.
    Def(Name),
    /// Local, non-recursive binding.
    Let(Name),
    If,
    /// Evaluates the fallback when the expression fails.
    Recover,
    Op(Operator),
    /// Builtin function call by name.
    Call(Name),
    /// Side-effecting call, dispatched to a registered handler.
    Effect(Name),
    List,
    Set,
    Map,
}

impl NodeKind {
    /// Name introduced by this node, if it is a binder.
    pub fn binder(&self) -> Option<Name> {
        match *self {
            NodeKind::Def(name) | NodeKind::Let(name) => Some(name),
            _ => None,
        }
    }

    /// Short label used in logs and dependency listings.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Literal(_) => "literal",
            NodeKind::Symbol(_) => "symbol",
            NodeKind::Def(_) => "def",
            NodeKind::Let(_) => "let",
            NodeKind::If => "if",
            NodeKind::Recover => "recover",
            NodeKind::Op(_) => "op",
            NodeKind::Call(_) => "call",
            NodeKind::Effect(_) => "effect",
            NodeKind::List => "list",
            NodeKind::Set => "set",
            NodeKind::Map => "map",
        }
    }
}

/// An immutable node of the program graph.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Box<[NodeId]>,
}

impl Node {
    pub fn new(kind: NodeKind, children: impl Into<Box<[NodeId]>>) -> Self {
        Node {
            kind,
            children: children.into(),
        }
    }

    pub fn leaf(kind: NodeKind) -> Self {
        Node {
            kind,
            children: Box::default(),
        }
    }

    #[inline]
    pub fn child(&self, index: usize) -> Option<NodeId> {
        self.children.get(index).copied()
    }
}

#[cfg(test)]
mod tests;
