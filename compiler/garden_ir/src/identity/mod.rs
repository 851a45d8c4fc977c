//! Content hashing for node identity.
//!
//! The digest covers, in order:
//! 1. a format version byte
//! 2. an explicit tag byte for the kind
//! 3. the kind's payload (literal value, or a name as length-prefixed UTF-8)
//! 4. the child count and each child's 32 identity bytes
//!
//! Spans, interner indices, and enum discriminants never reach the hasher,
//! so identities are stable across runs, processes, and reformatting.

use sha2::{Digest, Sha256};

use crate::node::{Literal, NodeId, NodeKind};
use crate::StringInterner;

/// Bumped whenever the encoding below changes.
const IDENTITY_VERSION: u8 = 1;

mod tag {
    pub const INT: u8 = 0x01;
    pub const FLOAT: u8 = 0x02;
    pub const BOOL: u8 = 0x03;
    pub const TEXT: u8 = 0x04;
    pub const SYMBOL: u8 = 0x10;
    pub const DEF: u8 = 0x11;
    pub const LET: u8 = 0x12;
    pub const IF: u8 = 0x13;
    pub const RECOVER: u8 = 0x14;
    pub const OP: u8 = 0x20;
    pub const CALL: u8 = 0x21;
    pub const EFFECT: u8 = 0x22;
    pub const LIST: u8 = 0x30;
    pub const SET: u8 = 0x31;
    pub const MAP: u8 = 0x32;
}

/// Compute the identity of a node with the given kind and children.
pub fn node_identity(kind: &NodeKind, children: &[NodeId], interner: &StringInterner) -> NodeId {
    let mut hasher = Sha256::new();
    hasher.update([IDENTITY_VERSION]);
    hash_kind(kind, interner, &mut hasher);

    // Child counts never approach u32::MAX for source-derived trees.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "child count is bounded by source size"
    )]
    let count = children.len() as u32;
    hasher.update(count.to_le_bytes());
    for child in children {
        hasher.update(child.as_bytes());
    }

    NodeId::from_bytes(hasher.finalize().into())
}

fn hash_kind(kind: &NodeKind, interner: &StringInterner, hasher: &mut Sha256) {
    match *kind {
        NodeKind::Literal(literal) => match literal {
            Literal::Int(v) => {
                hasher.update([tag::INT]);
                hasher.update(v.to_le_bytes());
            }
            Literal::Float(bits) => {
                hasher.update([tag::FLOAT]);
                hasher.update(bits.to_le_bytes());
            }
            Literal::Bool(v) => {
                hasher.update([tag::BOOL, u8::from(v)]);
            }
            Literal::Text(name) => {
                hasher.update([tag::TEXT]);
                hash_str(interner.lookup(name), hasher);
            }
        },
        NodeKind::Symbol(name) => {
            hasher.update([tag::SYMBOL]);
            hash_str(interner.lookup(name), hasher);
        }
        NodeKind::Def(name) => {
            hasher.update([tag::DEF]);
            hash_str(interner.lookup(name), hasher);
        }
        NodeKind::Let(name) => {
            hasher.update([tag::LET]);
            hash_str(interner.lookup(name), hasher);
        }
        NodeKind::If => hasher.update([tag::IF]),
        NodeKind::Recover => hasher.update([tag::RECOVER]),
        NodeKind::Op(op) => hasher.update([tag::OP, op.tag()]),
        NodeKind::Call(name) => {
            hasher.update([tag::CALL]);
            hash_str(interner.lookup(name), hasher);
        }
        NodeKind::Effect(name) => {
            hasher.update([tag::EFFECT]);
            hash_str(interner.lookup(name), hasher);
        }
        NodeKind::List => hasher.update([tag::LIST]),
        NodeKind::Set => hasher.update([tag::SET]),
        NodeKind::Map => hasher.update([tag::MAP]),
    }
}

fn hash_str(s: &str, hasher: &mut Sha256) {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "names and text literals are bounded by source size"
    )]
    let len = s.len() as u32;
    hasher.update(len.to_le_bytes());
    hasher.update(s.as_bytes());
}
