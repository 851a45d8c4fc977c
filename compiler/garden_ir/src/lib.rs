//! Garden IR - the content-addressed program graph.
//!
//! This crate holds the data the evaluator caches against:
//! - [`Name`] and [`StringInterner`] for identifiers and text
//! - [`Span`] for source locations, kept out of node identity
//! - [`Node`], [`NodeKind`], and [`NodeId`] for the immutable program graph
//! - [`NodeStore`] for interning and retrieving nodes by identity
//!
//! # Identity
//!
//! A node's id is a SHA-256 digest of its kind, its payload, and its
//! children's ids. The encoding is fixed and independent of interner indices,
//! so ids are stable across runs and usable as persistent cache keys.
//!
//! Types that contain floats store them as u64 bits for Hash compatibility.
//! Types that contain strings use interned Name for O(1) equality.

pub mod identity;
mod interner;
mod name;
pub mod node;
mod span;
mod store;

pub use interner::{InternError, SharedInterner, StringInterner};
pub use name::Name;
pub use node::{Literal, Node, NodeId, NodeKind, Operator, ParseNodeIdError};
pub use span::{Span, SpanError};
pub use store::{NodeStore, StoreError};
