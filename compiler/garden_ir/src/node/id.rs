//! Content-derived node identity.

use std::fmt;
use std::str::FromStr;

/// Identity of a node: the SHA-256 digest of its kind, payload, and the
/// identities of its children, in order.
///
/// Equal content yields equal ids within and across runs, which is what lets
/// cache entries survive edits and be persisted.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId([u8; 32]);

/// Number of hex digits shown by `Display`.
const SHORT_HEX: usize = 12;

impl NodeId {
    #[inline]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        NodeId(bytes)
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full 64-digit lowercase hex form.
    pub fn to_hex(&self) -> String {
        use fmt::Write;
        let mut out = String::with_capacity(64);
        for byte in self.0 {
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({self})")
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex()[..SHORT_HEX])
    }
}

/// Error parsing a node id from hex.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseNodeIdError {
    #[error("node id must be 64 hex digits, found {0}")]
    Length(usize),
    #[error("invalid hex digit in node id")]
    Digit,
}

impl FromStr for NodeId {
    type Err = ParseNodeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 {
            return Err(ParseNodeIdError::Length(s.len()));
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = s.get(i * 2..i * 2 + 2).ok_or(ParseNodeIdError::Digit)?;
            *byte = u8::from_str_radix(pair, 16).map_err(|_| ParseNodeIdError::Digit)?;
        }
        Ok(NodeId(bytes))
    }
}
