//! Interned identifier.
//!
//! Symbol names, binder names, builtin and effect names, and text literals
//! are all interned so node kinds stay `Copy`-cheap to compare and hash.

use std::fmt;

/// Interned string identifier.
///
/// The raw value is an index into the owning [`StringInterner`](crate::StringInterner).
/// It is only meaningful for the interner that produced it, which is why node
/// identities never hash a `Name` directly but the string it stands for.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// Pre-interned empty string.
    pub const EMPTY: Name = Name(0);

    /// Create from raw u32 value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Name(raw)
    }

    /// Get raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests;
