//! String interner shared by the reader, the node store, and the evaluator.
//!
//! Interned strings are leaked so lookups can hand out `&'static str` without
//! holding the lock. Each distinct string is leaked once, however often it is
//! interned.
//!
//! Text literal payloads go through this interner too, and node collection
//! does not free them. A long session that keeps editing string literals
//! therefore grows by every distinct literal text it has seen. The bound is
//! the total distinct vocabulary of all sources read by the process.

use super::Name;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Error when interning a string fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InternError {
    /// More than `u32::MAX` distinct strings.
    #[error("interner exceeded capacity: {count} strings, max is {}", u32::MAX)]
    Overflow { count: usize },
}

#[derive(Default)]
struct InternTable {
    map: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

impl InternTable {
    fn with_empty() -> Self {
        let mut table = Self::default();
        table.map.insert("", 0);
        table.strings.push("");
        table
    }
}

/// Thread-safe string interner.
///
/// Reads take a shared lock; only the first sighting of a string takes the
/// write lock.
pub struct StringInterner {
    table: RwLock<InternTable>,
}

impl StringInterner {
    pub fn new() -> Self {
        StringInterner {
            table: RwLock::new(InternTable::with_empty()),
        }
    }

    /// Try to intern a string, returning its Name or an error on overflow.
    pub fn try_intern(&self, s: &str) -> Result<Name, InternError> {
        if let Some(&index) = self.table.read().map.get(s) {
            return Ok(Name::from_raw(index));
        }

        let mut guard = self.table.write();
        // Another writer may have won the race between the two locks.
        if let Some(&index) = guard.map.get(s) {
            return Ok(Name::from_raw(index));
        }

        let index = u32::try_from(guard.strings.len()).map_err(|_| InternError::Overflow {
            count: guard.strings.len(),
        })?;
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        guard.strings.push(leaked);
        guard.map.insert(leaked, index);
        Ok(Name::from_raw(index))
    }

    /// Intern a string, returning its Name.
    ///
    /// # Panics
    /// Panics if more than `u32::MAX` distinct strings are interned.
    #[inline]
    pub fn intern(&self, s: &str) -> Name {
        self.try_intern(s).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Look up the Name of a string without interning it.
    pub fn get(&self, s: &str) -> Option<Name> {
        self.table.read().map.get(s).copied().map(Name::from_raw)
    }

    /// Look up the string for a Name.
    ///
    /// Names from a different interner resolve to the empty string when out
    /// of range.
    pub fn lookup(&self, name: Name) -> &'static str {
        self.table
            .read()
            .strings
            .get(name.raw() as usize)
            .copied()
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.table.read().strings.len()
    }

    pub fn is_empty(&self) -> bool {
        // The empty string is always present.
        self.len() <= 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared interner handle.
#[derive(Clone, Default)]
pub struct SharedInterner(Arc<StringInterner>);

impl SharedInterner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::ops::Deref for SharedInterner {
    type Target = StringInterner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedup() {
        let interner = StringInterner::new();
        let a = interner.intern("alpha");
        let b = interner.intern("alpha");
        let c = interner.intern("beta");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(interner.lookup(a), "alpha");
        assert_eq!(interner.lookup(c), "beta");
    }

    #[test]
    fn test_reinterning_does_not_grow() {
        let interner = StringInterner::new();
        for _ in 0..3 {
            interner.intern("a long text literal");
            interner.intern(&String::from("a long text literal"));
        }
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_empty_preinterned() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
        assert!(interner.is_empty());
        interner.intern("x");
        assert!(!interner.is_empty());
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_get_does_not_intern() {
        let interner = StringInterner::new();
        assert_eq!(interner.get("missing"), None);
        assert_eq!(interner.len(), 1);
        let name = interner.intern("present");
        assert_eq!(interner.get("present"), Some(name));
    }

    #[test]
    fn test_lookup_out_of_range() {
        let interner = StringInterner::new();
        assert_eq!(interner.lookup(Name::from_raw(99)), "");
    }

    #[test]
    fn test_shared_interner_threads() {
        let interner = SharedInterner::new();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let interner = interner.clone();
                std::thread::spawn(move || interner.intern("shared"))
            })
            .collect();
        let names: Vec<Name> = handles
            .into_iter()
            .map(|h| h.join().unwrap_or(Name::EMPTY))
            .collect();
        assert!(names.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(interner.lookup(names[0]), "shared");
    }
}
