//! Stack growth for deep recursion.
//!
//! The reader, the renderer, and the evaluator all recurse once per level of
//! nesting. Source like `(+ 1 (+ 1 (+ 1 ...)))` nested a few hundred thousand
//! deep must not overflow the thread stack, so every recursive step goes
//! through [`ensure_sufficient_stack`].
//!
//! On wasm the call is a passthrough.

/// Grow when less than this much stack remains.
const RED_ZONE: usize = 100 * 1024;

/// Size of each new stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first growing the stack if less than the red zone remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    enum Nested {
        Leaf(u64),
        Wrap(Box<Nested>),
    }

    fn build(depth: u64) -> Nested {
        let mut node = Nested::Leaf(depth);
        for _ in 0..depth {
            node = Nested::Wrap(Box::new(node));
        }
        node
    }

    fn depth_of(node: &Nested) -> u64 {
        ensure_sufficient_stack(|| match node {
            Nested::Leaf(_) => 0,
            Nested::Wrap(inner) => depth_of(inner) + 1,
        })
    }

    #[test]
    fn test_deep_tree_walk() {
        let tree = build(200_000);
        assert_eq!(depth_of(&tree), 200_000);
        // Iterative drop so the test itself does not overflow.
        let mut current = tree;
        while let Nested::Wrap(inner) = current {
            current = *inner;
        }
    }

    #[test]
    fn test_passes_result_through() {
        let result: Result<u8, String> = ensure_sufficient_stack(|| Ok(7));
        assert_eq!(result, Ok(7));
    }
}
