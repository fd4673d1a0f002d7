//! Stack growth for the recursive passes.
//!
//! Parsing, resolving and evaluating all recurse once per nesting level of
//! the program, and evaluation recurses once per Lox call. Each entry point
//! goes through [`ensure_sufficient_stack`] so deep programs grow the stack
//! on the heap instead of overflowing it.

/// Grow when less than this much stack is left.
const RED_ZONE: usize = 128 * 1024;

/// Size of each new stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

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
