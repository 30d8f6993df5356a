/// Minimum stack space to keep available before recursing.
const RED_ZONE: usize = 128 * 1024;

/// Stack space to allocate each time the stack has to grow.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Runs `f`, growing the native stack first if less than [`RED_ZONE`] bytes
/// remain. Every recursive pass over the AST goes through this.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
