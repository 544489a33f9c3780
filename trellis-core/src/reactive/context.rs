//! Tracking Context
//!
//! The tracking context identifies the watcher currently being evaluated, so
//! that reads can be attributed to it. There is at most one active target at
//! a time in a given synchronous evaluation; nested evaluations (a watcher's
//! getter reading through another watcher's cached value) push and pop a
//! stack so the outer target is restored when the inner one finishes.
//!
//! # Implementation
//!
//! A thread-local stack of `Option<Watcher>` frames. A `None` frame means
//! "evaluating, but not tracking" and is how [`untracked`] suspends
//! collection without disturbing the outer scope. Frames are popped by a
//! guard's `Drop` impl, so a panicking getter still restores the stack.

use std::cell::RefCell;

use super::watcher::Watcher;

thread_local! {
    static TARGET_STACK: RefCell<Vec<Option<Watcher>>> = RefCell::new(Vec::new());
}

/// Guard that pops the tracking target when dropped.
///
/// This ensures the target stack is properly maintained even if the
/// evaluation panics.
pub(crate) struct TargetGuard {
    _private: (),
}

/// Push a tracking target; it stays active until the guard is dropped.
pub(crate) fn push_target(target: Option<Watcher>) -> TargetGuard {
    TARGET_STACK.with(|stack| stack.borrow_mut().push(target));
    TargetGuard { _private: () }
}

impl Drop for TargetGuard {
    fn drop(&mut self) {
        TARGET_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            debug_assert!(popped.is_some(), "tracking target stack underflow");
        });
    }
}

/// The watcher reads should currently be attributed to, if any.
pub(crate) fn current_target() -> Option<Watcher> {
    TARGET_STACK.with(|stack| stack.borrow().last().cloned().flatten())
}

/// Whether reads are currently being tracked.
pub(crate) fn is_tracking() -> bool {
    TARGET_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
}

/// Run `f` with dependency collection suspended.
///
/// Reads inside `f` are not attributed to any watcher, even when called from
/// within a watcher's getter.
pub fn untracked<T>(f: impl FnOnce() -> T) -> T {
    let _guard = push_target(None);
    f()
}
