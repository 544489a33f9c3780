//! Error Types and the Centralized Error Channel
//!
//! Failures in this crate fall into two camps:
//!
//! 1. Invalid operations on the data model (setting a key on `Null`, using a
//!    non-index key on a list). These are returned as [`Error`] values from
//!    the structural mutation entry points.
//!
//! 2. Panics raised inside user-authored watcher getters and callbacks. These
//!    are caught, reported through `tracing`, and never propagate: a buggy
//!    user callback must not take down the host's update cycle. Panics in
//!    internally-authored computations are deliberately NOT caught, since they
//!    indicate a defect that should surface immediately.
//!
//! Advisory diagnostics (refused root-data mutations, unparsable watch paths,
//! circular update detection) go through `tracing::warn!` at their call sites
//! and are never used for control flow.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Errors returned by the structural mutation entry points.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The target of a `set`/`del` was not a container.
    #[error("cannot mutate reactive field on a {0} value")]
    InvalidTarget(&'static str),

    /// A non-index key was used against an ordered container.
    #[error("list fields require a valid index, got \"{0}\"")]
    InvalidListKey(String),
}

/// Extract a printable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run a user-authored computation, funneling any panic into the error
/// channel instead of unwinding through the caller.
///
/// Returns `None` when the computation panicked.
pub(crate) fn invoke_with_handling<T>(context: &str, f: impl FnOnce() -> T) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            tracing::error!(
                context = %context,
                error = %panic_message(&*payload),
                "error in user watcher code"
            );
            None
        }
    }
}
