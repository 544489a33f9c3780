//! Reactive Dependency Tracking
//!
//! This module implements the core reactive system: observation of plain
//! data, watchers, and the batched update scheduler.
//!
//! # Concepts
//!
//! ## Dependency Sets
//!
//! Every trackable state location (each instrumented field, plus each
//! observed container for structural changes) owns a [`Dep`]: the set of
//! watchers currently interested in that location.
//!
//! ## Observation
//!
//! [`observe`] converts a container's fields into intercepted slots that
//! collect dependencies on read and dispatch updates on write. Structural
//! changes (new keys, deletions, list splices) go through [`set`] and
//! [`del`], since plain interception cannot see them.
//!
//! ## Watchers
//!
//! A [`Watcher`] evaluates a getter inside a tracking scope, remembers the
//! dependency sets it touched, and re-runs when any of them notify. Watchers
//! come in batched (default), synchronous, and lazy flavors.
//!
//! ## Scheduling
//!
//! Batched watchers are deduplicated and flushed in ascending-id order in a
//! single deferred tick, coalescing a synchronous burst of mutations into
//! one re-run per watcher.
//!
//! # Implementation Notes
//!
//! The system uses a thread-local tracking target to automatically detect
//! dependencies, the approach used by transparently-reactive UI frameworks.
//! All shared state is thread-local; the engine is single-threaded by
//! contract.

pub(crate) mod context;
pub(crate) mod dep;
pub(crate) mod observe;
pub(crate) mod path;
pub(crate) mod scheduler;
pub(crate) mod tick;
pub(crate) mod traverse;
pub(crate) mod watcher;

pub use context::untracked;
pub use dep::Dep;
pub use observe::{define_reactive, del, observe, set, toggle_observing, Observation};
pub use scheduler::{flush_scheduler_queue, on_flushed, queue_watcher, set_max_update_count};
pub use tick::{clear_tick_hook, next_tick, run_ticks, set_tick_hook};
pub use watcher::{
    watch, WatchCallback, WatchOptions, WatchSource, Watcher, WatcherId, WatcherRegistry,
};
