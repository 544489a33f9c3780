//! Dependency Set
//!
//! A [`Dep`] is a named change-channel: the set of watchers currently
//! interested in one specific mutable location. Every instrumented field owns
//! one, and every observed container owns one more for structural changes.
//!
//! # How Collection Works
//!
//! 1. A watcher evaluates its getter inside a tracking scope.
//!
//! 2. Every tracked read calls `depend()`, which hands this dep to the active
//!    watcher.
//!
//! 3. The watcher deduplicates per evaluation and subscribes itself, so the
//!    dep never holds the same watcher twice.
//!
//! Subscribers are held weakly: a torn-down or dropped watcher simply fails
//! to upgrade and is pruned on the next notification.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use super::context;
use super::watcher::{WatcherId, WeakWatcher};

/// Counter for generating unique dep IDs.
static DEP_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique dep ID.
fn next_dep_id() -> u64 {
    DEP_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

struct DepInner {
    id: u64,
    subs: RefCell<SmallVec<[(WatcherId, WeakWatcher); 2]>>,
}

/// The subscriber list attached to one trackable state location.
#[derive(Clone)]
pub struct Dep {
    inner: Rc<DepInner>,
}

impl Dep {
    pub fn new() -> Dep {
        Dep {
            inner: Rc::new(DepInner {
                id: next_dep_id(),
                subs: RefCell::new(SmallVec::new()),
            }),
        }
    }

    /// Unique identity, used by watchers to deduplicate subscriptions.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Register the active tracking target as a subscriber, if there is one.
    ///
    /// Idempotent per evaluation: the watcher's own per-cycle dedup decides
    /// whether a subscription is actually added.
    pub fn depend(&self) {
        if let Some(watcher) = context::current_target() {
            watcher.add_dep(self);
        }
    }

    /// Synchronously invoke `update()` on every current subscriber.
    ///
    /// The subscriber list is snapshotted before iterating, since an update
    /// may add or remove subscriptions as a side effect. Notification runs in
    /// ascending watcher-id order so downstream scheduling is deterministic.
    pub fn notify(&self) {
        let snapshot: Vec<_> = {
            let mut subs = self.inner.subs.borrow_mut();
            subs.retain(|(_, weak)| weak.upgrade().is_some());
            let mut live: Vec<_> = subs
                .iter()
                .filter_map(|(_, weak)| weak.upgrade())
                .collect();
            live.sort_by_key(|w| w.id());
            live
        };
        for watcher in snapshot {
            watcher.update();
        }
    }

    pub(crate) fn add_sub(&self, id: WatcherId, watcher: WeakWatcher) {
        let mut subs = self.inner.subs.borrow_mut();
        if !subs.iter().any(|(sub_id, _)| *sub_id == id) {
            subs.push((id, watcher));
        }
    }

    pub(crate) fn remove_sub(&self, id: WatcherId) {
        self.inner
            .subs
            .borrow_mut()
            .retain(|(sub_id, _)| *sub_id != id);
    }

    /// Number of live subscribers.
    pub fn sub_count(&self) -> usize {
        self.inner
            .subs
            .borrow()
            .iter()
            .filter(|(_, weak)| weak.upgrade().is_some())
            .count()
    }
}

impl Default for Dep {
    fn default() -> Dep {
        Dep::new()
    }
}

impl std::fmt::Debug for Dep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.inner.id)
            .field("sub_count", &self.sub_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dep_ids_are_unique() {
        let d1 = Dep::new();
        let d2 = Dep::new();
        let d3 = Dep::new();

        assert_ne!(d1.id(), d2.id());
        assert_ne!(d2.id(), d3.id());
        assert_ne!(d1.id(), d3.id());
    }

    #[test]
    fn depend_without_target_is_noop() {
        let dep = Dep::new();
        dep.depend();
        assert_eq!(dep.sub_count(), 0);
    }

    #[test]
    fn notify_on_empty_dep_is_noop() {
        let dep = Dep::new();
        dep.notify();
    }
}
