//! Batched Flush Scheduler
//!
//! The scheduler deduplicates and orders pending watcher re-runs within one
//! synchronous burst of mutations, then flushes them in a single deferred
//! batch.
//!
//! # Flush Algorithm
//!
//! 1. Sort pending watchers by ascending id. Creation order approximates
//!    declaration order, so parents update before children and a destroyed
//!    parent does not leave its children running pointlessly.
//!
//! 2. Iterate with an explicit cursor rather than a fixed-length traversal:
//!    a watcher queued mid-flush is inserted in sorted position ahead of the
//!    cursor and still runs in the same flush.
//!
//! 3. Guard against runaway circular updates: a watcher that keeps
//!    re-queueing itself past the configured limit is reported and banned
//!    for the remainder of the flush, and the others keep running.
//!
//! A panic inside a non-user watcher's run propagates and aborts the
//! remainder of the flush; such failures indicate a programming defect in
//! the observed computation, not recoverable state.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::tick::next_tick;
use super::watcher::{Watcher, WatcherId};

/// Default bound on how many times one watcher may re-enter a single flush.
const DEFAULT_MAX_UPDATE_COUNT: usize = 100;

struct SchedulerState {
    queue: Vec<Watcher>,
    pending_ids: HashSet<WatcherId>,
    /// Re-entry counts within the current flush.
    circular: HashMap<WatcherId, usize>,
    /// Watchers skipped for the remainder of the current flush.
    banned: HashSet<WatcherId>,
    /// A flush has been scheduled via `next_tick`.
    waiting: bool,
    /// A flush is executing right now.
    flushing: bool,
    /// Cursor into `queue` during a flush.
    index: usize,
    max_update_count: usize,
    on_flushed: Vec<Rc<dyn Fn()>>,
}

thread_local! {
    static SCHEDULER: RefCell<SchedulerState> = RefCell::new(SchedulerState {
        queue: Vec::new(),
        pending_ids: HashSet::new(),
        circular: HashMap::new(),
        banned: HashSet::new(),
        waiting: false,
        flushing: false,
        index: 0,
        max_update_count: DEFAULT_MAX_UPDATE_COUNT,
        on_flushed: Vec::new(),
    });
}

/// Configure the circular-update threshold. The default is 100 re-entries of
/// the same watcher within one flush.
pub fn set_max_update_count(limit: usize) {
    SCHEDULER.with(|state| state.borrow_mut().max_update_count = limit);
}

/// Register a hook invoked after every completed flush.
pub fn on_flushed(hook: impl Fn() + 'static) {
    SCHEDULER.with(|state| state.borrow_mut().on_flushed.push(Rc::new(hook)));
}

/// Enqueue a watcher for the next batched flush.
///
/// Deduplicated by watcher id: a watcher already pending (or banned for this
/// flush) is not enqueued again. When a flush is in progress the watcher is
/// inserted in sorted position ahead of the cursor, so it runs exactly once
/// in the same flush.
pub fn queue_watcher(watcher: &Watcher) {
    let schedule_flush = SCHEDULER.with(|state| {
        let mut state = state.borrow_mut();
        let id = watcher.id();
        if state.pending_ids.contains(&id) || state.banned.contains(&id) {
            return false;
        }
        state.pending_ids.insert(id);

        if !state.flushing {
            state.queue.push(watcher.clone());
        } else {
            // Keep the queue sorted past the cursor.
            let mut i = state.queue.len();
            while i > state.index + 1 && state.queue[i - 1].id() > id {
                i -= 1;
            }
            state.queue.insert(i, watcher.clone());
        }

        if !state.waiting {
            state.waiting = true;
            return true;
        }
        false
    });

    if schedule_flush {
        next_tick(flush_scheduler_queue);
    }
}

/// Run every pending watcher, in ascending id order.
pub fn flush_scheduler_queue() {
    SCHEDULER.with(|state| {
        let mut state = state.borrow_mut();
        state.flushing = true;
        state.index = 0;
        state.queue.sort_by_key(Watcher::id);
    });

    loop {
        // Take the next watcher without holding the borrow across its run:
        // the run may queue further watchers.
        let next = SCHEDULER.with(|state| {
            let mut state = state.borrow_mut();
            if state.index >= state.queue.len() {
                return None;
            }
            let watcher = state.queue[state.index].clone();
            // Clear the pending mark before running, so a mutation performed
            // by the run re-queues the watcher instead of being lost.
            state.pending_ids.remove(&watcher.id());
            Some(watcher)
        });
        let Some(watcher) = next else { break };
        let id = watcher.id();

        let banned = SCHEDULER.with(|state| state.borrow().banned.contains(&id));
        if !banned {
            if let Some(before) = watcher.before_hook() {
                before();
            }
            watcher.run();

            // If the run re-queued this same id, count the re-entry.
            SCHEDULER.with(|state| {
                let mut state = state.borrow_mut();
                if state.pending_ids.contains(&id) {
                    let count = state.circular.entry(id).or_insert(0);
                    *count += 1;
                    if *count > state.max_update_count {
                        tracing::warn!(
                            watcher_id = id,
                            expression = watcher.expression(),
                            "circular update detected; skipping this watcher \
                             for the remainder of the flush"
                        );
                        state.banned.insert(id);
                    }
                }
            });
        }

        SCHEDULER.with(|state| state.borrow_mut().index += 1);
    }

    let hooks = SCHEDULER.with(|state| {
        let mut state = state.borrow_mut();
        state.queue.clear();
        state.pending_ids.clear();
        state.circular.clear();
        state.banned.clear();
        state.index = 0;
        state.waiting = false;
        state.flushing = false;
        state.on_flushed.clone()
    });
    for hook in hooks {
        hook();
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::observe::observe;
    use crate::reactive::tick::run_ticks;
    use crate::reactive::watcher::{watch, WatchOptions, WatchSource};
    use crate::value::Value;
    use std::cell::Cell;

    #[test]
    fn flush_runs_watchers_in_ascending_id_order() {
        let data = Value::map([("a", Value::Int(0))]);
        observe(&data, false);

        let order = Rc::new(RefCell::new(Vec::new()));
        let o1 = Rc::clone(&order);
        let w1 = watch(&data, "a", move |_, _| o1.borrow_mut().push(1), WatchOptions::default());
        let o2 = Rc::clone(&order);
        let w2 = watch(&data, "a", move |_, _| o2.borrow_mut().push(2), WatchOptions::default());
        assert!(w1.id() < w2.id());

        data.as_map().unwrap().set("a", Value::Int(1));
        assert!(order.borrow().is_empty());

        run_ticks();
        assert_eq!(*order.borrow(), vec![1, 2]);
    }

    #[test]
    fn repeated_mutations_coalesce_into_one_run() {
        let data = Value::map([("a", Value::Int(0))]);
        observe(&data, false);

        let calls = Rc::new(Cell::new(0));
        let calls_clone = Rc::clone(&calls);
        let _w = watch(
            &data,
            "a",
            move |_, _| calls_clone.set(calls_clone.get() + 1),
            WatchOptions::default(),
        );

        let map = data.as_map().unwrap();
        map.set("a", Value::Int(1));
        map.set("a", Value::Int(2));
        map.set("a", Value::Int(3));

        run_ticks();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn before_hook_runs_before_each_flushed_run() {
        let data = Value::map([("a", Value::Int(0))]);
        observe(&data, false);

        let order = Rc::new(RefCell::new(Vec::new()));
        let o1 = Rc::clone(&order);
        let o2 = Rc::clone(&order);
        let _w = watch(
            &data,
            "a",
            move |_, _| o1.borrow_mut().push("run"),
            WatchOptions {
                before: Some(Rc::new(move || o2.borrow_mut().push("before"))),
                ..Default::default()
            },
        );

        data.as_map().unwrap().set("a", Value::Int(1));
        run_ticks();
        assert_eq!(*order.borrow(), vec!["before", "run"]);
    }

    #[test]
    fn watcher_queued_mid_flush_runs_in_same_flush() {
        let data = Value::map([("a", Value::Int(0)), ("b", Value::Int(0))]);
        observe(&data, false);

        let order = Rc::new(RefCell::new(Vec::new()));
        let map = data.as_map().unwrap().clone();
        let o1 = Rc::clone(&order);
        let _w1 = watch(
            &data,
            "a",
            move |new, _| {
                o1.borrow_mut().push("a");
                // Triggers the second watcher while the flush is running.
                map.set("b", new.clone());
            },
            WatchOptions::default(),
        );
        let o2 = Rc::clone(&order);
        let _w2 = watch(&data, "b", move |_, _| o2.borrow_mut().push("b"), WatchOptions::default());

        data.as_map().unwrap().set("a", Value::Int(1));
        run_ticks();
        assert_eq!(*order.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn circular_update_is_detected_and_banned() {
        set_max_update_count(3);
        let data = Value::map([("a", Value::Int(0))]);
        observe(&data, false);

        let runs = Rc::new(Cell::new(0i64));
        let runs_clone = Rc::clone(&runs);
        let map = data.as_map().unwrap().clone();
        let _w = watch(
            &data,
            "a",
            move |new, _| {
                runs_clone.set(runs_clone.get() + 1);
                // Re-trigger itself on every run.
                if let Value::Int(n) = new {
                    map.set("a", Value::Int(n + 1));
                }
            },
            WatchOptions::default(),
        );

        data.as_map().unwrap().set("a", Value::Int(1));
        run_ticks();

        // The flush terminated: the watcher ran max_update_count + 1 times
        // before being banned.
        assert_eq!(runs.get(), 4);

        // The ban is per flush: a later mutation fires again.
        let before = runs.get();
        data.as_map().unwrap().set("a", Value::Int(0));
        run_ticks();
        assert!(runs.get() > before);
        set_max_update_count(DEFAULT_MAX_UPDATE_COUNT);
    }

    #[test]
    fn on_flushed_hooks_run_after_the_flush() {
        let data = Value::map([("a", Value::Int(0))]);
        observe(&data, false);

        let order = Rc::new(RefCell::new(Vec::new()));
        let o1 = Rc::clone(&order);
        let _w = watch(&data, "a", move |_, _| o1.borrow_mut().push("run"), WatchOptions::default());

        let o2 = Rc::clone(&order);
        on_flushed(move || o2.borrow_mut().push("flushed"));

        data.as_map().unwrap().set("a", Value::Int(1));
        run_ticks();
        assert_eq!(*order.borrow(), vec!["run", "flushed"]);
    }

    #[test]
    fn sync_watcher_bypasses_the_batch() {
        let data = Value::map([("a", Value::Int(0))]);
        observe(&data, false);

        let order = Rc::new(RefCell::new(Vec::new()));
        let o1 = Rc::clone(&order);
        let _batched = watch(&data, "a", move |_, _| o1.borrow_mut().push("batched"), WatchOptions::default());
        let o2 = Rc::clone(&order);
        let _sync = watch(
            &data,
            "a",
            move |_, _| o2.borrow_mut().push("sync"),
            WatchOptions {
                sync: true,
                ..Default::default()
            },
        );

        data.as_map().unwrap().set("a", Value::Int(1));
        // The sync callback has already run; the batched one has not.
        assert_eq!(*order.borrow(), vec!["sync"]);

        run_ticks();
        assert_eq!(*order.borrow(), vec!["sync", "batched"]);
    }

    #[test]
    fn getter_evaluated_by_source() {
        let data = Value::map([("n", Value::Int(3))]);
        observe(&data, false);

        let map = data.as_map().unwrap().clone();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let _w = watch(
            &data,
            WatchSource::getter(move |_| match map.get("n") {
                Value::Int(n) => Value::Int(n * n),
                _ => Value::Null,
            }),
            move |new, old| seen_clone.borrow_mut().push((old.clone(), new.clone())),
            WatchOptions::default(),
        );

        data.as_map().unwrap().set("n", Value::Int(4));
        run_ticks();
        assert_eq!(*seen.borrow(), vec![(Value::Int(9), Value::Int(16))]);
    }
}
