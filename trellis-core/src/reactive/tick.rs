//! Deferred Callback Queue
//!
//! The scheduler coalesces watcher re-runs within one synchronous burst of
//! mutations by deferring the flush to a microtask-equivalent boundary. What
//! counts as that boundary depends on the host, so the queue is driven from
//! outside:
//!
//! - [`next_tick`] enqueues a callback; the first callback of a burst fires
//!   the installed host hook so an embedding event loop can schedule a drain.
//!
//! - [`run_ticks`] drains the queue to quiescence. A callback queued during
//!   the drain runs in the same drain. Hosts without a deferred-callback
//!   primitive simply call this explicitly after mutating state.

use std::cell::RefCell;
use std::rc::Rc;

struct TickState {
    callbacks: Vec<Box<dyn FnOnce()>>,
    /// A drain has been requested and not yet started.
    pending: bool,
    /// `run_ticks` is on the stack; suppresses re-firing the host hook.
    draining: bool,
    hook: Option<Rc<dyn Fn()>>,
}

thread_local! {
    static TICKS: RefCell<TickState> = RefCell::new(TickState {
        callbacks: Vec::new(),
        pending: false,
        draining: false,
        hook: None,
    });
}

/// Defer a callback to the next drain.
pub fn next_tick(callback: impl FnOnce() + 'static) {
    let fire = TICKS.with(|state| {
        let mut state = state.borrow_mut();
        state.callbacks.push(Box::new(callback));
        if !state.pending {
            state.pending = true;
            if !state.draining {
                return state.hook.clone();
            }
        }
        None
    });
    if let Some(hook) = fire {
        hook();
    }
}

/// Drain the deferred-callback queue until it is empty.
pub fn run_ticks() {
    TICKS.with(|state| state.borrow_mut().draining = true);
    loop {
        let batch = TICKS.with(|state| {
            let mut state = state.borrow_mut();
            state.pending = false;
            std::mem::take(&mut state.callbacks)
        });
        if batch.is_empty() {
            break;
        }
        for callback in batch {
            callback();
        }
    }
    TICKS.with(|state| state.borrow_mut().draining = false);
}

/// Install the host's deferred-callback primitive.
///
/// The hook is fired once per burst, on the first `next_tick` of that burst;
/// the host is expected to arrange a later call to [`run_ticks`].
pub fn set_tick_hook(hook: impl Fn() + 'static) {
    TICKS.with(|state| state.borrow_mut().hook = Some(Rc::new(hook)));
}

/// Remove the installed host hook.
pub fn clear_tick_hook() {
    TICKS.with(|state| state.borrow_mut().hook = None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn callbacks_run_in_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        for n in 0..3 {
            let order = Rc::clone(&order);
            next_tick(move || order.borrow_mut().push(n));
        }
        run_ticks();
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn callback_queued_during_drain_runs_in_same_drain() {
        let ran = Rc::new(Cell::new(false));
        let ran_clone = Rc::clone(&ran);
        next_tick(move || {
            let ran = Rc::clone(&ran_clone);
            next_tick(move || ran.set(true));
        });
        run_ticks();
        assert!(ran.get());
    }

    #[test]
    fn hook_fires_once_per_burst() {
        let fired = Rc::new(Cell::new(0));
        let fired_clone = Rc::clone(&fired);
        set_tick_hook(move || fired_clone.set(fired_clone.get() + 1));

        next_tick(|| {});
        next_tick(|| {});
        assert_eq!(fired.get(), 1);

        run_ticks();
        next_tick(|| {});
        assert_eq!(fired.get(), 2);

        run_ticks();
        clear_tick_hook();
    }
}
