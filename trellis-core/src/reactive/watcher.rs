//! Watcher Implementation
//!
//! A Watcher wraps a getter computation, evaluates it inside a tracking
//! scope so every dependency set it reads gets linked to it, and re-runs
//! when any of those locations later change.
//!
//! # How Watchers Work
//!
//! 1. `get()` pushes the watcher as the tracking target and evaluates the
//!    getter. Every tracked read routes through `add_dep`.
//!
//! 2. After evaluation, `cleanup_deps` unsubscribes from any dependency set
//!    touched last cycle but not this one. Dependencies legitimately drop
//!    when a getter takes a different code path.
//!
//! 3. On notification, the watcher either marks itself dirty (lazy), re-runs
//!    immediately (sync), or enqueues itself in the scheduler (default).
//!
//! # Modes
//!
//! - `deep`: exhaustively touch the result's whole subtree after evaluation,
//!   so mutations anywhere inside it notify this watcher.
//! - `user`: the getter and callback are developer-authored; panics are
//!   caught and reported through the error channel instead of propagating.
//! - `lazy`: never auto re-evaluates; notification only marks dirty, and
//!   `evaluate()` refreshes on demand. Used for cached derived values.
//! - `sync`: re-runs inside `notify()` instead of waiting for a flush.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use super::context;
use super::dep::Dep;
use super::path::{make_path_getter, parse_path};
use super::scheduler::queue_watcher;
use super::traverse::traverse;
use crate::error;
use crate::value::Value;

/// Unique, monotonically increasing watcher identity. Doubles as the
/// scheduling sort key: creation order approximates parent-before-child.
pub type WatcherId = u64;

/// Counter for generating unique watcher IDs.
static WATCHER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a new unique watcher ID.
fn next_watcher_id() -> WatcherId {
    WATCHER_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Callback invoked with `(new_value, old_value)` when a watched result
/// changes.
pub type WatchCallback = Rc<dyn Fn(&Value, &Value)>;

/// What a watcher evaluates: a getter closure over the state root, or a
/// dot-path expression into it.
pub enum WatchSource {
    Getter(Box<dyn Fn(&Value) -> Value>),
    Path(String),
}

impl WatchSource {
    pub fn getter(f: impl Fn(&Value) -> Value + 'static) -> WatchSource {
        WatchSource::Getter(Box::new(f))
    }

    pub fn path(path: impl Into<String>) -> WatchSource {
        WatchSource::Path(path.into())
    }
}

impl From<&str> for WatchSource {
    fn from(path: &str) -> WatchSource {
        WatchSource::path(path)
    }
}

impl From<String> for WatchSource {
    fn from(path: String) -> WatchSource {
        WatchSource::Path(path)
    }
}

/// Behavior flags for a watcher. See the module docs for what each mode does.
#[derive(Default, Clone)]
pub struct WatchOptions {
    pub deep: bool,
    pub user: bool,
    pub lazy: bool,
    pub sync: bool,
    /// Invoked by the scheduler right before each batched re-run.
    pub before: Option<Rc<dyn Fn()>>,
}

pub(crate) struct WatcherInner {
    id: WatcherId,
    root: Value,
    getter: Box<dyn Fn(&Value) -> Value>,
    cb: Option<WatchCallback>,
    deep: bool,
    user: bool,
    lazy: bool,
    sync: bool,
    before: Option<Rc<dyn Fn()>>,
    active: Cell<bool>,
    dirty: Cell<bool>,
    value: RefCell<Value>,
    /// Dependency sets linked in the previous evaluation cycle.
    deps: RefCell<SmallVec<[Dep; 4]>>,
    dep_ids: RefCell<HashSet<u64>>,
    /// Dependency sets collected during the current evaluation.
    new_deps: RefCell<SmallVec<[Dep; 4]>>,
    new_dep_ids: RefCell<HashSet<u64>>,
    /// Source expression, kept for diagnostics.
    expression: String,
    registry: Option<Weak<RegistryInner>>,
}

/// A computation that re-runs when any state it previously read changes.
///
/// The handle is cheap to clone; all clones alias the same watcher. The
/// handle doubles as the disposer: call [`Watcher::teardown`] to unlink it.
#[derive(Clone)]
pub struct Watcher {
    inner: Rc<WatcherInner>,
}

/// Weak handle stored in dependency sets, so a dropped watcher does not keep
/// itself alive through its own subscriptions.
#[derive(Clone)]
pub(crate) struct WeakWatcher {
    inner: Weak<WatcherInner>,
}

impl WeakWatcher {
    pub(crate) fn upgrade(&self) -> Option<Watcher> {
        self.inner.upgrade().map(|inner| Watcher { inner })
    }
}

impl Watcher {
    /// Create a watcher over `root`.
    ///
    /// An unparsable path source is reported through the diagnostic channel
    /// and replaced by a no-op getter evaluating to `Null`; construction
    /// never fails. Non-lazy watchers evaluate immediately; lazy watchers
    /// start dirty.
    pub fn new(
        root: Value,
        source: WatchSource,
        cb: Option<WatchCallback>,
        options: WatchOptions,
        registry: Option<&WatcherRegistry>,
    ) -> Watcher {
        let (getter, expression): (Box<dyn Fn(&Value) -> Value>, String) = match source {
            WatchSource::Getter(f) => (f, "<getter fn>".to_string()),
            WatchSource::Path(path) => match parse_path(&path) {
                Some(segments) => (Box::new(make_path_getter(segments)), path),
                None => {
                    tracing::warn!(
                        path = %path,
                        "failed watching path: only simple dot-delimited paths \
                         are accepted; use a getter for full control"
                    );
                    (Box::new(|_: &Value| Value::Null), path)
                }
            },
        };

        let lazy = options.lazy;
        let watcher = Watcher {
            inner: Rc::new(WatcherInner {
                id: next_watcher_id(),
                root,
                getter,
                cb,
                deep: options.deep,
                user: options.user,
                lazy,
                sync: options.sync,
                before: options.before,
                active: Cell::new(true),
                dirty: Cell::new(lazy),
                value: RefCell::new(Value::Null),
                deps: RefCell::new(SmallVec::new()),
                dep_ids: RefCell::new(HashSet::new()),
                new_deps: RefCell::new(SmallVec::new()),
                new_dep_ids: RefCell::new(HashSet::new()),
                expression,
                registry: registry.map(|r| Rc::downgrade(&r.inner)),
            }),
        };

        if let Some(registry) = registry {
            registry.inner.watchers.borrow_mut().push(watcher.clone());
        }
        if !lazy {
            let value = watcher.get();
            *watcher.inner.value.borrow_mut() = value;
        }
        watcher
    }

    pub fn id(&self) -> WatcherId {
        self.inner.id
    }

    /// The last evaluated result.
    pub fn value(&self) -> Value {
        self.inner.value.borrow().clone()
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Whether a lazy watcher needs re-evaluation.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Number of dependency sets this watcher is currently linked to.
    pub fn dep_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }

    pub(crate) fn expression(&self) -> &str {
        &self.inner.expression
    }

    pub(crate) fn before_hook(&self) -> Option<Rc<dyn Fn()>> {
        self.inner.before.clone()
    }

    pub(crate) fn downgrade(&self) -> WeakWatcher {
        WeakWatcher {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Evaluate the getter inside a tracking scope and reconcile dependency
    /// links afterwards, including when the getter unwinds.
    pub fn get(&self) -> Value {
        // Guards drop in reverse order: the tracking target pops first, then
        // reconciliation runs. Both must happen on the unwind path too, or a
        // panicked evaluation leaves its partial subscriptions linked.
        let _reconcile = ReconcileGuard { watcher: self };
        let _target = context::push_target(Some(self.clone()));

        let value = if self.inner.user {
            let ctx = format!("getter for watcher \"{}\"", self.inner.expression);
            error::invoke_with_handling(&ctx, || (self.inner.getter)(&self.inner.root))
                .unwrap_or(Value::Null)
        } else {
            (self.inner.getter)(&self.inner.root)
        };

        // Touch every reachable field so the whole subtree is tracked.
        if self.inner.deep {
            traverse(&value);
        }
        value
    }

    /// Link a dependency set touched during the current evaluation.
    ///
    /// Deduplicated per evaluation by dep identity; actually subscribes only
    /// when the dep was not already linked in the previous cycle.
    pub(crate) fn add_dep(&self, dep: &Dep) {
        let id = dep.id();
        let mut new_ids = self.inner.new_dep_ids.borrow_mut();
        if new_ids.insert(id) {
            self.inner.new_deps.borrow_mut().push(dep.clone());
            if !self.inner.dep_ids.borrow().contains(&id) {
                dep.add_sub(self.inner.id, self.downgrade());
            }
        }
    }

    /// Unsubscribe from dependency sets not touched this cycle, then swap
    /// the collections by move. Runs in O(touched deps).
    fn cleanup_deps(&self) {
        {
            let new_ids = self.inner.new_dep_ids.borrow();
            for dep in self.inner.deps.borrow().iter() {
                if !new_ids.contains(&dep.id()) {
                    dep.remove_sub(self.inner.id);
                }
            }
        }
        std::mem::swap(
            &mut *self.inner.deps.borrow_mut(),
            &mut *self.inner.new_deps.borrow_mut(),
        );
        std::mem::swap(
            &mut *self.inner.dep_ids.borrow_mut(),
            &mut *self.inner.new_dep_ids.borrow_mut(),
        );
        self.inner.new_deps.borrow_mut().clear();
        self.inner.new_dep_ids.borrow_mut().clear();
    }

    /// Subscriber interface, called when a dependency set notifies.
    pub fn update(&self) {
        if self.inner.lazy {
            self.inner.dirty.set(true);
        } else if self.inner.sync {
            self.run();
        } else {
            queue_watcher(self);
        }
    }

    /// Re-evaluate and invoke the callback when the result changed.
    ///
    /// The callback also fires when the result is a container (it may have
    /// mutated internally without changing identity) or the watcher is deep.
    pub fn run(&self) {
        if !self.inner.active.get() {
            return;
        }
        let value = self.get();
        let old = self.inner.value.borrow().clone();
        if !value.same_as(&old) || value.is_container() || self.inner.deep {
            *self.inner.value.borrow_mut() = value.clone();
            if let Some(cb) = &self.inner.cb {
                if self.inner.user {
                    let ctx = format!("callback for watcher \"{}\"", self.inner.expression);
                    error::invoke_with_handling(&ctx, || cb(&value, &old));
                } else {
                    cb(&value, &old);
                }
            }
        }
    }

    /// Force an evaluation and clear the dirty flag. Only meaningful for
    /// lazy watchers.
    pub fn evaluate(&self) {
        let value = self.get();
        *self.inner.value.borrow_mut() = value;
        self.inner.dirty.set(false);
    }

    /// Propagate `depend()` to every dependency set this watcher holds.
    ///
    /// Used when a lazy watcher's cached value is read inside an enclosing
    /// watcher's evaluation: the outer watcher inherits the inner one's
    /// dependencies.
    pub fn depend(&self) {
        for dep in self.inner.deps.borrow().iter() {
            dep.depend();
        }
    }

    /// Unlink from every dependency set and mark inactive. Idempotent.
    pub fn teardown(&self) {
        if !self.inner.active.get() {
            return;
        }
        // Removal from the owning registry is skipped during bulk destroy.
        if let Some(registry) = self.inner.registry.as_ref().and_then(Weak::upgrade) {
            if !registry.destroying.get() {
                registry
                    .watchers
                    .borrow_mut()
                    .retain(|w| w.id() != self.inner.id);
            }
        }
        {
            let deps = self.inner.deps.borrow();
            for dep in deps.iter() {
                dep.remove_sub(self.inner.id);
            }
        }
        self.inner.deps.borrow_mut().clear();
        self.inner.dep_ids.borrow_mut().clear();
        self.inner.active.set(false);
    }
}

/// Reconciles dependency links when an evaluation scope ends, whether it
/// returned or unwound.
struct ReconcileGuard<'a> {
    watcher: &'a Watcher,
}

impl Drop for ReconcileGuard<'_> {
    fn drop(&mut self) {
        self.watcher.cleanup_deps();
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.inner.id)
            .field("expression", &self.inner.expression)
            .field("active", &self.inner.active.get())
            .field("dirty", &self.inner.dirty.get())
            .field("dep_count", &self.dep_count())
            .finish()
    }
}

struct RegistryInner {
    watchers: RefCell<Vec<Watcher>>,
    destroying: Cell<bool>,
}

/// The watcher list of one owning consumer (a component instance, in the
/// surrounding framework), supporting bulk teardown when the owner is
/// destroyed.
#[derive(Clone)]
pub struct WatcherRegistry {
    inner: Rc<RegistryInner>,
}

impl WatcherRegistry {
    pub fn new() -> WatcherRegistry {
        WatcherRegistry {
            inner: Rc::new(RegistryInner {
                watchers: RefCell::new(Vec::new()),
                destroying: Cell::new(false),
            }),
        }
    }

    /// Create a watcher owned by this registry.
    pub fn watch(
        &self,
        root: &Value,
        source: impl Into<WatchSource>,
        cb: impl Fn(&Value, &Value) + 'static,
        options: WatchOptions,
    ) -> Watcher {
        Watcher::new(
            root.clone(),
            source.into(),
            Some(Rc::new(cb)),
            options,
            Some(self),
        )
    }

    pub fn len(&self) -> usize {
        self.inner.watchers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.watchers.borrow().is_empty()
    }

    /// Tear down every owned watcher.
    ///
    /// The destroying flag lets individual teardowns skip the (linear)
    /// registry removal they would otherwise perform.
    pub fn destroy_all(&self) {
        self.inner.destroying.set(true);
        let watchers = std::mem::take(&mut *self.inner.watchers.borrow_mut());
        for watcher in &watchers {
            watcher.teardown();
        }
        self.inner.destroying.set(false);
    }
}

impl Default for WatcherRegistry {
    fn default() -> WatcherRegistry {
        WatcherRegistry::new()
    }
}

/// Create a standalone watcher: evaluate `source` against `root` and invoke
/// `cb` with `(new, old)` whenever the result changes.
///
/// The returned handle is the disposer; call [`Watcher::teardown`] on it.
pub fn watch(
    root: &Value,
    source: impl Into<WatchSource>,
    cb: impl Fn(&Value, &Value) + 'static,
    options: WatchOptions,
) -> Watcher {
    Watcher::new(root.clone(), source.into(), Some(Rc::new(cb)), options, None)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::observe::observe;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<i32>>, impl Fn(&Value, &Value) + 'static) {
        let count = Rc::new(Cell::new(0));
        let count_clone = Rc::clone(&count);
        (count, move |_: &Value, _: &Value| {
            count_clone.set(count_clone.get() + 1)
        })
    }

    #[test]
    fn sync_watcher_fires_on_change() {
        let data = Value::map([("count", Value::Int(0))]);
        observe(&data, false);

        let (calls, cb) = counter();
        let _w = watch(
            &data,
            "count",
            cb,
            WatchOptions {
                sync: true,
                ..Default::default()
            },
        );

        data.as_map().unwrap().set("count", Value::Int(1));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn same_value_write_does_not_fire() {
        let data = Value::map([("count", Value::Int(0))]);
        observe(&data, false);

        let (calls, cb) = counter();
        let _w = watch(
            &data,
            "count",
            cb,
            WatchOptions {
                sync: true,
                ..Default::default()
            },
        );

        data.as_map().unwrap().set("count", Value::Int(0));
        data.as_map().unwrap().set("count", Value::Int(0));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn reading_a_field_twice_links_one_subscription() {
        let data = Value::map([("a", Value::Int(1))]);
        observe(&data, false);

        let root = data.clone();
        let w = watch(
            &data,
            WatchSource::getter(move |_| {
                let map = root.as_map().map(|m| m.clone());
                if let Some(map) = map {
                    map.get("a");
                    map.get("a");
                    map.get("a");
                }
                Value::Null
            }),
            |_, _| {},
            WatchOptions {
                sync: true,
                ..Default::default()
            },
        );

        assert_eq!(w.dep_count(), 1);
    }

    #[test]
    fn dependencies_drop_when_code_path_changes() {
        let data = Value::map([
            ("which", Value::Bool(true)),
            ("a", Value::Int(1)),
            ("b", Value::Int(2)),
        ]);
        observe(&data, false);

        let root = data.as_map().unwrap().clone();
        let w = watch(
            &data,
            WatchSource::getter(move |_| {
                if root.get("which") == Value::Bool(true) {
                    root.get("a")
                } else {
                    root.get("b")
                }
            }),
            |_, _| {},
            WatchOptions {
                sync: true,
                ..Default::default()
            },
        );

        // which + a
        assert_eq!(w.dep_count(), 2);

        data.as_map().unwrap().set("which", Value::Bool(false));
        // which + b; the link to a is gone
        assert_eq!(w.dep_count(), 2);

        let (calls, cb) = counter();
        let _probe = watch(
            &data,
            "a",
            cb,
            WatchOptions {
                sync: true,
                ..Default::default()
            },
        );
        drop(w);
        data.as_map().unwrap().set("a", Value::Int(10));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn panicked_evaluation_reconciles_dependencies() {
        use std::panic::{catch_unwind, AssertUnwindSafe};

        let data = Value::map([
            ("sel", Value::Int(0)),
            ("x", Value::Int(1)),
            ("y", Value::Int(2)),
        ]);
        observe(&data, false);

        let evals = Rc::new(Cell::new(0));
        let evals_clone = Rc::clone(&evals);
        let root = data.as_map().unwrap().clone();
        let w = watch(
            &data,
            WatchSource::getter(move |_| {
                evals_clone.set(evals_clone.get() + 1);
                match root.get("sel") {
                    Value::Int(1) => {
                        root.get("x");
                        panic!("getter failure");
                    }
                    Value::Int(2) => root.get("y"),
                    _ => Value::Null,
                }
            }),
            |_, _| {},
            WatchOptions {
                sync: true,
                ..Default::default()
            },
        );
        // sel only
        assert_eq!(w.dep_count(), 1);

        let result = catch_unwind(AssertUnwindSafe(|| {
            data.as_map().unwrap().set("sel", Value::Int(1))
        }));
        assert!(result.is_err());
        // The aborted evaluation read sel and x; both links survived the
        // unwind as the current generation.
        assert_eq!(w.dep_count(), 2);

        data.as_map().unwrap().set("sel", Value::Int(2));
        // sel + y; the link to x from the panicked run is gone.
        assert_eq!(w.dep_count(), 2);

        let evaluated = evals.get();
        data.as_map().unwrap().set("x", Value::Int(99));
        assert_eq!(evals.get(), evaluated);

        data.as_map().unwrap().set("y", Value::Int(20));
        assert_eq!(evals.get(), evaluated + 1);
    }

    #[test]
    fn lazy_watcher_marks_dirty_instead_of_running() {
        let data = Value::map([("n", Value::Int(2))]);
        observe(&data, false);

        let evals = Rc::new(Cell::new(0));
        let evals_clone = Rc::clone(&evals);
        let root = data.as_map().unwrap().clone();
        let lazy = Watcher::new(
            data.clone(),
            WatchSource::getter(move |_| {
                evals_clone.set(evals_clone.get() + 1);
                match root.get("n") {
                    Value::Int(n) => Value::Int(n * 2),
                    _ => Value::Null,
                }
            }),
            None,
            WatchOptions {
                lazy: true,
                ..Default::default()
            },
            None,
        );

        // Lazy: not evaluated at construction.
        assert_eq!(evals.get(), 0);
        assert!(lazy.is_dirty());

        lazy.evaluate();
        assert_eq!(lazy.value(), Value::Int(4));
        assert!(!lazy.is_dirty());

        data.as_map().unwrap().set("n", Value::Int(5));
        // Notification only marks dirty.
        assert_eq!(evals.get(), 1);
        assert!(lazy.is_dirty());

        lazy.evaluate();
        assert_eq!(lazy.value(), Value::Int(10));
    }

    #[test]
    fn depend_propagates_inner_deps_to_outer_watcher() {
        let data = Value::map([("n", Value::Int(1))]);
        observe(&data, false);

        let root = data.as_map().unwrap().clone();
        let lazy = Watcher::new(
            data.clone(),
            WatchSource::getter(move |_| root.get("n")),
            None,
            WatchOptions {
                lazy: true,
                ..Default::default()
            },
            None,
        );

        let (calls, cb) = counter();
        let lazy_clone = lazy.clone();
        let _outer = watch(
            &data,
            WatchSource::getter(move |_| {
                if lazy_clone.is_dirty() {
                    lazy_clone.evaluate();
                }
                lazy_clone.depend();
                lazy_clone.value()
            }),
            cb,
            WatchOptions {
                sync: true,
                ..Default::default()
            },
        );

        data.as_map().unwrap().set("n", Value::Int(2));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn untracked_reads_do_not_subscribe() {
        let data = Value::map([("a", Value::Int(1))]);
        observe(&data, false);

        let root = data.as_map().unwrap().clone();
        let w = watch(
            &data,
            WatchSource::getter(move |_| {
                crate::reactive::context::untracked(|| root.get("a"))
            }),
            |_, _| {},
            WatchOptions {
                sync: true,
                ..Default::default()
            },
        );

        assert_eq!(w.dep_count(), 0);
    }

    #[test]
    fn teardown_stops_notifications() {
        let data = Value::map([("a", Value::Int(1))]);
        observe(&data, false);

        let (calls, cb) = counter();
        let w = watch(
            &data,
            "a",
            cb,
            WatchOptions {
                sync: true,
                ..Default::default()
            },
        );

        w.teardown();
        w.teardown(); // idempotent
        assert!(!w.is_active());

        data.as_map().unwrap().set("a", Value::Int(2));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn invalid_path_installs_noop_getter() {
        let data = Value::map([("a", Value::Int(1))]);
        observe(&data, false);

        let (calls, cb) = counter();
        let w = watch(
            &data,
            "a[0].bad",
            cb,
            WatchOptions {
                sync: true,
                user: true,
                ..Default::default()
            },
        );

        assert_eq!(w.value(), Value::Null);
        data.as_map().unwrap().set("a", Value::Int(2));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn user_getter_panic_is_caught() {
        let data = Value::map([("a", Value::Int(1))]);
        observe(&data, false);

        let w = Watcher::new(
            data.clone(),
            WatchSource::getter(|_| panic!("user bug")),
            None,
            WatchOptions {
                user: true,
                ..Default::default()
            },
            None,
        );
        assert_eq!(w.value(), Value::Null);
    }

    #[test]
    fn registry_destroy_all_tears_down_watchers() {
        let data = Value::map([("a", Value::Int(1))]);
        observe(&data, false);

        let registry = WatcherRegistry::new();
        let (calls, cb) = counter();
        let w1 = registry.watch(
            &data,
            "a",
            cb,
            WatchOptions {
                sync: true,
                ..Default::default()
            },
        );
        let w2 = registry.watch(&data, "a", |_, _| {}, WatchOptions::default());
        assert_eq!(registry.len(), 2);

        registry.destroy_all();
        assert!(registry.is_empty());
        assert!(!w1.is_active());
        assert!(!w2.is_active());

        data.as_map().unwrap().set("a", Value::Int(2));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn teardown_removes_from_registry() {
        let data = Value::map([("a", Value::Int(1))]);
        let registry = WatcherRegistry::new();
        let w = registry.watch(&data, "a", |_, _| {}, WatchOptions::default());
        assert_eq!(registry.len(), 1);

        w.teardown();
        assert!(registry.is_empty());
    }
}
