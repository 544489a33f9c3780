//! Ordered Container
//!
//! A [`ListRef`] is the observed form of an array. Index-based access cannot
//! be intercepted per-element the way named fields can, so structural change
//! tracking works differently: the list owns an API of mutating methods, and
//! every one of them observes any newly introduced elements and notifies the
//! container's structural dependency set.
//!
//! Plain index reads (`get`) and raw index writes (`set_index`) are
//! deliberately uninstrumented, mirroring the plain-assignment hole on keyed
//! containers; the structural entry points `set`/`del` route index mutation
//! through `splice` so it stays visible.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::reactive::observe::{observe, Observation};
use crate::value::Value;

pub(crate) struct ListData {
    pub(crate) items: Vec<Value>,
    pub(crate) observation: Option<Rc<Observation>>,
    pub(crate) frozen: bool,
}

/// Shared handle to an ordered container. Cloning the handle aliases the data.
#[derive(Clone)]
pub struct ListRef {
    inner: Rc<RefCell<ListData>>,
}

impl ListRef {
    pub fn new(items: Vec<Value>) -> ListRef {
        ListRef {
            inner: Rc::new(RefCell::new(ListData {
                items,
                observation: None,
                frozen: false,
            })),
        }
    }

    /// Identity comparison: do both handles alias the same container?
    pub fn ptr_eq(&self, other: &ListRef) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().items.is_empty()
    }

    /// Plain element read. Out-of-range reads yield `Null`.
    pub fn get(&self, index: usize) -> Value {
        self.inner
            .borrow()
            .items
            .get(index)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Raw in-place overwrite, invisible to tracking. Use the structural
    /// `set` entry point for a tracked replacement.
    pub fn set_index(&self, index: usize, value: Value) {
        let mut data = self.inner.borrow_mut();
        if data.frozen {
            return;
        }
        if let Some(slot) = data.items.get_mut(index) {
            *slot = value;
        }
    }

    /// Grow the list with `Null` up to `index` elements, without notifying.
    pub(crate) fn pad_to(&self, index: usize) {
        let mut data = self.inner.borrow_mut();
        if data.frozen {
            return;
        }
        while data.items.len() < index {
            data.items.push(Value::Null);
        }
    }

    pub fn push(&self, value: Value) {
        if self.refuse_if_frozen("push") {
            return;
        }
        self.inner.borrow_mut().items.push(value.clone());
        self.observe_inserted(&[value]);
        self.notify_structural();
    }

    pub fn pop(&self) -> Option<Value> {
        if self.refuse_if_frozen("pop") {
            return None;
        }
        let removed = self.inner.borrow_mut().items.pop();
        self.notify_structural();
        removed
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Option<Value> {
        if self.refuse_if_frozen("shift") {
            return None;
        }
        let removed = {
            let mut data = self.inner.borrow_mut();
            if data.items.is_empty() {
                None
            } else {
                Some(data.items.remove(0))
            }
        };
        self.notify_structural();
        removed
    }

    /// Prepend an element.
    pub fn unshift(&self, value: Value) {
        if self.refuse_if_frozen("unshift") {
            return;
        }
        self.inner.borrow_mut().items.insert(0, value.clone());
        self.observe_inserted(&[value]);
        self.notify_structural();
    }

    pub fn insert(&self, index: usize, value: Value) {
        if self.refuse_if_frozen("insert") {
            return;
        }
        {
            let mut data = self.inner.borrow_mut();
            let index = index.min(data.items.len());
            data.items.insert(index, value.clone());
        }
        self.observe_inserted(&[value]);
        self.notify_structural();
    }

    pub fn remove(&self, index: usize) -> Option<Value> {
        if self.refuse_if_frozen("remove") {
            return None;
        }
        let removed = {
            let mut data = self.inner.borrow_mut();
            if index < data.items.len() {
                Some(data.items.remove(index))
            } else {
                None
            }
        };
        self.notify_structural();
        removed
    }

    /// Remove `delete_count` elements starting at `start`, inserting `items`
    /// in their place. Returns the removed elements. Ranges are clamped.
    pub fn splice(&self, start: usize, delete_count: usize, items: Vec<Value>) -> Vec<Value> {
        if self.refuse_if_frozen("splice") {
            return Vec::new();
        }
        let removed: Vec<Value> = {
            let mut data = self.inner.borrow_mut();
            let len = data.items.len();
            let start = start.min(len);
            let end = start.saturating_add(delete_count).min(len);
            data.items.splice(start..end, items.clone()).collect()
        };
        self.observe_inserted(&items);
        self.notify_structural();
        removed
    }

    /// Sort in place with a comparator.
    ///
    /// The items are moved out of the cell for the duration of the sort so a
    /// comparator that reads back through the list cannot alias the borrow.
    pub fn sort_by(&self, mut compare: impl FnMut(&Value, &Value) -> Ordering) {
        if self.refuse_if_frozen("sort_by") {
            return;
        }
        let mut items = std::mem::take(&mut self.inner.borrow_mut().items);
        items.sort_by(|a, b| compare(a, b));
        self.inner.borrow_mut().items = items;
        self.notify_structural();
    }

    pub fn reverse(&self) {
        if self.refuse_if_frozen("reverse") {
            return;
        }
        self.inner.borrow_mut().items.reverse();
        self.notify_structural();
    }

    /// Mark the container non-extensible: observation skips it and all
    /// mutators become no-ops.
    pub fn freeze(&self) {
        self.inner.borrow_mut().frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.inner.borrow().frozen
    }

    /// The container's observation record, if it has been observed.
    pub fn observation(&self) -> Option<Rc<Observation>> {
        self.inner.borrow().observation.clone()
    }

    pub(crate) fn set_observation(&self, ob: Rc<Observation>) {
        self.inner.borrow_mut().observation = Some(ob);
    }

    /// Newly introduced elements need their own tracking when the list is
    /// observed.
    fn observe_inserted(&self, items: &[Value]) {
        if self.observation().is_some() {
            for item in items {
                observe(item, false);
            }
        }
    }

    fn notify_structural(&self) {
        if let Some(ob) = self.observation() {
            ob.dep().notify();
        }
    }

    fn refuse_if_frozen(&self, op: &str) -> bool {
        if self.inner.borrow().frozen {
            tracing::warn!(operation = op, "ignoring mutation of a frozen list");
            return true;
        }
        false
    }
}

impl fmt::Debug for ListRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.inner.borrow();
        f.debug_struct("ListRef")
            .field("len", &data.items.len())
            .field("observed", &data.observation.is_some())
            .field("frozen", &data.frozen)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
