//! Keyed Container
//!
//! A [`MapRef`] is the observed form of a plain object: an insertion-ordered
//! set of named fields. Each field is backed by a [`FieldSlot`] which, once
//! instrumented by `define_reactive`, carries the per-field dependency set
//! and routes every read and write through the tracking machinery.
//!
//! # Read Path
//!
//! Reading an instrumented field inside a tracking scope links the active
//! watcher to the field's dependency set, and additionally to the structural
//! dependency set of the field's child container (so `set`/`del` on the
//! nested value stays visible). Reading a plain (uninstrumented) field is a
//! raw load.
//!
//! # Write Path
//!
//! Writing an instrumented field short-circuits when the new value is
//! `same_as` the old one, re-observes the replacement value, and notifies the
//! field's dependency set. Writing a plain field is a raw store, invisible to
//! tracking; the structural entry points `set`/`del` exist to close that hole.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::reactive::context;
use crate::reactive::dep::Dep;
use crate::reactive::observe::{depend_list, observe, Observation};
use crate::value::Value;

/// A pre-existing accessor that computes a field's value on read.
pub type FieldGetter = Rc<dyn Fn(&MapRef) -> Value>;

/// A pre-existing accessor that receives a field's value on write.
pub type FieldSetter = Rc<dyn Fn(&MapRef, Value)>;

/// Per-field interceptor state.
///
/// A slot starts plain (just a value). `define_reactive` instruments it by
/// installing a dependency set; from then on reads track and writes notify.
pub(crate) struct FieldSlot {
    /// Backing value. Unused on reads when a getter is present.
    pub(crate) value: Value,
    /// Present once the field is instrumented.
    pub(crate) dep: Option<Dep>,
    /// Pre-existing accessors, preserved by instrumentation.
    pub(crate) getter: Option<FieldGetter>,
    pub(crate) setter: Option<FieldSetter>,
    /// Observation record of the field's value, when it is a container.
    /// Captured at instrumentation time and replaced on every accepted write.
    pub(crate) child_ob: Option<Rc<Observation>>,
    /// Shallow fields do not observe their values.
    pub(crate) shallow: bool,
    /// Diagnostic side-channel invoked on every accepted write.
    pub(crate) change_hook: Option<Rc<dyn Fn()>>,
    /// Cleared by `freeze`; non-configurable slots cannot be instrumented.
    pub(crate) configurable: bool,
}

impl FieldSlot {
    pub(crate) fn plain(value: Value) -> FieldSlot {
        FieldSlot {
            value,
            dep: None,
            getter: None,
            setter: None,
            child_ob: None,
            shallow: false,
            change_hook: None,
            configurable: true,
        }
    }
}

pub(crate) struct MapData {
    pub(crate) entries: IndexMap<String, FieldSlot>,
    pub(crate) observation: Option<Rc<Observation>>,
    pub(crate) frozen: bool,
    pub(crate) internal: bool,
}

/// Shared handle to a keyed container. Cloning the handle aliases the data.
#[derive(Clone)]
pub struct MapRef {
    inner: Rc<RefCell<MapData>>,
}

impl MapRef {
    pub fn new() -> MapRef {
        MapRef::from_entries::<String, _>([])
    }

    pub fn from_entries<K, I>(entries: I) -> MapRef
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.into(), FieldSlot::plain(v)))
            .collect();
        MapRef {
            inner: Rc::new(RefCell::new(MapData {
                entries,
                observation: None,
                frozen: false,
                internal: false,
            })),
        }
    }

    /// Identity comparison: do both handles alias the same container?
    pub fn ptr_eq(&self, other: &MapRef) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.borrow().entries.contains_key(key)
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.borrow().entries.keys().cloned().collect()
    }

    /// Read a field through the tracked path.
    ///
    /// Inside a tracking scope this links the active watcher to the field's
    /// dependency set, and to the structural dependency set of the field's
    /// child container when present. Missing keys read as `Null`.
    pub fn get(&self, key: &str) -> Value {
        let (getter, stored, dep, child_ob) = {
            let data = self.inner.borrow();
            match data.entries.get(key) {
                Some(slot) => (
                    slot.getter.clone(),
                    slot.value.clone(),
                    slot.dep.clone(),
                    slot.child_ob.clone(),
                ),
                None => return Value::Null,
            }
        };

        // Evaluate outside the borrow: a pre-existing getter may read back
        // through this container.
        let value = match &getter {
            Some(getter) => getter(self),
            None => stored,
        };

        if context::is_tracking() {
            if let Some(dep) = dep {
                dep.depend();
                if let Some(ob) = child_ob {
                    ob.dep().depend();
                    // Element-level structural changes must also reach
                    // watchers that read the whole list.
                    if let Value::List(list) = &value {
                        depend_list(list);
                    }
                }
            }
        }

        value
    }

    /// Read a field without establishing a dependency.
    pub fn get_untracked(&self, key: &str) -> Value {
        let (getter, stored) = {
            let data = self.inner.borrow();
            match data.entries.get(key) {
                Some(slot) => (slot.getter.clone(), slot.value.clone()),
                None => return Value::Null,
            }
        };
        match &getter {
            Some(getter) => getter(self),
            None => stored,
        }
    }

    /// Write a field.
    ///
    /// On an instrumented slot this is the full interception pipeline:
    /// equality short-circuit, change hook, store (through the pre-existing
    /// setter when present), re-observation of the new value, notification.
    /// On a plain slot or brand-new key it is a raw store, invisible to
    /// tracking.
    pub fn set(&self, key: &str, new: Value) {
        let slot_info = {
            let data = self.inner.borrow();
            data.entries.get(key).map(|slot| {
                (
                    slot.dep.clone(),
                    slot.getter.clone(),
                    slot.setter.clone(),
                    slot.value.clone(),
                    slot.shallow,
                    slot.change_hook.clone(),
                )
            })
        };

        let Some((Some(dep), getter, setter, stored, shallow, change_hook)) = slot_info else {
            self.insert(key, new);
            return;
        };

        let current = match &getter {
            Some(getter) => getter(self),
            None => stored,
        };
        if new.same_as(&current) {
            return;
        }
        if let Some(hook) = change_hook {
            hook();
        }
        // Getter-only fields silently drop writes.
        if getter.is_some() && setter.is_none() {
            return;
        }

        if let Some(setter) = setter {
            setter(self, new.clone());
        } else {
            let mut data = self.inner.borrow_mut();
            if let Some(slot) = data.entries.get_mut(key) {
                slot.value = new.clone();
            }
        }

        let child_ob = if shallow { None } else { observe(&new, false) };
        {
            let mut data = self.inner.borrow_mut();
            if let Some(slot) = data.entries.get_mut(key) {
                slot.child_ob = child_ob;
            }
        }

        dep.notify();
    }

    /// Raw store: create or overwrite a plain slot without any tracking.
    /// Dropped on frozen containers.
    pub fn insert(&self, key: &str, value: Value) {
        let mut data = self.inner.borrow_mut();
        if data.frozen {
            return;
        }
        match data.entries.get_mut(key) {
            Some(slot) => slot.value = value,
            None => {
                data.entries.insert(key.to_string(), FieldSlot::plain(value));
            }
        }
    }

    /// Remove a slot outright. Returns whether the key was present.
    pub(crate) fn remove_slot(&self, key: &str) -> bool {
        self.inner
            .borrow_mut()
            .entries
            .shift_remove(key)
            .is_some()
    }

    /// Install a pre-existing accessor pair on a field.
    ///
    /// Must happen before the container is observed; `define_reactive`
    /// preserves the accessors when it instruments the slot.
    pub fn define_accessor(
        &self,
        key: &str,
        getter: Option<FieldGetter>,
        setter: Option<FieldSetter>,
    ) {
        let mut data = self.inner.borrow_mut();
        if data.frozen {
            return;
        }
        let slot = data
            .entries
            .entry(key.to_string())
            .or_insert_with(|| FieldSlot::plain(Value::Null));
        if !slot.configurable {
            return;
        }
        slot.getter = getter;
        slot.setter = setter;
    }

    /// Mark the container non-extensible. Frozen containers are skipped by
    /// observation and drop plain writes; existing slots become
    /// non-configurable.
    pub fn freeze(&self) {
        let mut data = self.inner.borrow_mut();
        data.frozen = true;
        for slot in data.entries.values_mut() {
            slot.configurable = false;
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.inner.borrow().frozen
    }

    /// Brand this container as a reserved framework-instance object: skipped
    /// by observation and refused by the structural mutation entry points.
    pub fn mark_internal(&self) {
        self.inner.borrow_mut().internal = true;
    }

    pub fn is_internal(&self) -> bool {
        self.inner.borrow().internal
    }

    /// The container's observation record, if it has been observed.
    pub fn observation(&self) -> Option<Rc<Observation>> {
        self.inner.borrow().observation.clone()
    }

    pub(crate) fn set_observation(&self, ob: Rc<Observation>) {
        self.inner.borrow_mut().observation = Some(ob);
    }

    pub(crate) fn with_slot<T>(
        &self,
        key: &str,
        f: impl FnOnce(Option<&FieldSlot>) -> T,
    ) -> T {
        let data = self.inner.borrow();
        f(data.entries.get(key))
    }

    pub(crate) fn with_slot_mut<T>(
        &self,
        key: &str,
        f: impl FnOnce(&mut FieldSlot) -> T,
    ) -> T {
        let mut data = self.inner.borrow_mut();
        let slot = data
            .entries
            .entry(key.to_string())
            .or_insert_with(|| FieldSlot::plain(Value::Null));
        f(slot)
    }
}

impl Default for MapRef {
    fn default() -> MapRef {
        MapRef::new()
    }
}

impl fmt::Debug for MapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.inner.borrow();
        f.debug_struct("MapRef")
            .field("len", &data.entries.len())
            .field("observed", &data.observation.is_some())
            .field("frozen", &data.frozen)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
