//! Observation Layer
//!
//! This module turns plain containers into tracked state:
//!
//! 1. [`observe`] attaches an [`Observation`] record to a container and
//!    instruments every existing field, recursively.
//!
//! 2. [`define_reactive`] instruments a single field, giving it a dependency
//!    set and deep-observing its value.
//!
//! 3. [`set`] and [`del`] are the structural mutation entry points for
//!    changes that field interception cannot see: adding a brand-new key,
//!    removing one, or index-based list mutation.
//!
//! # Idempotent Wrapping
//!
//! A container is observed at most once. Re-observing returns the existing
//! record, so aliased handles into the same data never end up with competing
//! dependency sets.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::Error;
use crate::reactive::dep::Dep;
use crate::value::{Key, ListRef, MapRef, Value};

thread_local! {
    static SHOULD_OBSERVE: Cell<bool> = Cell::new(true);
}

/// Process-wide suspend/resume of new-observation creation.
///
/// Used when constructing known-static structures. Already-installed
/// interceptors are unaffected.
pub fn toggle_observing(enabled: bool) {
    SHOULD_OBSERVE.with(|flag| flag.set(enabled));
}

fn should_observe() -> bool {
    SHOULD_OBSERVE.with(Cell::get)
}

/// The record attached to each observed container.
///
/// Its dependency set fires on structural change (key added or removed,
/// list length or order changed), as opposed to the per-field deps that fire
/// on value replacement. `root_refs` counts how many consumers treat the
/// container as a top-level state root; such containers refuse ad-hoc key
/// injection.
pub struct Observation {
    dep: Dep,
    root_refs: Cell<usize>,
}

impl Observation {
    fn new() -> Observation {
        Observation {
            dep: Dep::new(),
            root_refs: Cell::new(0),
        }
    }

    /// The container's structural dependency set.
    pub fn dep(&self) -> &Dep {
        &self.dep
    }

    pub fn root_refs(&self) -> usize {
        self.root_refs.get()
    }

    fn bump_root_refs(&self) {
        self.root_refs.set(self.root_refs.get() + 1);
    }
}

impl std::fmt::Debug for Observation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observation")
            .field("dep_id", &self.dep.id())
            .field("root_refs", &self.root_refs.get())
            .finish()
    }
}

/// Attempt to observe a value, returning its observation record.
///
/// No-op (returns `None`) for primitives, frozen or internal containers, and
/// while observation is toggled off. Re-observing an already-observed
/// container returns the existing record. `as_root` marks the container as a
/// top-level state root.
pub fn observe(value: &Value, as_root: bool) -> Option<Rc<Observation>> {
    let ob = match value {
        Value::Map(map) => {
            if let Some(existing) = map.observation() {
                Some(existing)
            } else if !should_observe() || map.is_frozen() || map.is_internal() {
                None
            } else {
                let ob = Rc::new(Observation::new());
                // Install the record before walking, so self-referential
                // graphs terminate.
                map.set_observation(Rc::clone(&ob));
                for key in map.keys() {
                    define_reactive(map, &key, None, None, false);
                }
                Some(ob)
            }
        }
        Value::List(list) => {
            if let Some(existing) = list.observation() {
                Some(existing)
            } else if !should_observe() || list.is_frozen() {
                None
            } else {
                let ob = Rc::new(Observation::new());
                list.set_observation(Rc::clone(&ob));
                for i in 0..list.len() {
                    observe(&list.get(i), false);
                }
                Some(ob)
            }
        }
        _ => None,
    };

    if as_root {
        if let Some(ob) = &ob {
            ob.bump_root_refs();
        }
    }
    ob
}

/// Instrument a single field of a keyed container.
///
/// Installs the field's dependency set and deep-observes its value (unless
/// `shallow`). Pre-existing accessors are preserved. Non-configurable slots
/// are skipped silently.
///
/// When no explicit `initial` value is given, the current value is read only
/// if the slot has no getter or has a setter. A getter-only field is not
/// deep-observed at definition time (its getter may have side effects), but
/// a getter+setter field is, so that replacement values assigned through the
/// new interceptor stay consistently observed. The asymmetry is deliberate.
pub fn define_reactive(
    map: &MapRef,
    key: &str,
    initial: Option<Value>,
    change_hook: Option<Rc<dyn Fn()>>,
    shallow: bool,
) {
    if map.is_frozen() {
        return;
    }

    let inspected = map.with_slot(key, |slot| {
        slot.map(|s| (s.configurable, s.getter.clone(), s.setter.is_some(), s.value.clone()))
    });
    let (getter, has_setter, stored) = match inspected {
        Some((false, ..)) => return,
        Some((true, getter, has_setter, stored)) => (getter, has_setter, stored),
        None => (None, false, Value::Null),
    };

    let value = match initial {
        Some(value) => value,
        None if getter.is_none() || has_setter => match &getter {
            Some(getter) => getter(map),
            None => stored,
        },
        None => Value::Null,
    };

    let child_ob = if shallow { None } else { observe(&value, false) };
    let dep = Dep::new();

    map.with_slot_mut(key, |slot| {
        slot.value = value;
        slot.dep = Some(dep);
        slot.child_ob = child_ob;
        slot.shallow = shallow;
        slot.change_hook = change_hook;
    });
}

/// Structural set: add or replace a field in a way tracking can see.
///
/// For an ordered container with a valid index, the element is replaced via
/// the intercepted `splice` path. For a keyed container, an existing key goes
/// through the ordinary write path; a brand-new key on an observed container
/// gets a freshly instrumented field and a structural notification. Root
/// state objects and internal instances refuse new fields (diagnostic,
/// non-fatal).
pub fn set(target: &Value, key: impl Into<Key>, value: Value) -> Result<Value, Error> {
    let key = key.into();
    match target {
        Value::List(list) => {
            let Some(index) = key.as_index() else {
                return Err(Error::InvalidListKey(key.to_string()));
            };
            list.pad_to(index);
            list.splice(index, 1, vec![value.clone()]);
            Ok(value)
        }
        Value::Map(map) => {
            let name = key.name();
            if map.contains_key(&name) {
                map.set(&name, value.clone());
                return Ok(value);
            }
            let ob = map.observation();
            if map.is_internal() || ob.as_ref().is_some_and(|ob| ob.root_refs() > 0) {
                tracing::warn!(
                    key = %name,
                    "refusing to add a reactive field to a root state object or \
                     internal instance at runtime; declare it upfront"
                );
                return Ok(value);
            }
            let Some(ob) = ob else {
                // Untracked container: plain assignment.
                map.insert(&name, value.clone());
                return Ok(value);
            };
            define_reactive(map, &name, Some(value.clone()), None, false);
            ob.dep().notify();
            Ok(value)
        }
        other => Err(Error::InvalidTarget(other.type_name())),
    }
}

/// Structural delete: remove a field in a way tracking can see.
///
/// Absent keys are a silent no-op. Root state objects and internal instances
/// refuse deletion, same as [`set`].
pub fn del(target: &Value, key: impl Into<Key>) -> Result<(), Error> {
    let key = key.into();
    match target {
        Value::List(list) => {
            let Some(index) = key.as_index() else {
                return Err(Error::InvalidListKey(key.to_string()));
            };
            list.splice(index, 1, Vec::new());
            Ok(())
        }
        Value::Map(map) => {
            let name = key.name();
            let ob = map.observation();
            if map.is_internal() || ob.as_ref().is_some_and(|ob| ob.root_refs() > 0) {
                tracing::warn!(
                    key = %name,
                    "refusing to delete a field on a root state object or \
                     internal instance; set it to null instead"
                );
                return Ok(());
            }
            if !map.contains_key(&name) {
                return Ok(());
            }
            map.remove_slot(&name);
            if let Some(ob) = ob {
                ob.dep().notify();
            }
            Ok(())
        }
        other => Err(Error::InvalidTarget(other.type_name())),
    }
}

/// Link the active watcher to every observed element of a list, recursively.
///
/// Element access is not intercepted the way field access is, so a watcher
/// that read a whole list must also depend on the structural deps of its
/// elements for `set`/`del` on them to stay visible.
pub(crate) fn depend_list(list: &ListRef) {
    for i in 0..list.len() {
        match list.get(i) {
            Value::Map(map) => {
                if let Some(ob) = map.observation() {
                    ob.dep().depend();
                }
            }
            Value::List(nested) => {
                if let Some(ob) = nested.observation() {
                    ob.dep().depend();
                }
                depend_list(&nested);
            }
            _ => {}
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
