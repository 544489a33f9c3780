//! Deep Traversal
//!
//! A deep watcher must be notified for a mutation anywhere inside its
//! result's subtree. Reads compound naturally through nested interceptors,
//! but only for the fields the getter actually touched; [`traverse`] forces a
//! tracked read of every reachable field so the whole subtree is linked.
//!
//! Cycles are guarded with a seen-set of observation dep IDs. Frozen and
//! internal containers are skipped, matching what the observation layer
//! instruments.

use std::collections::HashSet;

use crate::value::Value;

/// Recursively touch every reachable field of `value` through the reactive
/// read path.
pub(crate) fn traverse(value: &Value) {
    let mut seen = HashSet::new();
    traverse_inner(value, &mut seen);
}

fn traverse_inner(value: &Value, seen: &mut HashSet<u64>) {
    match value {
        Value::Map(map) => {
            if map.is_frozen() || map.is_internal() {
                return;
            }
            if let Some(ob) = map.observation() {
                if !seen.insert(ob.dep().id()) {
                    return;
                }
            }
            for key in map.keys() {
                // Tracked read; this is what links the deep watcher.
                let child = map.get(&key);
                traverse_inner(&child, seen);
            }
        }
        Value::List(list) => {
            if list.is_frozen() {
                return;
            }
            if let Some(ob) = list.observation() {
                if !seen.insert(ob.dep().id()) {
                    return;
                }
            }
            for i in 0..list.len() {
                let child = list.get(i);
                traverse_inner(&child, seen);
            }
        }
        _ => {}
    }
}
