//! Trellis Core
//!
//! This crate provides the reactive dependency-tracking engine for the
//! Trellis UI framework. Given a mutable data graph, it transparently tracks
//! which computations read which pieces of state, and re-runs exactly those
//! computations when the state they read later changes.
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `value`: the dynamic data model (maps, lists, primitives) with the
//!   intercepted read/write paths
//! - `reactive`: dependency sets, observation, watchers, and the batched
//!   update scheduler
//!
//! The templating pipeline that produces getter functions and the renderer
//! that consumes re-evaluations live outside this crate; they interact with
//! it only through [`observe`], the watch API, and the tick queue.
//!
//! # Example
//!
//! ```rust
//! use trellis_core::{observe, run_ticks, watch, Value, WatchOptions};
//!
//! let data = Value::map([("count", Value::Int(0))]);
//! observe(&data, true);
//!
//! let _w = watch(
//!     &data,
//!     "count",
//!     |new, old| println!("count: {old:?} -> {new:?}"),
//!     WatchOptions::default(),
//! );
//!
//! data.as_map().unwrap().set("count", Value::Int(1));
//! run_ticks(); // flushes the batched re-run, printing the change
//! ```

pub mod error;
pub mod reactive;
pub mod value;

pub use error::Error;
pub use reactive::{
    clear_tick_hook, define_reactive, del, flush_scheduler_queue, next_tick, observe, on_flushed,
    queue_watcher, run_ticks, set, set_max_update_count, set_tick_hook, toggle_observing,
    untracked, watch, Dep, Observation, WatchCallback, WatchOptions, WatchSource, Watcher,
    WatcherId, WatcherRegistry,
};
pub use value::{Key, ListRef, MapRef, Value};
