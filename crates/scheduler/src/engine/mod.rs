//! Scheduling engine -- owns the queue and drives the ports.
//!
//! Split into focused submodules:
//! - `core`: engine struct, constructor, and accessors
//! - `reconcile`: set/remove/fired operations, past-due firing, wake-timer sync
//! - `notify`: next-alarm selection and listener notification

mod core;
mod notify;
mod reconcile;

pub use self::core::{EngineSnapshot, SchedulingEngine};
