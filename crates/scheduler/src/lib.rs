//! Single-timer alarm scheduling engine.
//!
//! The [`SchedulingEngine`] keeps pending alarm instants in a [`ScheduleQueue`],
//! fires anything that is already past due, and keeps exactly one wake timer
//! armed for the head of the queue. Listeners are told which user-facing alarm
//! is next through a [`NotificationPort`].
//!
//! The engine is synchronous; [`SchedulerHandle`] runs it on a dedicated tokio
//! task so callers from different contexts are serialized.

pub mod clock;
pub mod engine;
pub mod ports;
pub mod queue;
pub mod stats;
pub mod wake_timer;
pub mod worker;

pub use alarmq_core::{
    AlarmEntry, AlarmId, AlarmKind, AlarmqError, SchedulerConfig, TimerTierSetting,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{EngineSnapshot, SchedulingEngine};
pub use ports::{FireSignal, FireSink, NotificationPort, ScheduleEvent, WakeTimerPort, WakeToken};
pub use queue::{ScheduleQueue, SlotKey};
pub use stats::EngineStats;
pub use wake_timer::{
    TieredWakeTimer, TimerBackend, TimerTier, TokioTimerBackend, WakeTimerError, WakeUp,
};
pub use worker::{SchedulerHandle, WorkerError};
