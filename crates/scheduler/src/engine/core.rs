use serde::Serialize;

use alarmq_core::{AlarmEntry, AlarmId};

use crate::clock::{Clock, SystemClock};
use crate::ports::{FireSink, NotificationPort, WakeTimerPort, WakeToken};
use crate::queue::ScheduleQueue;
use crate::stats::EngineStats;

/// The single-timer scheduling engine.
///
/// Every operation runs to completion synchronously. After each one the
/// queue holds no past-due entries, the wake timer is armed for the head
/// (or disarmed when empty), and listeners have heard about the current
/// next alarm whenever it changed.
pub struct SchedulingEngine {
    pub(super) queue: ScheduleQueue,
    pub(super) wake_timer: Box<dyn WakeTimerPort>,
    pub(super) listeners: Box<dyn NotificationPort>,
    pub(super) fire_sink: Box<dyn FireSink>,
    pub(super) clock: Box<dyn Clock>,
    /// Token last handed to the wake timer, if armed.
    pub(super) armed: Option<WakeToken>,
    pub(super) stats: EngineStats,
}

/// Point-in-time view of the engine, for status endpoints and logs.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    /// Pending entries in firing order.
    pub pending: Vec<AlarmEntry>,
    /// Alarm currently reported to listeners as next.
    pub next_alarm: Option<AlarmId>,
    /// Alarm the wake timer is armed for.
    pub armed: Option<AlarmId>,
    pub stats: EngineStats,
}

impl SchedulingEngine {
    /// Create an engine reading wall-clock time.
    pub fn new(
        wake_timer: impl WakeTimerPort + 'static,
        listeners: impl NotificationPort + 'static,
        fire_sink: impl FireSink + 'static,
    ) -> Self {
        Self {
            queue: ScheduleQueue::new(),
            wake_timer: Box::new(wake_timer),
            listeners: Box::new(listeners),
            fire_sink: Box::new(fire_sink),
            clock: Box::new(SystemClock),
            armed: None,
            stats: EngineStats::default(),
        }
    }

    /// Replace the clock used to sample "now".
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Pending entries in ascending firing order.
    pub fn pending(&self) -> impl Iterator<Item = &AlarmEntry> {
        self.queue.iter()
    }

    pub fn get(&self, id: AlarmId) -> Option<&AlarmEntry> {
        self.queue.get(id)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn armed(&self) -> Option<WakeToken> {
        self.armed
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            pending: self.queue.iter().cloned().collect(),
            next_alarm: self.next_alarm().map(|entry| entry.id()),
            armed: self.armed.map(|token| token.alarm_id()),
            stats: self.stats.clone(),
        }
    }
}
