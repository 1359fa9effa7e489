use serde::Serialize;

/// Engine operational counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// `set` calls.
    pub sets: u64,
    /// `remove` calls, including no-ops.
    pub removes: u64,
    /// `on_fired` acknowledgements, including no-ops.
    pub fired_acks: u64,
    /// Wake-ups delivered by the wake timer.
    pub wake_ups: u64,
    /// Entries fired because they were found past due.
    pub fired: u64,
    pub arms: u64,
    pub disarms: u64,
    /// Scheduled/unscheduled notifications emitted.
    pub notifications: u64,
}

impl EngineStats {
    pub fn record_fired(&mut self, count: usize) {
        self.fired += count as u64;
    }
}
