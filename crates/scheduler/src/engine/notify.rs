use tracing::debug;

use alarmq_core::AlarmEntry;

use crate::queue::SlotKey;

use super::SchedulingEngine;

impl SchedulingEngine {
    /// Re-broadcast the current next alarm without touching the queue.
    pub fn query_status(&mut self) {
        self.notify_listeners();
    }

    /// The alarm reported to listeners as next: the earliest pending entry
    /// whose kind is not autosilence.
    ///
    /// An autosilence entry at the head stays armed on the wake timer but is
    /// skipped here.
    pub fn next_alarm(&self) -> Option<&AlarmEntry> {
        self.queue.iter().find(|entry| !entry.kind().is_autosilence())
    }

    pub(super) fn next_alarm_slot(&self) -> Option<SlotKey> {
        self.queue
            .iter_slots()
            .find(|(_, entry)| !entry.kind().is_autosilence())
            .map(|(slot, _)| slot)
    }

    pub(super) fn notify_listeners(&mut self) {
        self.stats.notifications += 1;
        match self.next_alarm().map(|entry| entry.id()) {
            Some(id) => {
                debug!(alarm_id = id, "notifying scheduled");
                self.listeners.scheduled(id);
            }
            None => {
                debug!("notifying unscheduled");
                self.listeners.unscheduled();
            }
        }
    }
}
