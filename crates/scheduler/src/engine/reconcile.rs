use chrono::{DateTime, Utc};
use tracing::debug;

use alarmq_core::{AlarmEntry, AlarmId, AlarmKind};

use crate::ports::{FireSignal, WakeToken};
use crate::queue::ScheduleQueue;

use super::SchedulingEngine;

impl SchedulingEngine {
    /// Schedule `id` at `instant`, replacing any pending entry with the same id.
    ///
    /// An instant at or before now fires immediately.
    pub fn set(&mut self, id: AlarmId, kind: AlarmKind, instant: DateTime<Utc>) {
        self.stats.sets += 1;
        self.upsert_or_remove(id, Some(AlarmEntry::new(id, instant, kind)));
    }

    /// Drop `id` from the schedule. Unknown ids are ignored.
    pub fn remove(&mut self, id: AlarmId) {
        self.stats.removes += 1;
        self.upsert_or_remove(id, None);
    }

    /// Acknowledge that `id` has fired elsewhere. Unknown ids are ignored.
    pub fn on_fired(&mut self, id: AlarmId) {
        self.stats.fired_acks += 1;
        self.upsert_or_remove(id, None);
    }

    /// Handle expiry of the wake timer.
    ///
    /// Fires whatever is due. The one-shot timer is spent, so it is re-armed
    /// for the head even when the head did not change (stale or early wake-up).
    pub fn on_wake_up(&mut self, token: WakeToken) {
        self.stats.wake_ups += 1;
        debug!(alarm_id = token.alarm_id(), "wake timer expired");
        if self.armed == Some(token) {
            self.armed = None;
        }
        self.reconcile(|_| {}, true);
    }

    pub(crate) fn upsert_or_remove(&mut self, id: AlarmId, replacement: Option<AlarmEntry>) {
        self.reconcile(
            |queue| {
                queue.remove_by_id(id);
                if let Some(entry) = replacement {
                    queue.insert(entry);
                }
            },
            false,
        );
    }

    fn reconcile(&mut self, mutate: impl FnOnce(&mut ScheduleQueue), timer_spent: bool) {
        let previous_head = self.queue.head_slot();
        let previous_next = self.next_alarm_slot();

        mutate(&mut self.queue);
        self.fire_past_due();

        let current_head = self.queue.head_slot();
        let head_changed = current_head != previous_head;

        if head_changed || (timer_spent && self.armed.is_none()) {
            self.sync_wake_timer();
        }
        if head_changed || self.next_alarm_slot() != previous_next {
            self.notify_listeners();
        }
    }

    /// Pop and fire every entry due at a single sample of now.
    fn fire_past_due(&mut self) -> usize {
        let now = self.clock.now();
        let mut fired = 0;
        loop {
            match self.queue.peek_min() {
                Some(head) if head.is_due(now) => {}
                _ => break,
            }
            let Some(entry) = self.queue.pop_min() else {
                break;
            };
            debug!(alarm_id = entry.id(), kind = %entry.kind(), "In the past - {}", entry);
            self.fire_sink.fired(FireSignal {
                id: entry.id(),
                kind: entry.kind().clone(),
            });
            fired += 1;
        }
        self.stats.record_fired(fired);
        fired
    }

    fn sync_wake_timer(&mut self) {
        match self.queue.peek_min() {
            Some(head) => {
                debug!(alarm_id = head.id(), "Set {}", head);
                let token = WakeToken::for_alarm(head.id());
                self.wake_timer.arm(head.instant(), token);
                self.armed = Some(token);
                self.stats.arms += 1;
            }
            None => {
                debug!("no more alarms to schedule, disarming");
                self.wake_timer.disarm();
                self.armed = None;
                self.stats.disarms += 1;
            }
        }
    }
}
