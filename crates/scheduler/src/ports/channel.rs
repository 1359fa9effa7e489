//! Port implementations that forward onto owned tokio channels.

use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use alarmq_core::AlarmId;

use super::{FireSignal, FireSink, NotificationPort, ScheduleEvent};

impl NotificationPort for UnboundedSender<ScheduleEvent> {
    fn scheduled(&mut self, id: AlarmId) {
        if self.send(ScheduleEvent::Scheduled { id }).is_err() {
            warn!(alarm_id = id, "schedule listener gone, dropping scheduled event");
        }
    }

    fn unscheduled(&mut self) {
        if self.send(ScheduleEvent::Unscheduled).is_err() {
            warn!("schedule listener gone, dropping unscheduled event");
        }
    }
}

impl FireSink for UnboundedSender<FireSignal> {
    fn fired(&mut self, signal: FireSignal) {
        let id = signal.id;
        if self.send(signal).is_err() {
            warn!(alarm_id = id, "fire receiver gone, dropping fire signal");
        }
    }
}
