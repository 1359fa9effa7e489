//! Boundaries between the engine and the outside world.
//!
//! - [`WakeTimerPort`]: the single OS wake-up resource
//! - [`NotificationPort`]: which alarm is next, for the rest of the application
//! - [`FireSink`]: fire signals for entries found past due
//!
//! All calls are fire-and-forget. The engine never retries them.

mod channel;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use alarmq_core::{AlarmId, AlarmKind};

/// Opaque correlation token handed to the wake timer.
///
/// Derived from the alarm id so a wake-up can be traced back to the entry
/// that was armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WakeToken(AlarmId);

impl WakeToken {
    pub fn for_alarm(id: AlarmId) -> Self {
        WakeToken(id)
    }

    pub fn alarm_id(&self) -> AlarmId {
        self.0
    }
}

/// Emitted once for every entry fired by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FireSignal {
    pub id: AlarmId,
    pub kind: AlarmKind,
}

/// Status broadcast to listeners. The latest event wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScheduleEvent {
    Scheduled { id: AlarmId },
    Unscheduled,
}

/// One-shot OS wake-up. Only one instant is armed at a time.
pub trait WakeTimerPort: Send {
    /// Arm (or re-arm) the wake-up. Replaces whatever was armed before.
    fn arm(&mut self, instant: DateTime<Utc>, token: WakeToken);

    /// Cancel the armed wake-up. No-op when nothing is armed.
    fn disarm(&mut self);
}

pub trait NotificationPort: Send {
    fn scheduled(&mut self, id: AlarmId);

    fn unscheduled(&mut self);
}

pub trait FireSink: Send {
    fn fired(&mut self, signal: FireSignal);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_alarm_id() {
        assert_eq!(WakeToken::for_alarm(42).alarm_id(), 42);
        assert_eq!(WakeToken::for_alarm(-1), WakeToken::for_alarm(-1));
    }

    #[test]
    fn schedule_event_json_shape() {
        let json = serde_json::to_value(ScheduleEvent::Scheduled { id: 3 }).unwrap();
        assert_eq!(json, serde_json::json!({ "event": "scheduled", "id": 3 }));

        let json = serde_json::to_value(ScheduleEvent::Unscheduled).unwrap();
        assert_eq!(json, serde_json::json!({ "event": "unscheduled" }));
    }

    #[test]
    fn fire_signal_carries_kind_tag() {
        let signal = FireSignal { id: 2, kind: AlarmKind::SNOOZE };
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json, serde_json::json!({ "id": 2, "kind": "SNOOZE" }));
    }
}
