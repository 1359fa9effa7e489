//! Dedicated worker task that owns a [`SchedulingEngine`].
//!
//! Requests from any number of callers are funnelled through one bounded
//! channel and applied one at a time, in arrival order. Wake-ups from a
//! [`TokioTimerBackend`](crate::wake_timer::TokioTimerBackend) are merged into
//! the same loop so they are serialized with caller commands.

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use alarmq_core::{AlarmId, AlarmKind};

use crate::engine::{EngineSnapshot, SchedulingEngine};
use crate::wake_timer::WakeUp;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("scheduler worker has stopped")]
    Stopped,
}

enum Command {
    Set {
        id: AlarmId,
        kind: AlarmKind,
        instant: DateTime<Utc>,
    },
    Remove {
        id: AlarmId,
    },
    Fired {
        id: AlarmId,
    },
    QueryStatus,
    Snapshot {
        reply: oneshot::Sender<EngineSnapshot>,
    },
    Shutdown,
}

/// Cloneable handle to a running scheduler worker.
#[derive(Clone)]
pub struct SchedulerHandle {
    commands: mpsc::Sender<Command>,
}

impl SchedulerHandle {
    /// Move `engine` onto a new tokio task.
    ///
    /// The task ends on [`shutdown`](Self::shutdown) or once every handle is
    /// dropped, and yields the engine back through the join handle.
    pub fn spawn(
        engine: SchedulingEngine,
        buffer: usize,
        wakeups: Option<mpsc::UnboundedReceiver<WakeUp>>,
    ) -> (Self, JoinHandle<SchedulingEngine>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let task = tokio::spawn(run(engine, rx, wakeups));
        (Self { commands: tx }, task)
    }

    pub async fn set(
        &self,
        id: AlarmId,
        kind: AlarmKind,
        instant: DateTime<Utc>,
    ) -> Result<(), WorkerError> {
        self.send(Command::Set { id, kind, instant }).await
    }

    pub async fn remove(&self, id: AlarmId) -> Result<(), WorkerError> {
        self.send(Command::Remove { id }).await
    }

    pub async fn on_fired(&self, id: AlarmId) -> Result<(), WorkerError> {
        self.send(Command::Fired { id }).await
    }

    pub async fn query_status(&self) -> Result<(), WorkerError> {
        self.send(Command::QueryStatus).await
    }

    /// Snapshot taken after every previously sent command has been applied.
    pub async fn snapshot(&self) -> Result<EngineSnapshot, WorkerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        rx.await.map_err(|_| WorkerError::Stopped)
    }

    pub async fn shutdown(&self) -> Result<(), WorkerError> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, command: Command) -> Result<(), WorkerError> {
        self.commands.send(command).await.map_err(|_| WorkerError::Stopped)
    }
}

async fn next_wake_up(wakeups: &mut Option<mpsc::UnboundedReceiver<WakeUp>>) -> Option<WakeUp> {
    match wakeups {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn run(
    mut engine: SchedulingEngine,
    mut commands: mpsc::Receiver<Command>,
    mut wakeups: Option<mpsc::UnboundedReceiver<WakeUp>>,
) -> SchedulingEngine {
    info!("Scheduler worker started");
    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                match command {
                    Command::Set { id, kind, instant } => engine.set(id, kind, instant),
                    Command::Remove { id } => engine.remove(id),
                    Command::Fired { id } => engine.on_fired(id),
                    Command::QueryStatus => engine.query_status(),
                    Command::Snapshot { reply } => {
                        let _ = reply.send(engine.snapshot());
                    }
                    Command::Shutdown => break,
                }
            }
            wake = next_wake_up(&mut wakeups) => {
                match wake {
                    Some(WakeUp { token }) => engine.on_wake_up(token),
                    None => {
                        debug!("wake-up channel closed");
                        wakeups = None;
                    }
                }
            }
        }
    }
    info!(pending = engine.len(), "Scheduler worker stopped");
    engine
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;
    use tokio::time::timeout;

    use super::*;
    use crate::clock::ManualClock;
    use crate::ports::{FireSignal, ScheduleEvent, WakeTimerPort, WakeToken};

    /// Wake timer that does nothing; the worker tests drive wake-ups by hand.
    struct NullTimer;

    impl WakeTimerPort for NullTimer {
        fn arm(&mut self, _instant: DateTime<Utc>, _token: WakeToken) {}
        fn disarm(&mut self) {}
    }

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    fn engine(
        clock: &ManualClock,
    ) -> (
        SchedulingEngine,
        mpsc::UnboundedReceiver<ScheduleEvent>,
        mpsc::UnboundedReceiver<FireSignal>,
    ) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (fires_tx, fires_rx) = mpsc::unbounded_channel();
        let engine = SchedulingEngine::new(NullTimer, events_tx, fires_tx).with_clock(clock.clone());
        (engine, events_rx, fires_rx)
    }

    #[tokio::test]
    async fn commands_apply_in_order() {
        let clock = ManualClock::new(t(0));
        let (engine, mut events, _fires) = engine(&clock);
        let (handle, task) = SchedulerHandle::spawn(engine, 4, None);

        handle.set(1, AlarmKind::NORMAL, t(100)).await.unwrap();
        handle.set(2, AlarmKind::NORMAL, t(50)).await.unwrap();
        handle.remove(2).await.unwrap();

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.pending.len(), 1);
        assert_eq!(snapshot.next_alarm, Some(1));

        assert_eq!(events.recv().await, Some(ScheduleEvent::Scheduled { id: 1 }));
        assert_eq!(events.recv().await, Some(ScheduleEvent::Scheduled { id: 2 }));
        assert_eq!(events.recv().await, Some(ScheduleEvent::Scheduled { id: 1 }));

        handle.shutdown().await.unwrap();
        let engine = task.await.unwrap();
        assert_eq!(engine.len(), 1);
    }

    #[tokio::test]
    async fn wake_up_is_serialized_with_commands() {
        let clock = ManualClock::new(t(0));
        let (engine, _events, mut fires) = engine(&clock);
        let (wake_tx, wake_rx) = mpsc::unbounded_channel();
        let (handle, _task) = SchedulerHandle::spawn(engine, 4, Some(wake_rx));

        handle.set(7, AlarmKind::SNOOZE, t(30)).await.unwrap();
        handle.snapshot().await.unwrap();

        clock.set(t(30));
        wake_tx.send(WakeUp { token: WakeToken::for_alarm(7) }).unwrap();

        let fired = timeout(Duration::from_secs(1), fires.recv()).await.unwrap().unwrap();
        assert_eq!(fired, FireSignal { id: 7, kind: AlarmKind::SNOOZE });
        assert!(handle.snapshot().await.unwrap().pending.is_empty());
    }

    #[tokio::test]
    async fn closed_wake_up_channel_keeps_worker_running() {
        let clock = ManualClock::new(t(0));
        let (engine, _events, _fires) = engine(&clock);
        let (wake_tx, wake_rx) = mpsc::unbounded_channel::<WakeUp>();
        let (handle, _task) = SchedulerHandle::spawn(engine, 4, Some(wake_rx));
        drop(wake_tx);

        handle.set(1, AlarmKind::NORMAL, t(10)).await.unwrap();
        assert_eq!(handle.snapshot().await.unwrap().pending.len(), 1);
    }

    #[tokio::test]
    async fn dropping_all_handles_stops_worker() {
        let clock = ManualClock::new(t(0));
        let (engine, _events, _fires) = engine(&clock);
        let (handle, task) = SchedulerHandle::spawn(engine, 4, None);
        handle.set(1, AlarmKind::NORMAL, t(10)).await.unwrap();
        drop(handle);

        let engine = timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert_eq!(engine.len(), 1);
    }

    #[tokio::test]
    async fn stopped_worker_reports_error() {
        let clock = ManualClock::new(t(0));
        let (engine, _events, _fires) = engine(&clock);
        let (handle, task) = SchedulerHandle::spawn(engine, 4, None);
        handle.shutdown().await.unwrap();
        task.await.unwrap();

        assert!(matches!(handle.remove(1).await, Err(WorkerError::Stopped)));
        assert!(matches!(handle.snapshot().await, Err(WorkerError::Stopped)));
    }
}
