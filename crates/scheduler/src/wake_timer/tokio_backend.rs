use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::ports::WakeToken;

use super::{TimerBackend, WakeTimerError};

/// Furthest ahead an exact wake-up may be requested. Beyond this the tokio
/// timer wheel clamps deadlines, so the request is handed to best-effort.
const EXACT_HORIZON: Duration = Duration::from_secs(730 * 24 * 60 * 60);

/// Longest single sleep used while waiting for a far-away wake-up.
const MAX_SLEEP_STEP: Duration = Duration::from_secs(24 * 60 * 60);

/// Delivered on the wake-up channel when an armed timer expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeUp {
    pub token: WakeToken,
}

/// Timer backend built on tokio timers.
///
/// Keeps at most one sleeping task; every new request aborts the previous
/// one. Expiry is reported as a [`WakeUp`] on an unbounded channel.
pub struct TokioTimerBackend {
    runtime: Handle,
    wakeups: UnboundedSender<WakeUp>,
    pending: Option<JoinHandle<()>>,
    clock: Box<dyn Clock>,
}

impl TokioTimerBackend {
    /// Create a backend bound to the current tokio runtime.
    pub fn new(wakeups: UnboundedSender<WakeUp>) -> Result<Self, WakeTimerError> {
        let runtime = Handle::try_current().map_err(|e| WakeTimerError::NoRuntime(e.to_string()))?;
        Ok(Self {
            runtime,
            wakeups,
            pending: None,
            clock: Box::new(SystemClock),
        })
    }

    /// Create a backend together with the receiving end of its wake-up channel.
    pub fn channel() -> Result<(Self, UnboundedReceiver<WakeUp>), WakeTimerError> {
        let (tx, rx) = mpsc::unbounded_channel();
        Ok((Self::new(tx)?, rx))
    }

    /// Use `clock` to turn wall-clock instants into sleep durations.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn delay_until(&self, at: DateTime<Utc>) -> Duration {
        (at - self.clock.now()).to_std().unwrap_or(Duration::ZERO)
    }

    fn schedule(&mut self, delay: Duration, token: WakeToken) {
        self.cancel();
        let wakeups = self.wakeups.clone();
        self.pending = Some(self.runtime.spawn(async move {
            let mut remaining = delay;
            while !remaining.is_zero() {
                let step = remaining.min(MAX_SLEEP_STEP);
                tokio::time::sleep(step).await;
                remaining -= step;
            }
            if wakeups.send(WakeUp { token }).is_err() {
                debug!(alarm_id = token.alarm_id(), "wake-up receiver gone");
            }
        }));
    }
}

impl TimerBackend for TokioTimerBackend {
    fn name(&self) -> &str {
        "tokio"
    }

    fn supports_exact(&self) -> bool {
        true
    }

    fn set_exact(&mut self, at: DateTime<Utc>, token: WakeToken) -> Result<(), WakeTimerError> {
        let delay = self.delay_until(at);
        if delay > EXACT_HORIZON {
            return Err(WakeTimerError::OutOfRange(at));
        }
        self.schedule(delay, token);
        Ok(())
    }

    fn set_inexact(&mut self, at: DateTime<Utc>, token: WakeToken) {
        let delay = self.delay_until(at);
        self.schedule(delay, token);
    }

    fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}

impl Drop for TokioTimerBackend {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;
    use tokio::time::timeout;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 6, 0, 0).unwrap()
    }

    fn backend() -> (TokioTimerBackend, UnboundedReceiver<WakeUp>) {
        let (backend, rx) = TokioTimerBackend::channel().unwrap();
        (backend.with_clock(ManualClock::new(start())), rx)
    }

    #[test]
    fn requires_runtime() {
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(matches!(TokioTimerBackend::new(tx), Err(WakeTimerError::NoRuntime(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn exact_wake_up_is_delivered() {
        let (mut backend, mut rx) = backend();
        let token = WakeToken::for_alarm(5);
        backend.set_exact(start() + chrono::Duration::seconds(5), token).unwrap();

        let wake = timeout(Duration::from_secs(10), rx.recv()).await.unwrap().unwrap();
        assert_eq!(wake.token, token);
    }

    #[tokio::test(start_paused = true)]
    async fn new_request_replaces_previous() {
        let (mut backend, mut rx) = backend();
        backend.set_exact(start() + chrono::Duration::seconds(5), WakeToken::for_alarm(1)).unwrap();
        backend.set_inexact(start() + chrono::Duration::seconds(10), WakeToken::for_alarm(2));

        let wake = timeout(Duration::from_secs(60), rx.recv()).await.unwrap().unwrap();
        assert_eq!(wake.token, WakeToken::for_alarm(2));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_suppresses_wake_up() {
        let (mut backend, mut rx) = backend();
        backend.set_exact(start() + chrono::Duration::seconds(5), WakeToken::for_alarm(1)).unwrap();
        backend.cancel();

        assert!(!backend.is_pending());
        assert!(timeout(Duration::from_secs(30), rx.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn past_instant_wakes_immediately() {
        let (mut backend, mut rx) = backend();
        backend.set_exact(start() - chrono::Duration::seconds(30), WakeToken::for_alarm(9)).unwrap();

        let wake = timeout(Duration::from_millis(10), rx.recv()).await.unwrap().unwrap();
        assert_eq!(wake.token.alarm_id(), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn exact_beyond_horizon_is_refused() {
        let (mut backend, _rx) = backend();
        let far = start() + chrono::Duration::days(3650);
        assert!(matches!(
            backend.set_exact(far, WakeToken::for_alarm(1)),
            Err(WakeTimerError::OutOfRange(_))
        ));
        assert!(!backend.is_pending());

        backend.set_inexact(far, WakeToken::for_alarm(1));
        assert!(backend.is_pending());
    }
}
