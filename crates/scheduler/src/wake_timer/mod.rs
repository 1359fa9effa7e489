//! Wake-timer capability tiers.
//!
//! A [`TimerBackend`] talks to whatever actually wakes the process. The
//! [`TieredWakeTimer`] wraps it, picks the exact or best-effort tier once at
//! construction, and falls back to best-effort whenever an exact request is
//! refused. The engine only ever sees [`WakeTimerPort`].

mod tokio_backend;

pub use tokio_backend::{TokioTimerBackend, WakeUp};

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use alarmq_core::{SchedulerConfig, TimerTierSetting};

use crate::ports::{WakeTimerPort, WakeToken};

/// Errors a backend may report when asked for an exact wake-up.
#[derive(Debug, thiserror::Error)]
pub enum WakeTimerError {
    #[error("exact wake-ups are not supported by {0}")]
    ExactUnsupported(String),
    #[error("instant {0} is beyond the exact timer horizon")]
    OutOfRange(DateTime<Utc>),
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),
}

/// Capability tier, fixed for the lifetime of a [`TieredWakeTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerTier {
    /// Wake at the requested instant.
    Exact,
    /// Wake somewhere at or after the requested instant, aligned to a window.
    BestEffort,
}

impl TimerTier {
    /// Resolve the configured setting against the platform probe result.
    pub fn resolve(setting: TimerTierSetting, exact_available: bool) -> Self {
        match setting {
            TimerTierSetting::Exact if exact_available => TimerTier::Exact,
            TimerTierSetting::Exact => {
                warn!("exact timer tier requested but not available, using best-effort");
                TimerTier::BestEffort
            }
            TimerTierSetting::BestEffort => TimerTier::BestEffort,
            TimerTierSetting::Auto if exact_available => TimerTier::Exact,
            TimerTierSetting::Auto => TimerTier::BestEffort,
        }
    }
}

/// Something that can wake the process at a wall-clock instant.
///
/// Each `set_*` call replaces the previous request.
pub trait TimerBackend: Send {
    /// Human-readable backend name for logging.
    fn name(&self) -> &str;

    /// Platform probe: whether exact wake-ups are available at all.
    fn supports_exact(&self) -> bool;

    fn set_exact(&mut self, at: DateTime<Utc>, token: WakeToken) -> Result<(), WakeTimerError>;

    /// Best-effort wake-up. Must not drop the request.
    fn set_inexact(&mut self, at: DateTime<Utc>, token: WakeToken);

    fn cancel(&mut self);
}

/// Round `instant` up to the next multiple of `window` since the epoch.
///
/// Saturates at `DateTime::<Utc>::MAX_UTC` when the boundary is not
/// representable, so the result is never earlier than `instant`.
pub fn align_to_window(instant: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    let window_ms = match i64::try_from(window.as_millis()) {
        Ok(ms) if ms > 0 => ms,
        _ => return instant,
    };
    let rem = instant.timestamp_millis().rem_euclid(window_ms);
    if rem == 0 {
        return instant;
    }
    chrono::Duration::try_milliseconds(window_ms - rem)
        .and_then(|pad| instant.checked_add_signed(pad))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// [`WakeTimerPort`] over a [`TimerBackend`] with a fixed capability tier.
pub struct TieredWakeTimer<B> {
    backend: B,
    tier: TimerTier,
    best_effort_window: Duration,
    armed: Option<(DateTime<Utc>, WakeToken)>,
}

impl<B: TimerBackend> TieredWakeTimer<B> {
    /// Probe the backend once and pick the tier from `config`.
    pub fn new(backend: B, config: &SchedulerConfig) -> Self {
        let tier = TimerTier::resolve(config.timer_tier, backend.supports_exact());
        info!(backend = backend.name(), ?tier, "Using wake timer");
        Self {
            backend,
            tier,
            best_effort_window: config.best_effort_window(),
            armed: None,
        }
    }

    pub fn tier(&self) -> TimerTier {
        self.tier
    }

    /// Requested instant and token of the currently armed wake-up.
    pub fn armed(&self) -> Option<(DateTime<Utc>, WakeToken)> {
        self.armed
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn arm_best_effort(&mut self, instant: DateTime<Utc>, token: WakeToken) {
        let aligned = align_to_window(instant, self.best_effort_window);
        self.backend.set_inexact(aligned, token);
    }
}

impl<B: TimerBackend> WakeTimerPort for TieredWakeTimer<B> {
    fn arm(&mut self, instant: DateTime<Utc>, token: WakeToken) {
        debug!(alarm_id = token.alarm_id(), %instant, tier = ?self.tier, "arming wake timer");
        match self.tier {
            TimerTier::Exact => {
                if let Err(e) = self.backend.set_exact(instant, token) {
                    warn!(error = %e, alarm_id = token.alarm_id(), "exact wake-up failed, falling back to best-effort");
                    self.arm_best_effort(instant, token);
                }
            }
            TimerTier::BestEffort => self.arm_best_effort(instant, token),
        }
        self.armed = Some((instant, token));
    }

    fn disarm(&mut self) {
        if self.armed.take().is_some() {
            debug!("no more alarms to schedule, disarming wake timer");
        }
        self.backend.cancel();
    }
}
