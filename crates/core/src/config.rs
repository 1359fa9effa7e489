use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AlarmqError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Which wake-timer tier to use.
///
/// `Auto` defers to the platform probe performed once when the wake timer is
/// constructed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerTierSetting {
    #[default]
    Auto,
    Exact,
    BestEffort,
}

impl FromStr for TimerTierSetting {
    type Err = AlarmqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "exact" => Ok(Self::Exact),
            "best_effort" | "best-effort" => Ok(Self::BestEffort),
            other => Err(AlarmqError::Config(format!(
                "invalid timer tier '{other}', expected 'auto', 'exact' or 'best_effort'"
            ))),
        }
    }
}

impl fmt::Display for TimerTierSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerTierSetting::Auto => write!(f, "auto"),
            TimerTierSetting::Exact => write!(f, "exact"),
            TimerTierSetting::BestEffort => write!(f, "best_effort"),
        }
    }
}

/// Scheduler configuration, parsed from TOML or the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Wake-timer tier selection.
    #[serde(default)]
    pub timer_tier: TimerTierSetting,
    /// Slack window for best-effort wake-ups, in seconds.
    #[serde(default = "default_best_effort_window")]
    pub best_effort_window_secs: u64,
    /// Capacity of the worker command channel.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
}

fn default_best_effort_window() -> u64 { 60 }
fn default_command_buffer() -> usize { 64 }

/// Upper bound for `best_effort_window_secs` (one day).
pub const MAX_BEST_EFFORT_WINDOW_SECS: u64 = 24 * 60 * 60;

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timer_tier: TimerTierSetting::default(),
            best_effort_window_secs: default_best_effort_window(),
            command_buffer: default_command_buffer(),
        }
    }
}

impl SchedulerConfig {
    /// Parse config from a TOML string, then apply env overrides.
    pub fn from_toml(toml_str: &str) -> Result<Self, AlarmqError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AlarmqError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Build config from defaults plus environment variables (loads `.env` first).
    pub fn from_env() -> Result<Self, AlarmqError> {
        load_dotenv();
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `ALARMQ_*` environment variables.
    pub fn apply_env_overrides(&mut self) -> Result<(), AlarmqError> {
        if let Some(v) = env_opt("ALARMQ_TIMER_TIER") {
            self.timer_tier = v.parse()?;
        }
        if let Some(v) = env_opt("ALARMQ_BEST_EFFORT_WINDOW_SECS") {
            self.best_effort_window_secs = v.parse().map_err(|_| {
                AlarmqError::Config(format!("ALARMQ_BEST_EFFORT_WINDOW_SECS is not a number: '{v}'"))
            })?;
        }
        if let Some(v) = env_opt("ALARMQ_COMMAND_BUFFER") {
            self.command_buffer = v.parse().map_err(|_| {
                AlarmqError::Config(format!("ALARMQ_COMMAND_BUFFER is not a number: '{v}'"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AlarmqError> {
        if self.best_effort_window_secs == 0 {
            return Err(AlarmqError::Config(
                "best_effort_window_secs must be greater than zero".into(),
            ));
        }
        if self.best_effort_window_secs > MAX_BEST_EFFORT_WINDOW_SECS {
            return Err(AlarmqError::Config(format!(
                "best_effort_window_secs must be at most {MAX_BEST_EFFORT_WINDOW_SECS}, got {}",
                self.best_effort_window_secs
            )));
        }
        if self.command_buffer == 0 {
            return Err(AlarmqError::Config(
                "command_buffer must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn best_effort_window(&self) -> Duration {
        Duration::from_secs(self.best_effort_window_secs)
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Scheduler config loaded:");
        tracing::info!("  timer_tier:        {}", self.timer_tier);
        tracing::info!("  best_effort_window: {}s", self.best_effort_window_secs);
        tracing::info!("  command_buffer:    {}", self.command_buffer);
    }
}
