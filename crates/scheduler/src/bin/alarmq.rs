//! alarmq — run the scheduling engine against real tokio timers.
//!
//! Alarms are given on the command line as `ID:KIND:SECONDS`, where
//! `SECONDS` is relative to now (negative values are already past due).
//! Schedule changes and fire signals are logged; the process exits once
//! nothing is pending, or on Ctrl-C.

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};

use alarmq_scheduler::{
    AlarmId, AlarmKind, AlarmqError, FireSignal, ScheduleEvent, SchedulerConfig, SchedulerHandle,
    SchedulingEngine, TieredWakeTimer, TokioTimerBackend,
};

// ── CLI ─────────────────────────────────────────────────────────────

/// Single-timer alarm scheduler.
#[derive(Parser, Debug)]
#[command(name = "alarmq", version, about)]
struct Cli {
    /// Path to a TOML config file. Falls back to ALARMQ_* env vars.
    #[arg(long, env = "ALARMQ_CONFIG")]
    config: Option<String>,

    /// Alarm to schedule, as ID:KIND:SECONDS_FROM_NOW. Repeatable.
    #[arg(long = "alarm", value_parser = parse_alarm)]
    alarms: Vec<AlarmArg>,
}

#[derive(Debug, Clone)]
struct AlarmArg {
    id: AlarmId,
    kind: AlarmKind,
    offset: chrono::Duration,
}

fn parse_alarm(s: &str) -> Result<AlarmArg, AlarmqError> {
    let mut parts = s.splitn(3, ':');
    let (Some(id), Some(kind), Some(offset)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AlarmqError::InvalidAlarm(format!("expected ID:KIND:SECONDS, got '{s}'")));
    };
    let id = id.trim().parse().map_err(|_| AlarmqError::InvalidAlarm(format!("invalid alarm id '{id}'")))?;
    let kind = kind.trim();
    if kind.is_empty() {
        return Err(AlarmqError::InvalidAlarm("alarm kind must not be empty".into()));
    }
    let offset = offset
        .trim()
        .parse()
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| AlarmqError::InvalidAlarm(format!("invalid offset '{offset}'")))?;
    Ok(AlarmArg {
        id,
        kind: AlarmKind::from(kind),
        offset,
    })
}

// ── Main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SchedulerConfig::from_file(path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => SchedulerConfig::from_env().context("invalid ALARMQ_* environment")?,
    };
    config.log_summary();

    let (backend, wakeups) = TokioTimerBackend::channel()?;
    let wake_timer = TieredWakeTimer::new(backend, &config);
    let (events_tx, mut events) = mpsc::unbounded_channel::<ScheduleEvent>();
    let (fires_tx, mut fires) = mpsc::unbounded_channel::<FireSignal>();

    let engine = SchedulingEngine::new(wake_timer, events_tx, fires_tx);
    let (handle, task) = SchedulerHandle::spawn(engine, config.command_buffer, Some(wakeups));

    let now = Utc::now();
    for alarm in &cli.alarms {
        let instant = now
            .checked_add_signed(alarm.offset)
            .with_context(|| format!("alarm {} is out of the representable time range", alarm.id))?;
        info!(alarm_id = alarm.id, kind = %alarm.kind, %instant, "scheduling alarm");
        handle.set(alarm.id, alarm.kind.clone(), instant).await?;
    }

    loop {
        if handle.snapshot().await?.pending.is_empty() {
            info!("nothing left to schedule");
            break;
        }
        tokio::select! {
            Some(event) = events.recv() => match event {
                ScheduleEvent::Scheduled { id } => info!(alarm_id = id, "next alarm scheduled"),
                ScheduleEvent::Unscheduled => info!("no user-facing alarm scheduled"),
            },
            Some(signal) = fires.recv() => {
                info!(alarm_id = signal.id, kind = %signal.kind, "alarm fired");
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted, shutting down");
                break;
            }
        }
    }

    while let Ok(signal) = fires.try_recv() {
        info!(alarm_id = signal.id, kind = %signal.kind, "alarm fired");
    }

    handle.shutdown().await?;
    let engine = task.await?;
    info!(stats = %serde_json::to_string(engine.stats())?, "scheduler finished");
    Ok(())
}
