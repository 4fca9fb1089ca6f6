//! Scheduler configuration, status, and job result types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Scheduler configuration.
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Five-field cron expression, e.g. `0 2 * * *` for 02:00 daily.
    pub cron_expression: String,
    /// Timezone the expression is evaluated in.
    pub timezone: Tz,
    /// Default wait budget for [`graceful_stop`](crate::SyncScheduler::graceful_stop).
    pub sync_timeout: Duration,
}

impl SchedulerConfig {
    /// Loads configuration from environment variables
    /// (`SYNC_CRON_SCHEDULE`, `SYNC_TIMEZONE`, `SYNC_TIMEOUT_MS`), with the
    /// production defaults for anything unset.
    pub fn from_env() -> Self {
        Self {
            cron_expression: std::env::var("SYNC_CRON_SCHEDULE")
                .unwrap_or_else(|_| "0 2 * * *".into()),
            timezone: std::env::var("SYNC_TIMEZONE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(chrono_tz::Asia::Tokyo),
            sync_timeout: Duration::from_millis(
                std::env::var("SYNC_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300_000),
            ),
        }
    }
}

/// Scheduler lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Outcome of the most recent job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Success,
    Failure,
}

/// Snapshot of the scheduler, read-only to external callers.
///
/// `next_run_at` is recomputed from the cron expression on every query;
/// "next run" is a moving target relative to wall-clock time.
#[derive(Clone, Debug, Serialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_run_result: Option<RunOutcome>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub error_count: u64,
}

/// Record of one scheduler execution.
#[derive(Clone, Debug, Serialize)]
pub struct SyncJobResult {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub success: bool,
    pub synced_count: usize,
    pub failed_count: usize,
    /// Non-fatal errors collected during the cycle, e.g. per-article
    /// embedding failures.
    pub errors: Vec<String>,
    pub duration_ms: i64,
}

impl SyncJobResult {
    /// Failure-shaped result carrying one error message, used when the sync
    /// function itself errors out instead of reporting a structured result.
    pub fn failure(started_at: DateTime<Utc>, message: impl Into<String>) -> Self {
        let completed_at = Utc::now();
        Self {
            started_at,
            completed_at,
            success: false,
            synced_count: 0,
            failed_count: 0,
            errors: vec![message.into()],
            duration_ms: (completed_at - started_at).num_milliseconds(),
        }
    }
}
