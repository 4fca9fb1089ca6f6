//! Scheduler error type.

use thiserror::Error;

use crate::cron::CronParseError;

/// Errors raised at scheduler construction.
///
/// An invalid schedule must fail fast; a scheduler never starts with one.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The cron expression failed syntactic or range validation.
    #[error("invalid cron expression: {0}")]
    InvalidCron(#[from] CronParseError),
}
