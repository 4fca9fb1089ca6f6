//! Cron-driven synchronization worker.
//!
//! Three pieces, composed by the service binary:
//! - [`CronSchedule`]: five-field cron parsing and timezone-aware next-run
//!   computation, validated before a scheduler can be built.
//! - [`SyncScheduler`]: the idle → running → stopping → stopped state
//!   machine. At most one job in flight; overlapping triggers are dropped,
//!   not queued. `graceful_stop` waits (bounded) for in-flight work.
//! - [`SyncPipeline`]: one sync cycle — fetch articles, embed each one
//!   independently, persist the whole batch in a single transaction.

mod cron;
mod errors;
mod job;
mod pipeline;
mod scheduler;

pub use cron::{CronParseError, CronSchedule};
pub use errors::SchedulerError;
pub use job::{RunOutcome, SchedulerConfig, SchedulerState, SchedulerStatus, SyncJobResult};
pub use pipeline::{ArticleFetcher, DocumentSink, SyncPipeline};
pub use scheduler::{SyncFn, SyncScheduler};
