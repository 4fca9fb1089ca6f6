//! The sync scheduler state machine.
//!
//! Owns all mutable scheduler state behind one lock; callers hold an `Arc`
//! and the instance's lifetime is theirs to manage. At most one job executes
//! at a time: the running flag is checked-and-set synchronously under the
//! lock, so overlapping triggers (cron tick, manual `run_now`) are dropped
//! rather than queued. Jobs run on their own spawned task, which is what
//! lets `stop` abandon tracking without killing the job and lets
//! `graceful_stop` wait on a shared handle with a timeout.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::{debug, error, info, warn};

use crate::cron::CronSchedule;
use crate::errors::SchedulerError;
use crate::job::{RunOutcome, SchedulerConfig, SchedulerState, SchedulerStatus, SyncJobResult};

/// The injected sync operation. Errors are caught by the scheduler and
/// synthesized into a failure-shaped [`SyncJobResult`]; a job failure never
/// crashes the host process.
pub type SyncFn =
    Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<SyncJobResult>> + Send + Sync>;

type JobCallback = Box<dyn Fn(&SyncJobResult) + Send + Sync>;
type SharedJob = Shared<BoxFuture<'static, SyncJobResult>>;

struct Inner {
    state: SchedulerState,
    last_run_at: Option<DateTime<Utc>>,
    last_run_result: Option<RunOutcome>,
    run_count: u64,
    error_count: u64,
    job_running: bool,
    current_job: Option<SharedJob>,
    tick_task: Option<tokio::task::JoinHandle<()>>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            state: SchedulerState::Idle,
            last_run_at: None,
            last_run_result: None,
            run_count: 0,
            error_count: 0,
            job_running: false,
            current_job: None,
            tick_task: None,
        }
    }
}

/// Cron-driven, self-excluding job runner.
pub struct SyncScheduler {
    config: SchedulerConfig,
    schedule: CronSchedule,
    sync_fn: SyncFn,
    inner: Mutex<Inner>,
    callbacks: Mutex<Vec<JobCallback>>,
    weak: Weak<SyncScheduler>,
}

impl SyncScheduler {
    /// Builds a scheduler, validating the cron expression up front.
    ///
    /// # Errors
    /// Returns [`SchedulerError::InvalidCron`] for a malformed or
    /// out-of-range expression. An invalid schedule is never accepted
    /// silently.
    pub fn new(config: SchedulerConfig, sync_fn: SyncFn) -> Result<Arc<Self>, SchedulerError> {
        let schedule = CronSchedule::parse(&config.cron_expression)?;

        Ok(Arc::new_cyclic(|weak| Self {
            config,
            schedule,
            sync_fn,
            inner: Mutex::new(Inner::default()),
            callbacks: Mutex::new(Vec::new()),
            weak: weak.clone(),
        }))
    }

    /// Registers a completion callback. Callbacks run after every job; a
    /// panicking callback is logged and never affects the scheduler or its
    /// siblings.
    pub fn on_job_complete(&self, callback: impl Fn(&SyncJobResult) + Send + Sync + 'static) {
        self.callbacks.lock().unwrap().push(Box::new(callback));
    }

    /// Current status snapshot. `next_run_at` is computed fresh on every
    /// call and is `None` only when the scheduler is stopped.
    pub fn status(&self) -> SchedulerStatus {
        let inner = self.inner.lock().unwrap();
        let next_run_at = if inner.state == SchedulerState::Stopped {
            None
        } else {
            self.schedule.next_after(Utc::now(), self.config.timezone)
        };

        SchedulerStatus {
            state: inner.state,
            last_run_at: inner.last_run_at,
            last_run_result: inner.last_run_result,
            next_run_at,
            run_count: inner.run_count,
            error_count: inner.error_count,
        }
    }

    /// Whether a job is currently in flight.
    pub fn is_job_running(&self) -> bool {
        self.inner.lock().unwrap().job_running
    }

    /// Starts the cron tick task. Returns false (no-op) when already
    /// running.
    pub fn start(&self) -> bool {
        let Some(sched) = self.weak.upgrade() else {
            return false;
        };

        let mut inner = self.inner.lock().unwrap();
        if inner.state == SchedulerState::Running {
            return false;
        }

        inner.tick_task = Some(tokio::spawn(sched.tick_loop()));
        inner.state = SchedulerState::Running;
        info!(
            cron = %self.config.cron_expression,
            timezone = %self.config.timezone,
            "scheduler started"
        );
        true
    }

    /// Stops immediately: cancels the cron tick and abandons in-flight job
    /// tracking without waiting. Returns false when idle or already stopped.
    pub fn stop(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if matches!(inner.state, SchedulerState::Idle | SchedulerState::Stopped) {
            return false;
        }

        if let Some(task) = inner.tick_task.take() {
            task.abort();
        }
        inner.current_job = None;
        inner.state = SchedulerState::Stopped;
        info!("scheduler stopped");
        true
    }

    /// Graceful shutdown: cancels future ticks, then waits up to `timeout`
    /// (default from config) for the in-flight job. On timeout the job is
    /// abandoned, not cancelled; its task may keep running after the
    /// scheduler reports stopped.
    pub async fn graceful_stop(&self, timeout: Option<Duration>) {
        let waiting: Option<SharedJob> = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state == SchedulerState::Stopped {
                return;
            }

            if let Some(task) = inner.tick_task.take() {
                task.abort();
            }

            if !inner.job_running || inner.current_job.is_none() {
                inner.state = SchedulerState::Stopped;
                info!("scheduler stopped (no job in flight)");
                return;
            }

            inner.state = SchedulerState::Stopping;
            inner.current_job.clone()
        };

        let budget = timeout.unwrap_or(self.config.sync_timeout);
        if let Some(job) = waiting {
            match tokio::time::timeout(budget, job).await {
                Ok(_) => debug!("in-flight job completed during graceful stop"),
                Err(_) => warn!(
                    "graceful stop timed out after {budget:?}, abandoning in-flight job"
                ),
            }
        }

        let mut inner = self.inner.lock().unwrap();
        inner.state = SchedulerState::Stopped;
        inner.current_job = None;
        info!("scheduler stopped");
    }

    /// Runs a job immediately if none is in flight.
    ///
    /// Returns `None` without queueing when the scheduler is not in a
    /// runnable state or a job is already executing; the check-and-set of
    /// the running flag happens synchronously under the lock, so two
    /// triggers can never both start a job.
    pub async fn run_now(&self) -> Option<SyncJobResult> {
        let shared: SharedJob = {
            let mut inner = self.inner.lock().unwrap();

            if !matches!(
                inner.state,
                SchedulerState::Running | SchedulerState::Stopping
            ) {
                return None;
            }
            if inner.job_running {
                debug!("a sync job is already in flight, dropping this trigger");
                return None;
            }

            let sched = self.weak.upgrade()?;
            inner.job_running = true;

            let handle = tokio::spawn(sched.execute_job());
            let shared = handle
                .map(|joined| {
                    joined.unwrap_or_else(|err| {
                        SyncJobResult::failure(Utc::now(), format!("sync job task failed: {err}"))
                    })
                })
                .boxed()
                .shared();
            inner.current_job = Some(shared.clone());
            shared
        };

        let result = shared.await;

        {
            let mut inner = self.inner.lock().unwrap();
            inner.job_running = false;
            inner.current_job = None;
        }

        Some(result)
    }

    async fn tick_loop(self: Arc<Self>) {
        loop {
            let Some(next) = self.schedule.next_after(Utc::now(), self.config.timezone) else {
                warn!("cron expression never fires again, tick loop exiting");
                return;
            };

            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            debug!(next_run_at = %next, "sleeping until next scheduled sync");
            tokio::time::sleep(wait).await;

            if self.run_now().await.is_none() {
                debug!("scheduled sync skipped");
            }
        }
    }

    /// Executes the sync function on its own task and folds the outcome into
    /// the scheduler state. Never propagates an error.
    async fn execute_job(self: Arc<Self>) -> SyncJobResult {
        let started_at = Utc::now();

        let result = match tokio::spawn((self.sync_fn)()).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                error!("sync job failed: {err:#}");
                SyncJobResult::failure(started_at, err.to_string())
            }
            Err(join_err) => {
                error!("sync job panicked: {join_err}");
                SyncJobResult::failure(started_at, format!("sync job panicked: {join_err}"))
            }
        };

        {
            let mut inner = self.inner.lock().unwrap();
            inner.last_run_at = Some(started_at);
            inner.run_count += 1;
            if result.success {
                inner.last_run_result = Some(RunOutcome::Success);
            } else {
                inner.last_run_result = Some(RunOutcome::Failure);
                inner.error_count += 1;
            }
        }

        self.notify_job_complete(&result);
        result
    }

    fn notify_job_complete(&self, result: &SyncJobResult) {
        let callbacks = self.callbacks.lock().unwrap();
        for callback in callbacks.iter() {
            let outcome =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(result)));
            if let Err(panic) = outcome {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".into());
                error!("job completion callback panicked: {message}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use chrono_tz::Asia::Tokyo;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn config(cron: &str) -> SchedulerConfig {
        SchedulerConfig {
            cron_expression: cron.to_string(),
            timezone: Tokyo,
            sync_timeout: Duration::from_secs(60),
        }
    }

    fn ok_result(synced: usize) -> SyncJobResult {
        let now = Utc::now();
        SyncJobResult {
            started_at: now,
            completed_at: now,
            success: true,
            synced_count: synced,
            failed_count: 0,
            errors: Vec::new(),
            duration_ms: 0,
        }
    }

    fn immediate_sync_fn(synced: usize) -> SyncFn {
        Arc::new(move || async move { Ok(ok_result(synced)) }.boxed())
    }

    fn gated_sync_fn(gate: Arc<Notify>) -> SyncFn {
        Arc::new(move || {
            let gate = gate.clone();
            async move {
                gate.notified().await;
                Ok(ok_result(1))
            }
            .boxed()
        })
    }

    #[test]
    fn invalid_cron_fails_at_construction() {
        for expr in ["", "* * *", "60 * * * *"] {
            let result = SyncScheduler::new(config(expr), immediate_sync_fn(0));
            assert!(
                matches!(result, Err(SchedulerError::InvalidCron(_))),
                "expression {expr:?} must be rejected"
            );
        }
    }

    #[tokio::test]
    async fn start_stop_lifecycle_and_next_run() {
        let sched = SyncScheduler::new(config("0 2 * * *"), immediate_sync_fn(0)).unwrap();
        assert_eq!(sched.status().state, SchedulerState::Idle);

        assert!(sched.start());
        assert!(!sched.start(), "second start is a no-op");
        assert_eq!(sched.status().state, SchedulerState::Running);

        let next = sched.status().next_run_at.expect("running scheduler has a next run");
        assert!(next > Utc::now());
        assert_eq!(next.with_timezone(&Tokyo).hour(), 2);
        assert_eq!(next.with_timezone(&Tokyo).minute(), 0);

        assert!(sched.stop());
        assert!(!sched.stop(), "second stop is a no-op");
        assert_eq!(sched.status().state, SchedulerState::Stopped);
        assert!(sched.status().next_run_at.is_none());

        // A stopped scheduler can be started again.
        assert!(sched.start());
        assert_eq!(sched.status().state, SchedulerState::Running);
        sched.stop();
    }

    #[tokio::test]
    async fn run_now_refused_unless_started() {
        let sched = SyncScheduler::new(config("0 2 * * *"), immediate_sync_fn(1)).unwrap();
        assert!(sched.run_now().await.is_none());

        sched.start();
        let result = sched.run_now().await.expect("runnable while running");
        assert!(result.success);

        sched.stop();
        assert!(sched.run_now().await.is_none());
    }

    #[tokio::test]
    async fn successful_run_updates_counters_and_status() {
        let sched = SyncScheduler::new(config("0 2 * * *"), immediate_sync_fn(10)).unwrap();
        sched.start();

        let result = sched.run_now().await.unwrap();
        assert!(result.success);
        assert_eq!(result.synced_count, 10);
        assert_eq!(result.failed_count, 0);
        assert!(result.errors.is_empty());

        let status = sched.status();
        assert_eq!(status.run_count, 1);
        assert_eq!(status.error_count, 0);
        assert_eq!(status.last_run_result, Some(RunOutcome::Success));
        assert!(status.last_run_at.is_some());

        sched.stop();
    }

    #[tokio::test]
    async fn second_run_now_while_first_pending_returns_none() {
        let gate = Arc::new(Notify::new());
        let sched = SyncScheduler::new(config("0 2 * * *"), gated_sync_fn(gate.clone())).unwrap();
        sched.start();

        let runner = {
            let sched = Arc::clone(&sched);
            tokio::spawn(async move { sched.run_now().await })
        };
        // Let the first job claim the running flag.
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(sched.is_job_running());
        assert!(sched.run_now().await.is_none(), "overlapping trigger is dropped");

        gate.notify_one();
        let first = runner.await.unwrap();
        assert!(first.expect("first run completes").success);
        assert_eq!(sched.status().run_count, 1);

        sched.stop();
    }

    #[tokio::test]
    async fn sync_fn_error_is_synthesized_not_propagated() {
        let sync_fn: SyncFn =
            Arc::new(|| async { anyhow::bail!("upstream exploded") }.boxed());
        let sched = SyncScheduler::new(config("0 2 * * *"), sync_fn).unwrap();
        sched.start();

        let result = sched.run_now().await.unwrap();
        assert!(!result.success);
        assert_eq!(result.errors, vec!["upstream exploded".to_string()]);

        let status = sched.status();
        assert_eq!(status.run_count, 1);
        assert_eq!(status.error_count, 1);
        assert_eq!(status.last_run_result, Some(RunOutcome::Failure));
        // The scheduler survives and keeps accepting work.
        assert_eq!(status.state, SchedulerState::Running);

        sched.stop();
    }

    #[tokio::test]
    async fn callback_panic_is_isolated() {
        let sched = SyncScheduler::new(config("0 2 * * *"), immediate_sync_fn(1)).unwrap();
        let observed = Arc::new(AtomicUsize::new(0));

        sched.on_job_complete(|_| panic!("bad callback"));
        {
            let observed = observed.clone();
            sched.on_job_complete(move |result| {
                assert!(result.success);
                observed.fetch_add(1, Ordering::SeqCst);
            });
        }

        sched.start();
        let result = sched.run_now().await.unwrap();
        assert!(result.success);
        assert_eq!(observed.load(Ordering::SeqCst), 1, "later callbacks still run");

        sched.stop();
    }

    #[tokio::test]
    async fn graceful_stop_waits_for_inflight_job() {
        let gate = Arc::new(Notify::new());
        let sched = SyncScheduler::new(config("0 2 * * *"), gated_sync_fn(gate.clone())).unwrap();
        sched.start();

        let runner = {
            let sched = Arc::clone(&sched);
            tokio::spawn(async move { sched.run_now().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Release the job shortly after the graceful stop begins waiting.
        let releaser = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            gate.notify_one();
        });

        sched.graceful_stop(Some(Duration::from_secs(5))).await;
        assert_eq!(sched.status().state, SchedulerState::Stopped);

        let result = runner.await.unwrap();
        assert!(result.unwrap().success, "job completed before the stop");
        assert_eq!(sched.status().run_count, 1);
        releaser.await.unwrap();
    }

    #[tokio::test]
    async fn graceful_stop_times_out_and_abandons_the_job() {
        let sync_fn: SyncFn =
            Arc::new(|| futures::future::pending::<anyhow::Result<SyncJobResult>>().boxed());
        let sched = SyncScheduler::new(config("0 2 * * *"), sync_fn).unwrap();
        sched.start();

        let runner = {
            let sched = Arc::clone(&sched);
            tokio::spawn(async move { sched.run_now().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        sched.graceful_stop(Some(Duration::from_millis(100))).await;
        assert_eq!(sched.status().state, SchedulerState::Stopped);
        assert_eq!(sched.status().run_count, 0, "abandoned job never completed");

        runner.abort();
    }

    #[tokio::test]
    async fn graceful_stop_without_inflight_job_stops_immediately() {
        let sched = SyncScheduler::new(config("0 2 * * *"), immediate_sync_fn(0)).unwrap();
        sched.start();

        sched.graceful_stop(Some(Duration::from_secs(1))).await;
        assert_eq!(sched.status().state, SchedulerState::Stopped);
    }
}
