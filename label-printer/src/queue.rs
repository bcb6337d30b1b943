//! Print dispatch queue
//!
//! A FIFO of rendered labels drained by at most one background worker. The
//! worker looks at the head job without removing it and prints it through the
//! [`PrinterAdapter`]:
//!
//! - success removes the job and resets the consecutive-failure counter
//! - a fatal failure removes only that job
//! - a transient failure keeps the job at the head and retries after a backoff
//! - once consecutive transient failures exceed the threshold, every queued
//!   job is discarded (logged at error level) and the counter resets
//!
//! The worker exits when it finds the queue empty; the next enqueue spawns a
//! fresh one. Spawning happens under the same lock as the append, so two
//! workers never run at once. A panicking adapter counts as a fatal failure
//! of the head job.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{FailureKind, PrintError, QueueError};
use crate::printer::PrinterAdapter;
use crate::types::PrintJob;

/// Delay between retries of the same head job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Delay after the first failure
    pub base: Duration,
    /// 1.0 keeps the delay fixed; above 1.0 grows it exponentially
    pub multiplier: f64,
    /// Upper bound for any single delay
    pub max: Duration,
}

impl BackoffPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self {
            base: delay,
            multiplier: 1.0,
            max: delay,
        }
    }

    /// Delay after `failures` consecutive failures (1-indexed):
    /// `base * multiplier^(failures - 1)`, capped at `max`.
    pub fn next_delay(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base.as_secs_f64() * self.multiplier.max(1.0).powi(exp);
        if !secs.is_finite() || secs >= self.max.as_secs_f64() {
            return self.max;
        }
        Duration::from_secs_f64(secs)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            multiplier: 1.0,
            max: Duration::from_secs(60),
        }
    }
}

/// Retry and fail-safe settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueConfig {
    /// Consecutive transient failures tolerated before the queue is cleared
    pub failure_threshold: u32,
    pub backoff: BackoffPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 10,
            backoff: BackoffPolicy::default(),
        }
    }
}

/// What the worker does after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Keep the head job and try again after the delay
    Retry(Duration),
    /// Remove the head job only
    Drop,
    /// Clear the whole queue
    Exhaust,
}

impl QueueConfig {
    /// Decide from the failure kind and the consecutive transient count
    /// including this failure.
    pub fn on_failure(&self, kind: FailureKind, consecutive: u32) -> Decision {
        match kind {
            FailureKind::Fatal => Decision::Drop,
            FailureKind::Transient if consecutive > self.failure_threshold => Decision::Exhaust,
            FailureKind::Transient => Decision::Retry(self.backoff.next_delay(consecutive)),
        }
    }
}

/// Snapshot of queue counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub worker_active: bool,
    pub workers_spawned: u64,
    pub attempts: u64,
    pub printed: u64,
    pub dropped_fatal: u64,
    /// Times the fail-safe cleared the queue
    pub exhaustions: u64,
    /// Jobs discarded by the fail-safe
    pub dropped_exhausted: u64,
}

struct State {
    jobs: VecDeque<PrintJob>,
    worker_active: bool,
    worker: Option<JoinHandle<()>>,
    next_id: u64,
    stats: QueueStats,
}

struct Inner {
    adapter: Arc<dyn PrinterAdapter>,
    config: QueueConfig,
    handle: Handle,
    state: Mutex<State>,
    shutdown: CancellationToken,
    idle: Notify,
}

/// Serialized print queue with a single on-demand worker.
///
/// Cloning shares the same queue.
#[derive(Clone)]
pub struct PrintDispatchQueue {
    inner: Arc<Inner>,
}

impl PrintDispatchQueue {
    /// Queue whose worker runs on the current tokio runtime
    pub fn new(adapter: Arc<dyn PrinterAdapter>, config: QueueConfig) -> Result<Self, QueueError> {
        let handle = Handle::try_current().map_err(|e| QueueError::NoRuntime(e.to_string()))?;
        Ok(Self::with_handle(adapter, config, handle))
    }

    /// Queue whose worker runs on the given runtime
    pub fn with_handle(
        adapter: Arc<dyn PrinterAdapter>,
        config: QueueConfig,
        handle: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                adapter,
                config,
                handle,
                state: Mutex::new(State {
                    jobs: VecDeque::new(),
                    worker_active: false,
                    worker: None,
                    next_id: 1,
                    stats: QueueStats::default(),
                }),
                shutdown: CancellationToken::new(),
                idle: Notify::new(),
            }),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Append a job and make sure a worker is draining the queue.
    ///
    /// Returns the id assigned to the job.
    pub fn enqueue(&self, job: PrintJob) -> Result<u64, QueueError> {
        let ids = self.enqueue_all(std::iter::once(job))?;
        Ok(ids.into_iter().next().unwrap_or_default())
    }

    /// Append several jobs back to back under one lock.
    ///
    /// Either every job is queued or, after shutdown, none is.
    pub fn enqueue_all(
        &self,
        jobs: impl IntoIterator<Item = PrintJob>,
    ) -> Result<Vec<u64>, QueueError> {
        let mut state = self.inner.state.lock();
        if self.inner.shutdown.is_cancelled() {
            return Err(QueueError::ShutDown);
        }

        let mut ids = Vec::new();
        for mut job in jobs {
            job.id = state.next_id;
            state.next_id += 1;
            ids.push(job.id);
            state.jobs.push_back(job);
        }
        if ids.is_empty() {
            return Ok(ids);
        }
        debug!(job_ids = ?ids, pending = state.jobs.len(), "Jobs enqueued");

        if !state.worker_active {
            state.worker_active = true;
            state.stats.workers_spawned += 1;
            let inner = Arc::clone(&self.inner);
            state.worker = Some(self.inner.handle.spawn(run_worker(inner)));
        }
        Ok(ids)
    }

    /// Stop accepting jobs and stop the worker between attempts.
    ///
    /// An in-flight print is allowed to finish. Jobs still queued are kept
    /// (and logged), not printed.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let worker = self.inner.state.lock().worker.take();
        if let Some(worker) = worker
            && let Err(e) = worker.await
        {
            error!(error = %e, "Print worker task failed");
        }
        let pending = self.inner.state.lock().jobs.len();
        info!(pending, "Print queue shut down");
    }

    /// Wait until no worker is running
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if !self.inner.state.lock().worker_active {
                return;
            }
            notified.await;
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.inner.state.lock();
        QueueStats {
            pending: state.jobs.len(),
            worker_active: state.worker_active,
            ..state.stats
        }
    }
}

/// Clears the worker flag when the worker task ends without doing it itself
struct ActiveGuard<'a> {
    inner: &'a Inner,
    armed: bool,
}

impl ActiveGuard<'_> {
    /// Mark the worker stopped; the caller must not hold the state lock
    fn release(&mut self) {
        self.armed = false;
        self.inner.idle.notify_waiters();
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.state.lock().worker_active = false;
            self.inner.idle.notify_waiters();
            error!("Print worker ended unexpectedly");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn run_worker(inner: Arc<Inner>) {
    info!("Print worker started");
    let mut guard = ActiveGuard {
        inner: inner.as_ref(),
        armed: true,
    };
    let mut failures: u32 = 0;

    loop {
        if inner.shutdown.is_cancelled() {
            break;
        }

        let job = {
            let mut state = inner.state.lock();
            let head = state.jobs.front().cloned();
            match head {
                Some(job) => {
                    state.stats.attempts += 1;
                    job
                }
                None => {
                    state.worker_active = false;
                    drop(state);
                    guard.release();
                    info!("Print queue empty, worker stopping");
                    return;
                }
            }
        };

        let result = AssertUnwindSafe(inner.adapter.print(&job.image))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(PrintError::AdapterPanic(panic_message(&*payload))));

        let err = match result {
            Ok(()) => {
                let mut state = inner.state.lock();
                state.jobs.pop_front();
                state.stats.printed += 1;
                failures = 0;
                info!(job_id = job.id, "Label printed");
                continue;
            }
            Err(e) => e,
        };

        if err.is_transient() {
            failures += 1;
        }

        match inner.config.on_failure(err.kind(), failures) {
            Decision::Drop => {
                let mut state = inner.state.lock();
                state.jobs.pop_front();
                state.stats.dropped_fatal += 1;
                failures = 0;
                error!(job_id = job.id, error = %err, "Print failed permanently, job dropped");
            }
            Decision::Exhaust => {
                let dropped = {
                    let mut state = inner.state.lock();
                    let dropped = state.jobs.len();
                    state.jobs.clear();
                    state.stats.exhaustions += 1;
                    state.stats.dropped_exhausted += dropped as u64;
                    dropped
                };
                error!(
                    job_id = job.id,
                    failures,
                    dropped,
                    error = %err,
                    "Printer unavailable, print queue cleared"
                );
                failures = 0;
            }
            Decision::Retry(delay) => {
                warn!(
                    job_id = job.id,
                    attempt = failures,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Print failed, retrying"
                );
                tokio::select! {
                    _ = inner.shutdown.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    let pending = {
        let mut state = inner.state.lock();
        state.worker_active = false;
        state.jobs.len()
    };
    guard.release();
    if pending > 0 {
        warn!(pending, "Print worker stopped by shutdown with jobs pending");
    } else {
        info!("Print worker stopped by shutdown");
    }
}
