//! Worker pools: admission control for resolution tasks.
//!
//! A pool decides *when* a task's next attempt runs and nothing else. What
//! an attempt does and what its result means belongs to the [`TaskRunner`]
//! the orchestrator hands in; the pool only learns whether the task is
//! finished or needs to go back in line.
//!
//! # Concurrency Model
//!
//! - [`SequentialPool`] runs one attempt at a time, in queue order
//! - [`BoundedPool`] runs up to `W` attempts at once, each in its own Tokio
//!   task tracked by a `JoinSet`; a slot frees the moment an attempt returns
//! - Admission is FIFO over the initial queue; requeued tasks join the back
//! - Once the run is cancelled no further attempts are admitted, while
//!   attempts already running are awaited to completion

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::task::{ResolutionTask, panic_message};

/// What should happen to a task after one attempt.
#[derive(Debug)]
pub enum Step {
    /// The task is finished (terminal outcome recorded, or run cancelled).
    Done,
    /// The task should be attempted again.
    Requeue(ResolutionTask),
}

/// Executes one attempt of a task on behalf of a pool.
#[async_trait]
pub trait TaskRunner: Send + Sync + 'static {
    /// Runs one attempt of `task` and reports what happens next.
    async fn run_attempt(&self, task: ResolutionTask) -> Step;

    /// Called when an attempt faulted outside the runner's own containment.
    /// The runner must record a terminal outcome for `position`.
    async fn abandon(&self, position: usize, attempts_made: u32, reason: String);
}

/// Counters collected by a pool run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Attempts admitted.
    pub attempts: usize,
    /// Tasks put back in the queue for another attempt.
    pub requeued: usize,
    /// Highest number of attempts in flight at once.
    pub peak_in_flight: usize,
    /// Tasks never admitted because the run was cancelled.
    pub not_admitted: usize,
}

/// Admission strategy shared by both scheduling modes.
#[async_trait]
pub trait WorkerPool: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Maximum attempts in flight.
    fn concurrency(&self) -> usize;

    /// Drives every task until it is done or the run is cancelled.
    async fn run(
        &self,
        tasks: Vec<ResolutionTask>,
        runner: Arc<dyn TaskRunner>,
        cancel: &CancellationToken,
    ) -> PoolStats;
}

/// Runs one attempt and converts an escaped panic into `abandon`.
async fn guarded_attempt(runner: Arc<dyn TaskRunner>, task: ResolutionTask) -> Step {
    let position = task.position();
    let attempts_made = task.attempts_made();
    match AssertUnwindSafe(runner.run_attempt(task)).catch_unwind().await {
        Ok(step) => step,
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            warn!(position, %reason, "task faulted outside the attempt boundary");
            runner.abandon(position, attempts_made + 1, reason).await;
            Step::Done
        }
    }
}

/// One attempt at a time, strictly in queue order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialPool;

impl SequentialPool {
    /// Creates a sequential pool.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WorkerPool for SequentialPool {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn concurrency(&self) -> usize {
        1
    }

    #[instrument(skip_all, fields(pool = "sequential", tasks = tasks.len()))]
    async fn run(
        &self,
        tasks: Vec<ResolutionTask>,
        runner: Arc<dyn TaskRunner>,
        cancel: &CancellationToken,
    ) -> PoolStats {
        let mut ready: VecDeque<ResolutionTask> = tasks.into();
        let mut stats = PoolStats::default();

        while let Some(task) = ready.pop_front() {
            if cancel.is_cancelled() {
                stats.not_admitted = ready.len() + 1;
                info!(not_admitted = stats.not_admitted, "run cancelled; stopping admission");
                break;
            }

            stats.attempts += 1;
            stats.peak_in_flight = 1;
            if let Step::Requeue(task) = guarded_attempt(Arc::clone(&runner), task).await {
                stats.requeued += 1;
                ready.push_back(task);
            }
        }

        stats
    }
}

/// Up to `workers` attempts in flight at once.
#[derive(Debug, Clone, Copy)]
pub struct BoundedPool {
    workers: usize,
}

impl BoundedPool {
    /// Creates a pool admitting at most `workers` concurrent attempts
    /// (at least one).
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }
}

#[async_trait]
impl WorkerPool for BoundedPool {
    fn name(&self) -> &'static str {
        "bounded"
    }

    fn concurrency(&self) -> usize {
        self.workers
    }

    #[instrument(skip_all, fields(pool = "bounded", workers = self.workers, tasks = tasks.len()))]
    async fn run(
        &self,
        tasks: Vec<ResolutionTask>,
        runner: Arc<dyn TaskRunner>,
        cancel: &CancellationToken,
    ) -> PoolStats {
        let mut ready: VecDeque<ResolutionTask> = tasks.into();
        let mut in_flight: JoinSet<Step> = JoinSet::new();
        let mut stats = PoolStats::default();

        loop {
            while in_flight.len() < self.workers && !cancel.is_cancelled() {
                let Some(task) = ready.pop_front() else {
                    break;
                };
                stats.attempts += 1;
                in_flight.spawn(guarded_attempt(Arc::clone(&runner), task));
                stats.peak_in_flight = stats.peak_in_flight.max(in_flight.len());
            }

            // Nothing running means nothing can be requeued either: the
            // queue is drained or admission has stopped.
            let Some(joined) = in_flight.join_next().await else {
                break;
            };

            match joined {
                Ok(Step::Requeue(task)) => {
                    stats.requeued += 1;
                    ready.push_back(task);
                }
                Ok(Step::Done) => {}
                Err(error) => {
                    // Panics are caught inside the task, so this is an abort.
                    warn!(error = %error, "resolution task did not complete");
                }
            }
        }

        if !ready.is_empty() {
            stats.not_admitted = ready.len();
            info!(not_admitted = stats.not_admitted, "run cancelled; tasks left unadmitted");
        }
        debug!(
            attempts = stats.attempts,
            requeued = stats.requeued,
            peak_in_flight = stats.peak_in_flight,
            "bounded pool drained"
        );
        stats
    }
}
