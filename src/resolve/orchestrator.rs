//! The single entry point of the resolution pipeline.
//!
//! [`Orchestrator::run`] turns an ordered list of playlist entries into an
//! order-preserving [`Report`]. It validates configuration up front, builds
//! one [`ResolutionTask`] per entry, picks a [`WorkerPool`] for the
//! configured [`Strategy`] and interprets every attempt result through the
//! [`RetryPolicy`]. The pools never see outcomes; they only learn whether a
//! task is done or goes back in line.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::aggregator::{AggregateError, Aggregator, Report};
use super::config::{ConfigError, RunConfig, RunOptions, Strategy};
use super::outcome::ResolutionOutcome;
use super::pacing::{Pacer, Paced};
use super::pool::{BoundedPool, SequentialPool, Step, TaskRunner, WorkerPool};
use super::progress::ProgressObserver;
use super::retry::{RetryDecision, RetryPolicy};
use super::task::{AttemptResult, ResolutionTask, run_attempt};
use crate::extractor::Extractor;
use crate::playlist::{Playlist, PlaylistEntry};

/// Errors that stop a run before any entry is processed.
#[derive(Debug, Error)]
pub enum RunError {
    /// The entry list is malformed (duplicate or missing positions).
    #[error("invalid playlist entries: {0}")]
    Entries(#[from] AggregateError),
}

/// Drives a playlist through extraction under one validated configuration.
pub struct Orchestrator {
    extractor: Arc<dyn Extractor>,
    config: RunConfig,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("extractor", &self.extractor.name())
            .field("config", &self.config)
            .finish()
    }
}

impl Orchestrator {
    /// Validates `options` and creates an orchestrator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the options are invalid. Nothing has run
    /// at that point.
    pub fn new(extractor: Arc<dyn Extractor>, options: RunOptions) -> Result<Self, ConfigError> {
        let config = RunConfig::from_options(options)?;
        Ok(Self::with_config(extractor, config))
    }

    /// Creates an orchestrator from an already validated configuration.
    #[must_use]
    pub fn with_config(extractor: Arc<dyn Extractor>, config: RunConfig) -> Self {
        Self { extractor, config }
    }

    /// The validated configuration.
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Resolves every entry of `playlist`.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::run`].
    pub async fn run_playlist(
        &self,
        playlist: &Playlist,
        observer: Option<Arc<dyn ProgressObserver>>,
        cancel: CancellationToken,
    ) -> Result<Report, RunError> {
        self.run(playlist.entries.clone(), observer, cancel).await
    }

    /// Resolves every entry and returns the report in playlist order.
    ///
    /// Per-entry failures never fail the run; they show up as `Failed` or
    /// `Skipped` items. When `cancel` fires, no further attempts start,
    /// attempts already running finish, and unfinished entries are reported
    /// as `Cancelled`.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Entries`] when entry positions are not exactly
    /// `0..entries.len()`.
    #[instrument(
        skip_all,
        fields(
            extractor = self.extractor.name(),
            entries = entries.len(),
            strategy = %self.config.strategy(),
            concurrency = self.config.concurrency()
        )
    )]
    pub async fn run(
        &self,
        entries: Vec<PlaylistEntry>,
        observer: Option<Arc<dyn ProgressObserver>>,
        cancel: CancellationToken,
    ) -> Result<Report, RunError> {
        let started = Instant::now();
        let aggregator = Arc::new(Aggregator::new(entries, observer.clone())?);

        let tasks: Vec<ResolutionTask> = aggregator
            .entries()
            .iter()
            .map(|entry| ResolutionTask::new(entry.clone(), self.config.quality_for(entry)))
            .collect();

        let policy = self.config.retry_policy();
        let pool: Box<dyn WorkerPool> = match self.config.strategy() {
            Strategy::Sequential => Box::new(SequentialPool::new()),
            Strategy::Concurrent => Box::new(BoundedPool::new(self.config.workers())),
        };
        let driver = Arc::new(Driver {
            extractor: Arc::clone(&self.extractor),
            aggregator: Arc::clone(&aggregator),
            policy,
            pacer: Pacer::new(policy.pacing_delay(), cancel.clone()),
            attempt_timeout: self.config.attempt_timeout(),
            observer,
            cancel: cancel.clone(),
        });

        info!(
            pool = pool.name(),
            max_attempts = policy.max_attempts(),
            pacing_ms = policy.pacing_delay().as_millis(),
            "starting resolution run"
        );
        let runner: Arc<dyn TaskRunner> = driver.clone();
        let stats = pool.run(tasks, runner, &cancel).await;

        let cancelled = cancel.is_cancelled();
        let report = aggregator.into_report(cancelled).await;
        let summary = report.summary;
        info!(
            resolved = summary.resolved,
            skipped = summary.skipped,
            failed = summary.failed,
            cancelled = summary.cancelled,
            attempts = stats.attempts,
            requeued = stats.requeued,
            peak_in_flight = stats.peak_in_flight,
            paced_secs = driver.pacer.total_paced().as_secs(),
            elapsed_ms = started.elapsed().as_millis(),
            "resolution run finished"
        );
        Ok(report)
    }
}

/// Interprets attempt results for the pools.
struct Driver {
    extractor: Arc<dyn Extractor>,
    aggregator: Arc<Aggregator>,
    policy: RetryPolicy,
    pacer: Pacer,
    attempt_timeout: Option<Duration>,
    observer: Option<Arc<dyn ProgressObserver>>,
    cancel: CancellationToken,
}

impl Driver {
    async fn finish(&self, position: usize, outcome: ResolutionOutcome) {
        if let Err(error) = self.aggregator.record(position, outcome).await {
            warn!(position, error = %error, "outcome not recorded");
        }
    }
}

#[async_trait]
impl TaskRunner for Driver {
    async fn run_attempt(&self, mut task: ResolutionTask) -> Step {
        if self.pacer.wait().await == Paced::Cancelled {
            debug!(position = task.position(), "run cancelled before attempt");
            return Step::Done;
        }

        let attempt = task.begin_attempt();
        if let Some(observer) = &self.observer {
            observer.on_attempt(task.entry(), attempt);
        }

        let position = task.position();
        match run_attempt(self.extractor.as_ref(), &task, self.attempt_timeout).await {
            AttemptResult::Resolved(media) => {
                self.finish(
                    position,
                    ResolutionOutcome::Resolved {
                        direct_url: media.direct_url,
                        resolution_label: media.resolution_label,
                        approx_size_bytes: media.approx_size_bytes,
                    },
                )
                .await;
                Step::Done
            }
            AttemptResult::Unavailable(reason) => {
                debug!(position, entry_id = %task.entry().id, %reason, "entry unavailable; skipping");
                self.finish(position, ResolutionOutcome::Skipped { reason })
                    .await;
                Step::Done
            }
            AttemptResult::Fault(reason) => {
                self.finish(
                    position,
                    ResolutionOutcome::Failed {
                        reason,
                        attempts_made: attempt,
                    },
                )
                .await;
                Step::Done
            }
            AttemptResult::Transient(reason) => match self.policy.should_retry(attempt) {
                RetryDecision::GiveUp { attempts_made } => {
                    warn!(
                        position,
                        entry_id = %task.entry().id,
                        attempts_made,
                        error = %reason,
                        "giving up on entry"
                    );
                    self.finish(
                        position,
                        ResolutionOutcome::Failed {
                            reason,
                            attempts_made,
                        },
                    )
                    .await;
                    Step::Done
                }
                RetryDecision::Retry { attempt: next, .. } => {
                    if self.cancel.is_cancelled() {
                        debug!(position, "run cancelled; not retrying");
                        return Step::Done;
                    }
                    debug!(
                        position,
                        entry_id = %task.entry().id,
                        next_attempt = next,
                        error = %reason,
                        "transient failure; requeueing"
                    );
                    if let Some(observer) = &self.observer {
                        observer.on_retry(task.entry(), next, &reason);
                    }
                    Step::Requeue(task)
                }
            },
        }
    }

    async fn abandon(&self, position: usize, attempts_made: u32, reason: String) {
        self.finish(
            position,
            ResolutionOutcome::Failed {
                reason,
                attempts_made,
            },
        )
        .await;
    }
}
