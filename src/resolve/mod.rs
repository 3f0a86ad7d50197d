//! Bounded-concurrency resolution pipeline.
//!
//! This module turns playlist entries into direct media URLs while keeping
//! the result in playlist order no matter how work interleaves.
//!
//! # Features
//!
//! - One extractor call per attempt, with panics and timeouts contained
//! - Fixed pacing delay before every attempt, per worker
//! - Fixed-delay retries for transient failures; unavailability is never retried
//! - Sequential or bounded-concurrent scheduling behind one pool contract
//! - Write-once, position-indexed aggregation into a [`Report`]
//! - Optional [`ProgressObserver`] and run-scoped cancellation
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use playlist_grabber_core::extractor::YtDlp;
//! use playlist_grabber_core::playlist::PlaylistEntry;
//! use playlist_grabber_core::resolve::{Orchestrator, RunOptions, Strategy};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = RunOptions {
//!     strategy: Strategy::Concurrent,
//!     workers: 5,
//!     ..RunOptions::default()
//! };
//! let orchestrator = Orchestrator::new(Arc::new(YtDlp::default()), options)?;
//! let entries = vec![PlaylistEntry::new("dQw4w9WgXcQ", "Some video", 0)];
//! let report = orchestrator.run(entries, None, CancellationToken::new()).await?;
//! println!("resolved {} of {}", report.summary.resolved, report.summary.total);
//! # Ok(())
//! # }
//! ```

mod aggregator;
mod config;
mod orchestrator;
mod outcome;
mod pacing;
mod pool;
mod progress;
mod retry;
mod task;

pub use aggregator::{AggregateError, Aggregator, Report, ReportItem, ReportSummary};
pub use config::{
    ConfigError, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_WORKERS, MAX_WORKERS, MIN_WORKERS, RunConfig,
    RunOptions, Strategy,
};
pub use orchestrator::{Orchestrator, RunError};
pub use outcome::{OutcomeKind, ResolutionOutcome, SkipReason};
pub use pacing::{Pacer, Paced};
pub use pool::{BoundedPool, PoolStats, SequentialPool, Step, TaskRunner, WorkerPool};
pub use progress::{ProgressEvent, ProgressObserver};
pub use retry::{DEFAULT_MAX_RETRIES, DEFAULT_PACING_DELAY, RetryDecision, RetryPolicy};
pub use task::{AttemptResult, ResolutionTask, run_attempt};
