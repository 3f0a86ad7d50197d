//! Pacing delay applied before each extraction attempt.
//!
//! Pacing is per worker: every attempt waits the configured delay before
//! calling the extractor, independently of what other workers are doing.
//! It is a rate control on top of the worker pool's concurrency bound.
//!
//! The wait observes the run's [`CancellationToken`], so a cancelled run
//! never sits out a full delay before noticing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

/// Cumulative pacing above which a single warning is logged.
const CUMULATIVE_PACING_WARNING_THRESHOLD: Duration = Duration::from_secs(300);

/// Result of a pacing wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paced {
    /// The full delay elapsed; the attempt may start.
    Ready,
    /// The run was cancelled during (or before) the wait.
    Cancelled,
}

/// Shared pacing state for one run.
///
/// Designed to be wrapped in `Arc` and shared by every worker of a run.
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    cancel: CancellationToken,
    cumulative_ms: AtomicU64,
}

impl Pacer {
    /// Creates a pacer that waits `delay` before each attempt.
    #[must_use]
    pub fn new(delay: Duration, cancel: CancellationToken) -> Self {
        Self {
            delay,
            cancel,
            cumulative_ms: AtomicU64::new(0),
        }
    }

    /// The configured delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Total pacing time requested across all workers so far.
    #[must_use]
    pub fn total_paced(&self) -> Duration {
        Duration::from_millis(self.cumulative_ms.load(Ordering::SeqCst))
    }

    /// Waits the pacing delay unless the run is cancelled first.
    pub async fn wait(&self) -> Paced {
        if self.cancel.is_cancelled() {
            return Paced::Cancelled;
        }

        self.record(self.delay);
        trace!(delay_ms = self.delay.as_millis(), "pacing before attempt");

        tokio::select! {
            () = self.cancel.cancelled() => Paced::Cancelled,
            () = tokio::time::sleep(self.delay) => Paced::Ready,
        }
    }

    fn record(&self, delay: Duration) {
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let before = self
            .cumulative_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |total| {
                Some(total.saturating_add(delay_ms))
            })
            .unwrap_or_else(|total| total);
        let after = before.saturating_add(delay_ms);
        let threshold =
            u64::try_from(CUMULATIVE_PACING_WARNING_THRESHOLD.as_millis()).unwrap_or(u64::MAX);
        if before < threshold && after >= threshold {
            warn!(
                total_secs = after / 1000,
                "cumulative pacing delay is high; consider the concurrent strategy"
            );
        }
    }
}
