//! Retry policy for transient resolution failures.
//!
//! The policy is deliberately flat: a fixed pacing delay before every
//! attempt and a hard cap on attempts. Upstream throttling is opaque, so
//! there is no exponential growth and no jitter.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use playlist_grabber_core::resolve::{RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::new(3, Duration::from_millis(1500));
//!
//! match policy.should_retry(1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("attempt {attempt} in {delay:?}");
//!     }
//!     RetryDecision::GiveUp { attempts_made } => {
//!         println!("gave up after {attempts_made}");
//!     }
//! }
//! ```

use std::time::Duration;

use tracing::debug;

/// Default maximum number of attempts per entry.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default pacing delay before each attempt (1.5 seconds).
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_millis(1500);

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after waiting `delay`.
    Retry {
        /// Pacing delay to wait before the next attempt.
        delay: Duration,
        /// The attempt number that will run next (1-indexed).
        attempt: u32,
    },

    /// Stop; the entry is failed.
    GiveUp {
        /// Attempts made in total.
        attempts_made: u32,
    },
}

/// Fixed-delay retry policy.
///
/// `max_attempts` counts every attempt including the first, so a value of 3
/// means one initial attempt and up to two retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    pacing_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRIES,
            pacing_delay: DEFAULT_PACING_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` is raised to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, pacing_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            pacing_delay,
        }
    }

    /// Maximum attempts including the first.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay applied before every attempt, including the first.
    #[must_use]
    pub fn pacing_delay(&self) -> Duration {
        self.pacing_delay
    }

    /// Decides what happens after attempt number `attempt` (1-indexed) failed
    /// with a transient error.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::GiveUp {
                attempts_made: attempt,
            };
        }

        RetryDecision::Retry {
            delay: self.pacing_delay,
            attempt: attempt + 1,
        }
    }
}
