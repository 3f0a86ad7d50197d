//! Run configuration and its validation.
//!
//! Callers hand in [`RunOptions`] exactly as received (signed integers,
//! float seconds). [`RunConfig::from_options`] validates them before any
//! work starts: a bad value fails the whole run, never part of it.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use super::retry::{DEFAULT_MAX_RETRIES, DEFAULT_PACING_DELAY, RetryPolicy};
use crate::playlist::PlaylistEntry;
use crate::quality::QualityPreference;

/// Minimum allowed worker count.
pub const MIN_WORKERS: i64 = 1;

/// Maximum worker count; larger requests are clamped to this.
pub const MAX_WORKERS: i64 = 20;

/// Default worker count for the concurrent strategy.
pub const DEFAULT_WORKERS: i64 = 10;

/// Default per-attempt timeout.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(120);

/// How tasks are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// One task at a time.
    #[default]
    Sequential,
    /// Up to `workers` tasks at a time.
    Concurrent,
}

impl Strategy {
    /// Returns the stable label used in config files and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Concurrent => "concurrent",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "concurrent" | "async" => Ok(Self::Concurrent),
            other => Err(ConfigError::UnknownStrategy {
                value: other.to_string(),
            }),
        }
    }
}

/// Fatal configuration errors. Raised before any entry is processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Worker count below the minimum.
    #[error("invalid worker count {value}: must be at least {MIN_WORKERS}")]
    InvalidWorkers {
        /// The rejected value.
        value: i64,
    },

    /// Pacing delay not a positive, finite number of seconds.
    #[error("invalid delay {value}s: must be a positive number of seconds")]
    InvalidDelay {
        /// The rejected value.
        value: f64,
    },

    /// Retry budget not positive or too large.
    #[error("invalid retry count {value}: must be between 1 and {}", u32::MAX)]
    InvalidRetries {
        /// The rejected value.
        value: i64,
    },

    /// A zero attempt timeout would fail every attempt.
    #[error("invalid attempt timeout: must be greater than zero")]
    ZeroAttemptTimeout,

    /// Unrecognized strategy label.
    #[error("unknown strategy '{value}': expected 'sequential' or 'concurrent'")]
    UnknownStrategy {
        /// The rejected label.
        value: String,
    },
}

/// Unvalidated run options as supplied by a caller.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Run-wide default quality.
    pub quality: QualityPreference,
    /// Per-entry quality overrides keyed by entry id.
    pub overrides: HashMap<String, QualityPreference>,
    /// Scheduling strategy.
    pub strategy: Strategy,
    /// Requested worker count.
    pub workers: i64,
    /// Pacing delay in seconds.
    pub pacing_delay_secs: f64,
    /// Maximum attempts per entry.
    pub max_retries: i64,
    /// Optional timeout for a single extraction attempt.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            quality: QualityPreference::default(),
            overrides: HashMap::new(),
            strategy: Strategy::default(),
            workers: DEFAULT_WORKERS,
            pacing_delay_secs: DEFAULT_PACING_DELAY.as_secs_f64(),
            max_retries: i64::from(DEFAULT_MAX_RETRIES),
            attempt_timeout: Some(DEFAULT_ATTEMPT_TIMEOUT),
        }
    }
}

/// Validated run configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    quality: QualityPreference,
    overrides: HashMap<String, QualityPreference>,
    strategy: Strategy,
    workers: usize,
    retry_policy: RetryPolicy,
    attempt_timeout: Option<Duration>,
}

impl RunConfig {
    /// Validates caller options.
    ///
    /// Worker counts above [`MAX_WORKERS`] are clamped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for worker counts below 1, non-positive or
    /// non-finite delays, non-positive retry counts, or a zero timeout.
    pub fn from_options(options: RunOptions) -> Result<Self, ConfigError> {
        let workers = validate_workers(options.workers)?;

        if !options.pacing_delay_secs.is_finite() || options.pacing_delay_secs <= 0.0 {
            return Err(ConfigError::InvalidDelay {
                value: options.pacing_delay_secs,
            });
        }
        let pacing_delay = Duration::try_from_secs_f64(options.pacing_delay_secs).map_err(|_| {
            ConfigError::InvalidDelay {
                value: options.pacing_delay_secs,
            }
        })?;

        if options.max_retries < 1 {
            return Err(ConfigError::InvalidRetries {
                value: options.max_retries,
            });
        }
        let max_retries =
            u32::try_from(options.max_retries).map_err(|_| ConfigError::InvalidRetries {
                value: options.max_retries,
            })?;

        if options.attempt_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroAttemptTimeout);
        }

        Ok(Self {
            quality: options.quality,
            overrides: options.overrides,
            strategy: options.strategy,
            workers,
            retry_policy: RetryPolicy::new(max_retries, pacing_delay),
            attempt_timeout: options.attempt_timeout,
        })
    }

    /// Run-wide default quality.
    #[must_use]
    pub fn quality(&self) -> QualityPreference {
        self.quality
    }

    /// Selected strategy.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Validated (clamped) worker count.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Tasks allowed in flight at once: 1 for sequential, `workers` otherwise.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        match self.strategy {
            Strategy::Sequential => 1,
            Strategy::Concurrent => self.workers,
        }
    }

    /// Retry policy derived from the retry count and pacing delay.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Per-attempt timeout, if any.
    #[must_use]
    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout
    }

    /// Effective quality for `entry`.
    ///
    /// Order: run-level override for the entry id, then the entry's own
    /// override, then the run default.
    #[must_use]
    pub fn quality_for(&self, entry: &PlaylistEntry) -> QualityPreference {
        self.overrides
            .get(&entry.id)
            .copied()
            .or(entry.quality_override)
            .unwrap_or(self.quality)
    }
}

fn validate_workers(requested: i64) -> Result<usize, ConfigError> {
    if requested < MIN_WORKERS {
        return Err(ConfigError::InvalidWorkers { value: requested });
    }
    let clamped = if requested > MAX_WORKERS {
        warn!(
            requested,
            max = MAX_WORKERS,
            "worker count above maximum may trigger upstream rate limiting; clamping"
        );
        MAX_WORKERS
    } else {
        requested
    };
    usize::try_from(clamped).map_err(|_| ConfigError::InvalidWorkers { value: requested })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn options_with_workers(workers: i64) -> RunOptions {
        RunOptions {
            workers,
            strategy: Strategy::Concurrent,
            ..RunOptions::default()
        }
    }

    #[test]
    fn test_defaults_validate() {
        let config = RunConfig::from_options(RunOptions::default()).unwrap();
        assert_eq!(config.quality(), QualityPreference::Best);
        assert_eq!(config.strategy(), Strategy::Sequential);
        assert_eq!(config.workers(), 10);
        assert_eq!(config.concurrency(), 1);
        assert_eq!(config.retry_policy().max_attempts(), 3);
        assert_eq!(config.retry_policy().pacing_delay(), Duration::from_millis(1500));
        assert_eq!(config.attempt_timeout(), Some(DEFAULT_ATTEMPT_TIMEOUT));
    }

    #[test]
    fn test_zero_and_negative_workers_rejected() {
        for workers in [0, -1] {
            let err = RunConfig::from_options(options_with_workers(workers)).unwrap_err();
            assert_eq!(err, ConfigError::InvalidWorkers { value: workers });
        }
    }

    #[test]
    fn test_workers_above_max_are_clamped() {
        let config = RunConfig::from_options(options_with_workers(25)).unwrap();
        assert_eq!(config.workers(), 20);
        assert_eq!(config.concurrency(), 20);
    }

    #[test]
    fn test_workers_at_bounds_kept() {
        assert_eq!(RunConfig::from_options(options_with_workers(1)).unwrap().workers(), 1);
        assert_eq!(RunConfig::from_options(options_with_workers(20)).unwrap().workers(), 20);
    }

    #[test]
    fn test_non_positive_delay_rejected() {
        for delay in [0.0, -1.5, f64::NAN, f64::INFINITY] {
            let options = RunOptions {
                pacing_delay_secs: delay,
                ..RunOptions::default()
            };
            let err = RunConfig::from_options(options).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidDelay { .. }), "delay {delay}");
        }
    }

    #[test]
    fn test_non_positive_retries_rejected() {
        for retries in [0, -3] {
            let options = RunOptions {
                max_retries: retries,
                ..RunOptions::default()
            };
            let err = RunConfig::from_options(options).unwrap_err();
            assert_eq!(err, ConfigError::InvalidRetries { value: retries });
        }
    }

    #[test]
    fn test_zero_timeout_rejected_but_none_allowed() {
        let options = RunOptions {
            attempt_timeout: Some(Duration::ZERO),
            ..RunOptions::default()
        };
        assert_eq!(
            RunConfig::from_options(options).unwrap_err(),
            ConfigError::ZeroAttemptTimeout
        );

        let options = RunOptions {
            attempt_timeout: None,
            ..RunOptions::default()
        };
        assert_eq!(RunConfig::from_options(options).unwrap().attempt_timeout(), None);
    }

    #[test]
    fn test_quality_for_precedence() {
        let options = RunOptions {
            quality: QualityPreference::P720,
            overrides: HashMap::from([("a".to_string(), QualityPreference::P360)]),
            ..RunOptions::default()
        };
        let config = RunConfig::from_options(options).unwrap();

        let a = PlaylistEntry::new("a", "A", 0).with_quality(QualityPreference::P1080);
        let b = PlaylistEntry::new("b", "B", 1).with_quality(QualityPreference::P480);
        let c = PlaylistEntry::new("c", "C", 2);

        assert_eq!(config.quality_for(&a), QualityPreference::P360);
        assert_eq!(config.quality_for(&b), QualityPreference::P480);
        assert_eq!(config.quality_for(&c), QualityPreference::P720);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("Sequential".parse::<Strategy>().unwrap(), Strategy::Sequential);
        assert_eq!("async".parse::<Strategy>().unwrap(), Strategy::Concurrent);
        assert!(matches!(
            "parallel".parse::<Strategy>(),
            Err(ConfigError::UnknownStrategy { .. })
        ));
    }

    #[test]
    fn test_config_error_display() {
        let msg = ConfigError::InvalidWorkers { value: 0 }.to_string();
        assert!(msg.contains("invalid worker count 0"));
        assert!(msg.contains('1'));
    }
}
