//! Terminal outcomes of resolving one playlist entry.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why an entry was skipped without retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The video is private.
    Private,
    /// The video was removed or its account terminated.
    Deleted,
    /// The video requires age verification.
    AgeRestricted,
    /// The video is otherwise unavailable.
    Unavailable,
}

impl SkipReason {
    /// Returns the stable label for display output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Deleted => "deleted",
            Self::AgeRestricted => "age_restricted",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result for one entry. Never revised once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// A direct URL was produced.
    Resolved {
        /// Direct, time-limited download URL.
        direct_url: String,
        /// Human-readable resolution.
        resolution_label: String,
        /// Approximate size in bytes.
        approx_size_bytes: Option<u64>,
    },
    /// The entry cannot be resolved; it was not retried.
    Skipped {
        /// Why the entry was skipped.
        reason: SkipReason,
    },
    /// Every allowed attempt failed, or the attempt faulted.
    Failed {
        /// Last error message.
        reason: String,
        /// Attempts made against the extractor.
        attempts_made: u32,
    },
    /// The run was cancelled before this entry reached another outcome.
    Cancelled,
}

impl ResolutionOutcome {
    /// Returns the kind of this outcome.
    #[must_use]
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Resolved { .. } => OutcomeKind::Resolved,
            Self::Skipped { .. } => OutcomeKind::Skipped,
            Self::Failed { .. } => OutcomeKind::Failed,
            Self::Cancelled => OutcomeKind::Cancelled,
        }
    }

    /// Returns the direct URL if resolved.
    #[must_use]
    pub fn direct_url(&self) -> Option<&str> {
        match self {
            Self::Resolved { direct_url, .. } => Some(direct_url),
            _ => None,
        }
    }
}

/// Outcome discriminant, used for counts and progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// See [`ResolutionOutcome::Resolved`].
    Resolved,
    /// See [`ResolutionOutcome::Skipped`].
    Skipped,
    /// See [`ResolutionOutcome::Failed`].
    Failed,
    /// See [`ResolutionOutcome::Cancelled`].
    Cancelled,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resolved => "resolved",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        })
    }
}
