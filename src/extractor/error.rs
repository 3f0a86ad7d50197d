//! Error types for the extraction boundary.
//!
//! Every per-entry variant is transient from the pipeline's point of view:
//! known non-retryable conditions (private, deleted, ...) are not errors at
//! all but [`Extraction::Unavailable`](super::Extraction::Unavailable).

use std::time::Duration;

use thiserror::Error;

/// Errors raised by an [`Extractor`](super::Extractor) or a playlist source.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The extraction program could not be started.
    #[error("failed to run {program}: {message}\n  Suggestion: install yt-dlp or pass its location with --yt-dlp")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying OS error text.
        message: String,
    },

    /// The upstream reported an error for this entry.
    #[error("upstream error for '{entry_id}': {message}")]
    Upstream {
        /// Entry being resolved.
        entry_id: String,
        /// Upstream error text (first meaningful line).
        message: String,
    },

    /// The upstream answered with something that could not be interpreted.
    #[error("malformed response for '{entry_id}': {reason}")]
    Malformed {
        /// Entry being resolved.
        entry_id: String,
        /// What was wrong with the response.
        reason: String,
    },

    /// A single attempt took longer than the configured attempt timeout.
    #[error("timed out resolving '{entry_id}' after {}s", after.as_secs())]
    Timeout {
        /// Entry being resolved.
        entry_id: String,
        /// The timeout that elapsed.
        after: Duration,
    },

    /// The playlist itself could not be fetched.
    #[error("failed to fetch playlist {url}: {message}\n  Suggestion: check the URL and that the playlist is public")]
    Playlist {
        /// Playlist URL.
        url: String,
        /// Why the fetch failed.
        message: String,
    },
}

impl ExtractError {
    /// Creates an `Upstream` error.
    #[must_use]
    pub fn upstream(entry_id: &str, message: impl Into<String>) -> Self {
        Self::Upstream {
            entry_id: entry_id.to_string(),
            message: message.into(),
        }
    }

    /// Creates a `Malformed` error.
    #[must_use]
    pub fn malformed(entry_id: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            entry_id: entry_id.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a `Timeout` error.
    #[must_use]
    pub fn timeout(entry_id: &str, after: Duration) -> Self {
        Self::Timeout {
            entry_id: entry_id.to_string(),
            after,
        }
    }

    /// Creates a `Playlist` error.
    #[must_use]
    pub fn playlist(url: &str, message: impl Into<String>) -> Self {
        Self::Playlist {
            url: url.to_string(),
            message: message.into(),
        }
    }
}
