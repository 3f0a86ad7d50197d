//! A single unit of resolution work and its attempt boundary.
//!
//! One attempt is exactly one extractor call. Whatever happens inside the
//! call (an error, a timeout, even a panic) comes back as an
//! [`AttemptResult`]; nothing escapes the boundary into the pool.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::FutureExt;
use tracing::{debug, instrument, warn};

use crate::extractor::{ExtractError, Extraction, Extractor, ResolvedMedia};
use crate::playlist::PlaylistEntry;
use crate::quality::QualityPreference;
use crate::resolve::SkipReason;

/// Ephemeral unit of work: one entry at its effective quality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionTask {
    entry: PlaylistEntry,
    quality: QualityPreference,
    attempts_made: u32,
}

impl ResolutionTask {
    /// Creates a task with no attempts made yet.
    #[must_use]
    pub fn new(entry: PlaylistEntry, quality: QualityPreference) -> Self {
        Self {
            entry,
            quality,
            attempts_made: 0,
        }
    }

    /// The entry being resolved.
    #[must_use]
    pub fn entry(&self) -> &PlaylistEntry {
        &self.entry
    }

    /// Playlist position of the entry.
    #[must_use]
    pub fn position(&self) -> usize {
        self.entry.position
    }

    /// Effective quality for this entry.
    #[must_use]
    pub fn quality(&self) -> QualityPreference {
        self.quality
    }

    /// Attempts already made.
    #[must_use]
    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    /// Marks the start of a new attempt and returns its number (1-indexed).
    pub(crate) fn begin_attempt(&mut self) -> u32 {
        self.attempts_made += 1;
        self.attempts_made
    }
}

/// Classified result of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    /// A direct URL was produced.
    Resolved(ResolvedMedia),
    /// Known unavailability; never retried.
    Unavailable(SkipReason),
    /// Retryable failure with its message.
    Transient(String),
    /// The extractor panicked; the entry fails without retry.
    Fault(String),
}

/// Runs one attempt of `task` against `extractor`.
///
/// The call is wrapped in `catch_unwind` and, when `timeout` is set, in a
/// timeout that counts as a transient failure.
#[instrument(
    level = "debug",
    skip(extractor, task),
    fields(entry_id = %task.entry().id, position = task.position(), quality = %task.quality())
)]
pub async fn run_attempt(
    extractor: &dyn Extractor,
    task: &ResolutionTask,
    timeout: Option<Duration>,
) -> AttemptResult {
    let entry_id = task.entry().id.as_str();
    let call = AssertUnwindSafe(extractor.resolve(entry_id, task.quality())).catch_unwind();

    let caught = match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(caught) => caught,
            Err(_) => {
                let error = ExtractError::timeout(entry_id, limit);
                debug!(error = %error, "attempt timed out");
                return AttemptResult::Transient(error.to_string());
            }
        },
        None => call.await,
    };

    match caught {
        Ok(Ok(Extraction::Resolved(media))) => AttemptResult::Resolved(media),
        Ok(Ok(Extraction::Unavailable(reason))) => AttemptResult::Unavailable(reason),
        Ok(Err(error)) => {
            debug!(error = %error, "attempt failed");
            AttemptResult::Transient(error.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(extractor = extractor.name(), %message, "extractor panicked; containing fault");
            AttemptResult::Fault(message)
        }
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("unexpected fault: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("unexpected fault: {message}")
    } else {
        "unexpected fault".to_string()
    }
}
