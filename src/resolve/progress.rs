//! Progress notifications for presentation layers.
//!
//! The pipeline knows nothing about terminals or HTTP; callers that want
//! progress register a [`ProgressObserver`] and render however they like.

use serde::Serialize;

use super::aggregator::ReportSummary;
use super::outcome::OutcomeKind;
use crate::playlist::PlaylistEntry;

/// Emitted once per terminal outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// Playlist position of the entry that finished.
    pub position: usize,
    /// Id of the entry that finished.
    pub entry_id: String,
    /// Title of the entry that finished.
    pub title: String,
    /// What kind of outcome it reached.
    pub kind: OutcomeKind,
    /// Running totals including this outcome.
    pub totals: ReportSummary,
}

/// Receives pipeline progress. Called from worker tasks, so implementations
/// must be cheap and must not block.
///
/// `on_outcome` runs while the run's outcome table is locked, so events
/// arrive with `totals` strictly increasing and the last one carries the
/// full count.
pub trait ProgressObserver: Send + Sync {
    /// An entry reached its terminal outcome.
    fn on_outcome(&self, event: &ProgressEvent);

    /// An attempt is about to call the extractor.
    fn on_attempt(&self, _entry: &PlaylistEntry, _attempt: u32) {}

    /// An attempt failed transiently and the entry was requeued.
    fn on_retry(&self, _entry: &PlaylistEntry, _next_attempt: u32, _error: &str) {}
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_outcome(&self, event: &ProgressEvent) {
        self(event);
    }
}
