//! Position-indexed collection of terminal outcomes.
//!
//! The aggregator holds the only state shared between workers: one slot per
//! playlist position. Writes go through a single `tokio::sync::Mutex`, each
//! slot can be written once, and the report is projected back into playlist
//! order, so completion order never leaks into the output.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use super::outcome::{OutcomeKind, ResolutionOutcome};
use super::progress::{ProgressEvent, ProgressObserver};
use crate::playlist::PlaylistEntry;

/// Errors from building or writing to an [`Aggregator`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// Two entries claim the same position.
    #[error("duplicate playlist position {position}")]
    DuplicatePosition {
        /// The repeated position.
        position: usize,
    },

    /// A position lies outside `0..len`.
    #[error("playlist position {position} out of range for {len} entries")]
    PositionOutOfRange {
        /// The offending position.
        position: usize,
        /// Number of entries.
        len: usize,
    },

    /// A second outcome was offered for a position that is already terminal.
    #[error("position {position} already has a terminal outcome")]
    AlreadyTerminal {
        /// The position.
        position: usize,
    },
}

/// Outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    /// Entries in the playlist.
    pub total: usize,
    /// Entries resolved to a URL.
    pub resolved: usize,
    /// Entries skipped as unavailable.
    pub skipped: usize,
    /// Entries that exhausted retries or faulted.
    pub failed: usize,
    /// Entries left unfinished by cancellation.
    pub cancelled: usize,
}

impl ReportSummary {
    /// Entries with a terminal outcome so far.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.resolved + self.skipped + self.failed + self.cancelled
    }

    fn count(&mut self, kind: OutcomeKind) {
        match kind {
            OutcomeKind::Resolved => self.resolved += 1,
            OutcomeKind::Skipped => self.skipped += 1,
            OutcomeKind::Failed => self.failed += 1,
            OutcomeKind::Cancelled => self.cancelled += 1,
        }
    }
}

/// One row of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportItem {
    /// The playlist entry.
    pub entry: PlaylistEntry,
    /// Its terminal outcome.
    pub outcome: ResolutionOutcome,
}

/// Final, order-preserving result of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// One item per entry, in playlist order.
    pub items: Vec<ReportItem>,
    /// Outcome counts.
    pub summary: ReportSummary,
}

impl Report {
    /// Items whose outcome is `Resolved`, in playlist order.
    pub fn resolved_items(&self) -> impl Iterator<Item = &ReportItem> {
        self.items
            .iter()
            .filter(|item| item.outcome.kind() == OutcomeKind::Resolved)
    }

    /// Items whose outcome is `Failed`, in playlist order.
    pub fn failed_items(&self) -> impl Iterator<Item = &ReportItem> {
        self.items
            .iter()
            .filter(|item| item.outcome.kind() == OutcomeKind::Failed)
    }
}

#[derive(Debug)]
struct Slots {
    outcomes: Vec<Option<ResolutionOutcome>>,
    summary: ReportSummary,
}

/// Collects terminal outcomes from concurrent workers.
pub struct Aggregator {
    entries: Vec<PlaylistEntry>,
    slots: Mutex<Slots>,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("entries", &self.entries.len())
            .field("observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

impl Aggregator {
    /// Creates an aggregator for `entries`.
    ///
    /// Entries may arrive in any order but their positions must be exactly
    /// `0..entries.len()`.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::DuplicatePosition`] or
    /// [`AggregateError::PositionOutOfRange`] for malformed positions.
    pub fn new(
        mut entries: Vec<PlaylistEntry>,
        observer: Option<Arc<dyn ProgressObserver>>,
    ) -> Result<Self, AggregateError> {
        let len = entries.len();
        entries.sort_by_key(|entry| entry.position);
        for (index, entry) in entries.iter().enumerate() {
            if entry.position >= len {
                return Err(AggregateError::PositionOutOfRange {
                    position: entry.position,
                    len,
                });
            }
            if entry.position != index {
                // Sorted and in range, so a mismatch means a repeat.
                return Err(AggregateError::DuplicatePosition {
                    position: entry.position,
                });
            }
        }

        Ok(Self {
            slots: Mutex::new(Slots {
                outcomes: vec![None; len],
                summary: ReportSummary {
                    total: len,
                    ..ReportSummary::default()
                },
            }),
            entries,
            observer,
        })
    }

    /// Entries in position order.
    #[must_use]
    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.entries
    }

    /// Records the terminal outcome for `position`.
    ///
    /// The first outcome for a position wins; later ones are rejected and
    /// leave the recorded outcome untouched.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::AlreadyTerminal`] for a second write and
    /// [`AggregateError::PositionOutOfRange`] for an unknown position.
    pub async fn record(
        &self,
        position: usize,
        outcome: ResolutionOutcome,
    ) -> Result<(), AggregateError> {
        let kind = outcome.kind();
        let mut slots = self.slots.lock().await;
        let len = slots.outcomes.len();
        let Some(slot) = slots.outcomes.get_mut(position) else {
            return Err(AggregateError::PositionOutOfRange { position, len });
        };
        if slot.is_some() {
            warn!(position, %kind, "ignoring second outcome for terminal entry");
            return Err(AggregateError::AlreadyTerminal { position });
        }
        *slot = Some(outcome);
        slots.summary.count(kind);
        let totals = slots.summary;

        debug!(
            position,
            %kind,
            processed = totals.processed(),
            total = totals.total,
            "entry reached terminal outcome"
        );
        // Notify under the lock so observers see totals in increasing order.
        self.notify(position, kind, totals);
        Ok(())
    }

    /// Returns true once every position holds an outcome.
    pub async fn is_complete(&self) -> bool {
        let slots = self.slots.lock().await;
        slots.outcomes.iter().all(Option::is_some)
    }

    /// Current running totals.
    pub async fn summary(&self) -> ReportSummary {
        self.slots.lock().await.summary
    }

    /// Assembles the report in playlist order.
    ///
    /// Positions still empty become `Cancelled` when `cancelled` is set.
    /// Otherwise an empty position is a scheduling bug; it is logged and
    /// reported as `Failed` rather than dropped.
    pub async fn into_report(&self, cancelled: bool) -> Report {
        let (outcomes, summary) = {
            let mut slots = self.slots.lock().await;
            for position in 0..slots.outcomes.len() {
                if slots.outcomes[position].is_some() {
                    continue;
                }
                let outcome = if cancelled {
                    ResolutionOutcome::Cancelled
                } else {
                    error!(position, "entry finished without a terminal outcome");
                    ResolutionOutcome::Failed {
                        reason: "no terminal outcome recorded".to_string(),
                        attempts_made: 0,
                    }
                };
                let kind = outcome.kind();
                slots.outcomes[position] = Some(outcome);
                slots.summary.count(kind);
                self.notify(position, kind, slots.summary);
            }
            (slots.outcomes.clone(), slots.summary)
        };

        let items = self
            .entries
            .iter()
            .cloned()
            .zip(outcomes)
            .filter_map(|(entry, outcome)| Some(ReportItem { entry, outcome: outcome? }))
            .collect();

        Report { items, summary }
    }

    fn notify(&self, position: usize, kind: OutcomeKind, totals: ReportSummary) {
        let Some(observer) = &self.observer else {
            return;
        };
        let entry = &self.entries[position];
        observer.on_outcome(&ProgressEvent {
            position,
            entry_id: entry.id.clone(),
            title: entry.title.clone(),
            kind,
            totals,
        });
    }
}
