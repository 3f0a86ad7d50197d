//! Progress bar for resolution runs.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use playlist_grabber_core::playlist::PlaylistEntry;
use playlist_grabber_core::resolve::{ProgressEvent, ProgressObserver};

/// Renders pipeline progress as an `indicatif` bar on stderr.
#[derive(Debug, Clone)]
pub(crate) struct BarObserver {
    bar: ProgressBar,
}

impl BarObserver {
    /// Creates a visible bar for `total` entries, or a hidden one when
    /// `visible` is false.
    pub(crate) fn new(total: usize, visible: bool) -> Self {
        let length = u64::try_from(total).unwrap_or(u64::MAX);
        let bar = if visible {
            ProgressBar::new(length)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        if visible {
            bar.enable_steady_tick(Duration::from_millis(120));
        }
        Self { bar }
    }

    /// Clears the bar from the terminal.
    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressObserver for BarObserver {
    fn on_outcome(&self, event: &ProgressEvent) {
        let processed = u64::try_from(event.totals.processed()).unwrap_or(u64::MAX);
        self.bar.set_position(processed);
        self.bar.set_message(format!(
            "{} ok, {} skipped, {} failed | {}: {}",
            event.totals.resolved, event.totals.skipped, event.totals.failed, event.kind, event.title
        ));
    }

    fn on_attempt(&self, entry: &PlaylistEntry, attempt: u32) {
        if attempt == 1 {
            self.bar.set_message(format!("Resolving: {}", entry.title));
        } else {
            self.bar
                .set_message(format!("Resolving: {} (attempt {attempt})", entry.title));
        }
    }

    fn on_retry(&self, entry: &PlaylistEntry, next_attempt: u32, error: &str) {
        self.bar.set_message(format!(
            "Retrying {} (attempt {next_attempt}): {error}",
            entry.title
        ));
    }
}
