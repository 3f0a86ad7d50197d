//! JSON rendering of a full report.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use super::error::OutputError;
use super::links::ensure_parent;
use crate::resolve::{Report, ReportItem, ReportSummary};

/// Top-level JSON document.
#[derive(Debug, Serialize)]
pub struct ReportDocument<'a> {
    /// Playlist title.
    pub playlist: &'a str,
    /// RFC 3339 generation time.
    pub generated_at: String,
    /// Outcome counts.
    pub summary: ReportSummary,
    /// Items in playlist order.
    pub items: &'a [ReportItem],
}

impl<'a> ReportDocument<'a> {
    /// Wraps `report` for serialization.
    #[must_use]
    pub fn new(report: &'a Report, playlist: &'a str, generated_at: DateTime<Utc>) -> Self {
        Self {
            playlist,
            generated_at: generated_at.to_rfc3339(),
            summary: report.summary,
            items: &report.items,
        }
    }
}

/// Writes `report` as pretty-printed JSON to `path`.
///
/// # Errors
///
/// Returns [`OutputError`] on I/O or serialization failure.
#[instrument(skip(report, generated_at), fields(path = %path.display()))]
pub fn write_json_report(
    path: &Path,
    report: &Report,
    playlist_title: &str,
    generated_at: DateTime<Utc>,
) -> Result<(), OutputError> {
    ensure_parent(path)?;
    let document = ReportDocument::new(report, playlist_title, generated_at);

    let write_error = |source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = fs::File::create(path).map_err(write_error)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &document).map_err(|source| {
        OutputError::Serialize {
            path: path.to_path_buf(),
            source,
        }
    })?;
    writer.write_all(b"\n").map_err(write_error)?;
    writer.flush().map_err(write_error)?;

    debug!(items = report.items.len(), "JSON report written");
    Ok(())
}
