//! Plain-text link list for download managers.
//!
//! The format is one commented block per resolved entry:
//!
//! ```text
//! # Video 3: Some title
//! # Resolution: 1280x720 | Size: 45.2 MB
//! https://media.example/...
//! ```
//!
//! Skipped, failed and cancelled entries are left out. The video number is
//! the entry's 1-based playlist position, so gaps show what was dropped.

use std::fs;
use std::path::Path;

use chrono::{DateTime, TimeZone};
use tracing::{debug, instrument};

use super::error::OutputError;
use super::filename::{format_filesize, sanitize_filename};
use crate::resolve::{Report, ResolutionOutcome};

const RULE_WIDTH: usize = 80;

/// Rendering switches for [`render_link_list`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkListOptions {
    /// Append `#<title>.mp4` to each URL so download managers name the file.
    pub name_fragment: bool,
}

/// URL fragment that makes download managers save the file as `<title>.mp4`.
#[must_use]
pub fn name_fragment(title: &str) -> String {
    format!("#{}.mp4", sanitize_filename(title).replace(' ', "_"))
}

/// Renders the link list for every resolved entry of `report`.
#[must_use]
pub fn render_link_list<Tz>(
    report: &Report,
    playlist_title: &str,
    generated_at: &DateTime<Tz>,
    options: LinkListOptions,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    out.push_str(&format!("{rule}\nYouTube Playlist Direct Download URLs\n{rule}\n"));
    out.push_str(&format!("Playlist: {playlist_title}\n"));
    out.push_str(&format!(
        "Generated: {}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("Total Videos: {}\n", report.summary.resolved));
    out.push_str(&format!("{rule}\n\n"));

    out.push_str("IMPORTANT NOTES:\n");
    out.push_str("- These URLs expire after several hours. Use them promptly.\n");
    out.push_str("- Import this file into a download manager for batch downloading.\n");
    out.push_str("- Each URL is preceded by the video title as a comment.\n");
    out.push_str(&format!("\n{rule}\n\n"));

    for item in report.resolved_items() {
        let ResolutionOutcome::Resolved {
            direct_url,
            resolution_label,
            approx_size_bytes,
        } = &item.outcome
        else {
            continue;
        };

        out.push_str(&format!(
            "# Video {}: {}\n",
            item.entry.position + 1,
            item.entry.title
        ));
        out.push_str(&format!(
            "# Resolution: {resolution_label} | Size: {}\n",
            format_filesize(*approx_size_bytes)
        ));
        out.push_str(direct_url);
        if options.name_fragment {
            out.push_str(&name_fragment(&item.entry.title));
        }
        out.push_str("\n\n");
    }

    out
}

/// Writes the link list to `path`, creating parent directories as needed.
///
/// Returns the number of URLs written.
///
/// # Errors
///
/// Returns [`OutputError`] when the directory or file cannot be written.
#[instrument(skip(report, generated_at), fields(path = %path.display()))]
pub fn write_link_file<Tz>(
    path: &Path,
    report: &Report,
    playlist_title: &str,
    generated_at: &DateTime<Tz>,
    options: LinkListOptions,
) -> Result<usize, OutputError>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    ensure_parent(path)?;
    let contents = render_link_list(report, playlist_title, generated_at, options);
    fs::write(path, contents).map_err(|source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    let written = report.summary.resolved;
    debug!(urls = written, "link list written");
    Ok(written)
}

pub(super) fn ensure_parent(path: &Path) -> Result<(), OutputError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|source| OutputError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}
