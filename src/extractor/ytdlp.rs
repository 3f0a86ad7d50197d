//! `yt-dlp` backed extractor and playlist source.
//!
//! Each call spawns one `yt-dlp` process and reads its single-JSON dump.
//! The child is killed if the calling future is dropped, so an attempt
//! timeout never leaves a stray process behind.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, instrument, trace};

use super::{ExtractError, Extraction, Extractor, ResolvedMedia};
use crate::playlist::{Playlist, PlaylistSource, RawEntry};
use crate::quality::QualityPreference;
use crate::resolve::SkipReason;

/// Program name looked up on `PATH` when no explicit location is given.
pub const DEFAULT_YT_DLP_PROGRAM: &str = "yt-dlp";

const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Extractor that shells out to `yt-dlp`.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new(DEFAULT_YT_DLP_PROGRAM)
    }
}

/// Output of one finished `yt-dlp` run.
struct RunOutput {
    success: bool,
    stdout: Vec<u8>,
    stderr: String,
}

impl YtDlp {
    /// Creates an extractor using the given program path or name.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Returns the configured program.
    #[must_use]
    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    async fn run(&self, args: &[&str]) -> Result<RunOutput, ExtractError> {
        trace!(program = %self.program.display(), ?args, "spawning yt-dlp");
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|error| ExtractError::Spawn {
                program: self.program.display().to_string(),
                message: error.to_string(),
            })?;

        Ok(RunOutput {
            success: output.status.success(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[async_trait]
impl Extractor for YtDlp {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    #[instrument(skip(self), fields(quality = %quality))]
    async fn resolve(
        &self,
        entry_id: &str,
        quality: QualityPreference,
    ) -> Result<Extraction, ExtractError> {
        let video_url = format!("{WATCH_URL_PREFIX}{entry_id}");
        let selector = quality.format_selector();
        let output = self
            .run(&[
                "--dump-single-json",
                "--no-warnings",
                "--no-playlist",
                "-f",
                &selector,
                &video_url,
            ])
            .await?;

        if !output.success {
            if let Some(reason) = classify_unavailable(&output.stderr) {
                debug!(entry_id, %reason, "video unavailable");
                return Ok(Extraction::Unavailable(reason));
            }
            return Err(ExtractError::upstream(
                entry_id,
                first_error_line(&output.stderr),
            ));
        }

        parse_video_document(entry_id, &output.stdout).map(Extraction::Resolved)
    }
}

#[async_trait]
impl PlaylistSource for YtDlp {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<Playlist, ExtractError> {
        let output = self
            .run(&["--flat-playlist", "--dump-single-json", "--no-warnings", url])
            .await?;

        if !output.success {
            return Err(ExtractError::playlist(url, first_error_line(&output.stderr)));
        }

        let playlist = parse_playlist_document(url, &output.stdout)?;
        debug!(title = %playlist.title, entries = playlist.len(), "fetched playlist");
        Ok(playlist)
    }
}

/// Maps upstream error text to a non-retryable unavailability, if it is one.
///
/// Anything not recognized here (network trouble, throttling, bot checks)
/// returns `None` and is retried.
#[must_use]
pub fn classify_unavailable(stderr: &str) -> Option<SkipReason> {
    let text = stderr.to_ascii_lowercase();

    if text.contains("private video") {
        return Some(SkipReason::Private);
    }
    if text.contains("confirm your age")
        || text.contains("age-restricted")
        || text.contains("age restricted")
        || text.contains("inappropriate for some users")
    {
        return Some(SkipReason::AgeRestricted);
    }
    if text.contains("has been removed")
        || text.contains("been deleted")
        || text.contains("has been terminated")
    {
        return Some(SkipReason::Deleted);
    }
    if text.contains("video unavailable")
        || text.contains("not available")
        || text.contains("members-only")
    {
        return Some(SkipReason::Unavailable);
    }
    None
}

fn first_error_line(stderr: &str) -> String {
    let lines = || stderr.lines().map(str::trim).filter(|line| !line.is_empty());
    lines()
        .find(|line| line.starts_with("ERROR:"))
        .or_else(|| lines().last())
        .map_or_else(
            || "yt-dlp exited without an error message".to_string(),
            |line| line.trim_start_matches("ERROR:").trim().to_string(),
        )
}

#[derive(Debug, Deserialize)]
struct VideoDocument {
    url: Option<String>,
    #[serde(default)]
    requested_formats: Vec<FormatDocument>,
    width: Option<u64>,
    height: Option<u64>,
    filesize: Option<u64>,
    filesize_approx: Option<f64>,
    format_note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FormatDocument {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistDocument {
    title: Option<String>,
    entries: Option<Vec<Option<EntryDocument>>>,
}

#[derive(Debug, Deserialize)]
struct EntryDocument {
    id: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    #[serde(default)]
    thumbnails: Vec<ThumbnailDocument>,
}

#[derive(Debug, Deserialize)]
struct ThumbnailDocument {
    url: Option<String>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_non_negative(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0).then(|| value.round() as u64)
}

fn parse_video_document(entry_id: &str, stdout: &[u8]) -> Result<ResolvedMedia, ExtractError> {
    let document: Option<VideoDocument> = serde_json::from_slice(stdout)
        .map_err(|error| ExtractError::malformed(entry_id, error.to_string()))?;
    let Some(document) = document else {
        return Err(ExtractError::malformed(entry_id, "empty response"));
    };

    // Merged video+audio selections carry no top-level url; the video
    // stream is listed first.
    let direct_url = document
        .url
        .filter(|url| !url.is_empty())
        .or_else(|| {
            document
                .requested_formats
                .into_iter()
                .find_map(|format| format.url.filter(|url| !url.is_empty()))
        })
        .ok_or_else(|| ExtractError::malformed(entry_id, "no direct URL in response"))?;

    let resolution_label = match (document.width, document.height) {
        (Some(width), Some(height)) => format!("{width}x{height}"),
        _ => document.format_note.unwrap_or_else(|| "N/A".to_string()),
    };

    let approx_size_bytes = document
        .filesize
        .or_else(|| document.filesize_approx.and_then(whole_non_negative))
        .filter(|size| *size > 0);

    Ok(ResolvedMedia {
        direct_url,
        resolution_label,
        approx_size_bytes,
    })
}

fn parse_playlist_document(url: &str, stdout: &[u8]) -> Result<Playlist, ExtractError> {
    let document: PlaylistDocument = serde_json::from_slice(stdout)
        .map_err(|error| ExtractError::playlist(url, format!("unreadable metadata: {error}")))?;

    let Some(entries) = document.entries else {
        return Err(ExtractError::playlist(
            url,
            "URL does not appear to be a valid playlist",
        ));
    };

    let raw = entries
        .into_iter()
        .map(|entry| {
            entry.map(|entry| RawEntry {
                id: entry.id,
                title: entry.title,
                duration_secs: entry.duration.and_then(whole_non_negative),
                thumbnail: entry
                    .thumbnail
                    .or_else(|| entry.thumbnails.into_iter().rev().find_map(|thumb| thumb.url)),
            })
        })
        .collect();

    Ok(Playlist::from_raw(document.title, raw))
}
