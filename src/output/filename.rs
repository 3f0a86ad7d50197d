//! Safe filenames and human-readable sizes.

use chrono::{DateTime, TimeZone};

/// Characters rejected by at least one common filesystem.
const INVALID_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Maximum filename length in characters.
const MAX_FILENAME_CHARS: usize = 200;

/// Fallback when sanitizing leaves nothing.
const FALLBACK_FILENAME: &str = "output";

/// Makes `name` safe to use as a filename on every common OS.
///
/// Invalid characters become `_`, leading and trailing dots and spaces are
/// removed, and the result is capped at 200 characters. An empty result
/// becomes `output`.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if INVALID_FILENAME_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed: String = replaced
        .trim_matches(|c| c == '.' || c == ' ')
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect();

    if trimmed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed
    }
}

/// Builds `<sanitized title>_<YYYYmmdd_HHMMSS>.txt`.
#[must_use]
pub fn generate_output_filename<Tz>(playlist_title: &str, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}_{}.txt",
        sanitize_filename(playlist_title),
        now.format("%Y%m%d_%H%M%S")
    )
}

/// Formats a byte count as `45.2 MB`; `None` and zero are `Unknown`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_filesize(size_bytes: Option<u64>) -> String {
    let Some(bytes) = size_bytes.filter(|b| *b > 0) else {
        return "Unknown".to_string();
    };

    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}
