//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use playlist_grabber_core::QualityPreference;

/// Resolve every video of a playlist to a direct download URL.
///
/// Playlist Grabber asks `yt-dlp` for each entry's direct media URL and
/// writes them, in playlist order, to a text file ready to import into a
/// download manager. URLs expire after several hours.
#[derive(Parser, Debug)]
#[command(name = "playlist-grabber")]
#[command(author, version, about)]
pub struct Args {
    /// Playlist URL (must contain a `list=` parameter)
    pub playlist_url: String,

    /// Output file (default: <playlist title>_<timestamp>.txt)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Video quality: best, 1080p, 720p, 480p or 360p
    #[arg(short, long)]
    pub quality: Option<QualityPreference>,

    /// Pacing delay before each request, in seconds (minimum 0.5)
    #[arg(short, long, allow_negative_numbers = true)]
    pub delay: Option<f64>,

    /// Maximum attempts per video
    #[arg(short, long, allow_negative_numbers = true)]
    pub retries: Option<i64>,

    /// Resolve several videos at once instead of one by one
    #[arg(long, visible_alias = "async")]
    pub concurrent: bool,

    /// Worker count for concurrent mode (1-20, larger values are clamped)
    #[arg(short, long, allow_negative_numbers = true)]
    pub workers: Option<i64>,

    /// Per-video quality override, e.g. --override dQw4w9WgXcQ=720p (repeatable)
    #[arg(long = "override", value_name = "ID=QUALITY", value_parser = parse_override)]
    pub overrides: Vec<(String, QualityPreference)>,

    /// Also write the full report as JSON to this path
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Append `#<title>.mp4` to each URL so download managers name files
    #[arg(long)]
    pub name_fragment: bool,

    /// Path to the yt-dlp executable
    #[arg(long = "yt-dlp", value_name = "PROGRAM")]
    pub yt_dlp: Option<PathBuf>,

    /// Per-attempt timeout in seconds (0 disables)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long)]
    pub quiet: bool,
}

fn parse_override(raw: &str) -> Result<(String, QualityPreference), String> {
    let Some((id, quality)) = raw.split_once('=') else {
        return Err(format!("expected ID=QUALITY, got '{raw}'"));
    };
    let id = id.trim();
    if id.is_empty() {
        return Err("video id must not be empty".to_string());
    }
    let quality = quality
        .parse::<QualityPreference>()
        .map_err(|error| error.to_string())?;
    Ok((id.to_string(), quality))
}
