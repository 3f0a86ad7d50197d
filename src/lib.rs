//! Playlist Grabber Core Library
//!
//! This library resolves every entry of a video playlist to a direct,
//! downloadable media URL. Resolution runs through a bounded worker pool
//! with pacing and retries, and the result always comes back in playlist
//! order.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`quality`] - Quality preferences and their format selectors
//! - [`playlist`] - Playlist model, fetch contract and URL validation
//! - [`extractor`] - Boundary to the external extraction capability (`yt-dlp`)
//! - [`resolve`] - Resolution pipeline: tasks, retries, pools, aggregation
//! - [`output`] - Link list and JSON report rendering

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod extractor;
pub mod output;
pub mod playlist;
pub mod quality;
pub mod resolve;

// Re-export commonly used types
pub use extractor::{ExtractError, Extraction, Extractor, ResolvedMedia, YtDlp};
pub use output::OutputError;
pub use playlist::{Playlist, PlaylistEntry, PlaylistSource, validate_playlist_url};
pub use quality::QualityPreference;
pub use resolve::{
    ConfigError, DEFAULT_MAX_RETRIES, Orchestrator, ProgressEvent, ProgressObserver, Report,
    ReportSummary, ResolutionOutcome, RetryDecision, RetryPolicy, RunError, RunOptions, SkipReason,
    Strategy,
};
