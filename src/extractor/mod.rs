//! Boundary to the external extraction capability.
//!
//! The pipeline only ever sees the small closed set of answers defined here:
//! a resolved media URL, a known unavailability, or an [`ExtractError`].
//! Whatever shape the upstream uses internally is converted at this boundary.
//!
//! - [`Extractor`] - async trait the pipeline calls once per attempt
//! - [`YtDlp`] - implementation driving the `yt-dlp` executable, which also
//!   implements [`PlaylistSource`](crate::playlist::PlaylistSource)

mod error;
mod ytdlp;

pub use error::ExtractError;
pub use ytdlp::{DEFAULT_YT_DLP_PROGRAM, YtDlp, classify_unavailable};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::quality::QualityPreference;
use crate::resolve::SkipReason;

/// A successfully resolved direct media URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMedia {
    /// Direct, time-limited download URL.
    pub direct_url: String,
    /// Human-readable resolution, e.g. `1920x1080`.
    pub resolution_label: String,
    /// Approximate size in bytes, when the upstream reports one.
    pub approx_size_bytes: Option<u64>,
}

impl ResolvedMedia {
    /// Creates a resolved media value.
    #[must_use]
    pub fn new(
        direct_url: impl Into<String>,
        resolution_label: impl Into<String>,
        approx_size_bytes: Option<u64>,
    ) -> Self {
        Self {
            direct_url: direct_url.into(),
            resolution_label: resolution_label.into(),
            approx_size_bytes,
        }
    }
}

/// Answer from a single extraction call that did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// A direct URL was produced.
    Resolved(ResolvedMedia),
    /// The video cannot be resolved and retrying will not help.
    Unavailable(SkipReason),
}

/// The extraction capability: entry id + quality in, direct URL out.
///
/// Implementations perform exactly one upstream call per invocation and keep
/// no state shared with the pipeline.
///
/// # Object Safety
///
/// Uses `async_trait` so the orchestrator can hold an `Arc<dyn Extractor>`.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Resolves `entry_id` at the requested quality.
    async fn resolve(
        &self,
        entry_id: &str,
        quality: QualityPreference,
    ) -> Result<Extraction, ExtractError>;
}
