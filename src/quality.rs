//! Video quality preferences and their upstream format selectors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Requested video quality for a resolution.
///
/// Height-capped variants fall back to the best available mp4 and then to
/// whatever the upstream offers, so a preference never makes an otherwise
/// resolvable video fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QualityPreference {
    /// Best available quality.
    #[default]
    #[serde(rename = "best")]
    Best,
    /// At most 1080 lines.
    #[serde(rename = "1080p")]
    P1080,
    /// At most 720 lines.
    #[serde(rename = "720p")]
    P720,
    /// At most 480 lines.
    #[serde(rename = "480p")]
    P480,
    /// At most 360 lines.
    #[serde(rename = "360p")]
    P360,
}

/// Returned when a quality label is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown quality '{value}'\n  Suggestion: use one of best, 1080p, 720p, 480p, 360p")]
pub struct ParseQualityError {
    /// The rejected label.
    pub value: String,
}

impl QualityPreference {
    /// All variants, best first.
    pub const ALL: [Self; 5] = [Self::Best, Self::P1080, Self::P720, Self::P480, Self::P360];

    /// Returns the stable label used on the CLI and in config files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::P1080 => "1080p",
            Self::P720 => "720p",
            Self::P480 => "480p",
            Self::P360 => "360p",
        }
    }

    /// Maximum video height, or `None` for [`QualityPreference::Best`].
    #[must_use]
    pub fn max_height(self) -> Option<u32> {
        match self {
            Self::Best => None,
            Self::P1080 => Some(1080),
            Self::P720 => Some(720),
            Self::P480 => Some(480),
            Self::P360 => Some(360),
        }
    }

    /// Returns the yt-dlp format selection expression for this preference.
    #[must_use]
    pub fn format_selector(self) -> String {
        match self.max_height() {
            None => "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string(),
            Some(height) => format!(
                "bestvideo[height<={height}][ext=mp4]+bestaudio[ext=m4a]/best[height<={height}][ext=mp4]/best[ext=mp4]/best"
            ),
        }
    }
}

impl fmt::Display for QualityPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityPreference {
    type Err = ParseQualityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let label = normalized.strip_suffix('p').unwrap_or(&normalized);
        match label {
            "best" => Ok(Self::Best),
            "1080" => Ok(Self::P1080),
            "720" => Ok(Self::P720),
            "480" => Ok(Self::P480),
            "360" => Ok(Self::P360),
            _ => Err(ParseQualityError {
                value: s.to_string(),
            }),
        }
    }
}
