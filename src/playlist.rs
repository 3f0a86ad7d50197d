//! Playlist entries and the playlist fetch boundary.
//!
//! A [`Playlist`] is an ordered list of [`PlaylistEntry`] values. The
//! zero-based `position` of each entry defines the order of every report
//! produced from it, no matter in which order entries finish resolving.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::extractor::ExtractError;
use crate::quality::QualityPreference;

/// Title used when the upstream omits a playlist title.
pub const UNKNOWN_PLAYLIST_TITLE: &str = "Unknown Playlist";

/// Title used when the upstream omits an entry title.
pub const UNKNOWN_ENTRY_TITLE: &str = "Unknown Title";

/// One video in a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    /// Upstream video identifier, unique within a playlist.
    pub id: String,
    /// Display title. Not guaranteed unique.
    pub title: String,
    /// Zero-based index in the playlist.
    pub position: usize,
    /// Duration in seconds, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
    /// Thumbnail URL, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Quality override for this entry only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_override: Option<QualityPreference>,
}

impl PlaylistEntry {
    /// Creates an entry with only an id, title and position.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, position: usize) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            position,
            duration_secs: None,
            thumbnail: None,
            quality_override: None,
        }
    }

    /// Sets the per-entry quality override.
    #[must_use]
    pub fn with_quality(mut self, quality: QualityPreference) -> Self {
        self.quality_override = Some(quality);
        self
    }
}

/// Raw entry as delivered by a playlist source, before positions are assigned.
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    /// Upstream id; entries without one are dropped.
    pub id: Option<String>,
    /// Upstream title.
    pub title: Option<String>,
    /// Duration in seconds.
    pub duration_secs: Option<u64>,
    /// Thumbnail URL.
    pub thumbnail: Option<String>,
}

/// An ordered playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    /// Playlist title.
    pub title: String,
    /// Entries in playlist order; `entries[i].position == i`.
    pub entries: Vec<PlaylistEntry>,
}

impl Playlist {
    /// Builds a playlist from raw upstream entries.
    ///
    /// Unavailable entries (`None`, or without an id) are dropped and the
    /// remaining entries are numbered consecutively from zero.
    #[must_use]
    pub fn from_raw(title: Option<String>, raw: Vec<Option<RawEntry>>) -> Self {
        let entries = raw
            .into_iter()
            .flatten()
            .filter_map(|entry| {
                let id = entry.id.filter(|id| !id.trim().is_empty())?;
                Some((id, entry.title, entry.duration_secs, entry.thumbnail))
            })
            .enumerate()
            .map(|(position, (id, title, duration_secs, thumbnail))| PlaylistEntry {
                id,
                title: title.unwrap_or_else(|| UNKNOWN_ENTRY_TITLE.to_string()),
                position,
                duration_secs,
                thumbnail,
                quality_override: None,
            })
            .collect();

        Self {
            title: title.unwrap_or_else(|| UNKNOWN_PLAYLIST_TITLE.to_string()),
            entries,
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the playlist has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applies per-entry quality overrides keyed by entry id.
    ///
    /// Returns the override ids that matched no entry, sorted.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, QualityPreference>) -> Vec<String> {
        for entry in &mut self.entries {
            if let Some(quality) = overrides.get(&entry.id) {
                entry.quality_override = Some(*quality);
            }
        }
        let mut unmatched: Vec<String> = overrides
            .keys()
            .filter(|id| !self.entries.iter().any(|entry| &entry.id == *id))
            .cloned()
            .collect();
        unmatched.sort();
        unmatched
    }
}

/// Supplies playlist metadata. The pipeline never fetches playlists itself.
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// Fetches the title and ordered entries of the playlist at `url`.
    async fn fetch(&self, url: &str) -> Result<Playlist, ExtractError>;
}

/// Errors for playlist URLs that cannot be processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaylistUrlError {
    /// The value is not an absolute http(s) URL.
    #[error("invalid playlist URL '{url}': {reason}\n  Suggestion: pass a full https:// playlist URL")]
    Invalid {
        /// The rejected input.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The URL has no `list` query parameter.
    #[error(
        "URL '{url}' does not appear to be a playlist (missing 'list=' parameter)\n  Suggestion: copy the link from the playlist page"
    )]
    NotAPlaylist {
        /// The rejected input.
        url: String,
    },
}

/// Checks that `raw` is an http(s) URL carrying a non-empty `list` parameter.
///
/// # Errors
///
/// Returns [`PlaylistUrlError`] describing why the URL was rejected.
pub fn validate_playlist_url(raw: &str) -> Result<Url, PlaylistUrlError> {
    let parsed = Url::parse(raw.trim()).map_err(|error| PlaylistUrlError::Invalid {
        url: raw.to_string(),
        reason: error.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(PlaylistUrlError::Invalid {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    let has_list = parsed
        .query_pairs()
        .any(|(key, value)| key == "list" && !value.is_empty());
    if !has_list {
        return Err(PlaylistUrlError::NotAPlaylist {
            url: raw.to_string(),
        });
    }

    Ok(parsed)
}
