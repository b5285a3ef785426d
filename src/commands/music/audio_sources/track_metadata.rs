//! Defines `QueuedTrack`, the resolved and directly playable unit that sits in a
//! guild's queue, and the conversion from `yt-dlp` JSON output.

use crate::commands::music::utils::music_manager::MusicError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Title used when resolution does not report one.
pub const UNTITLED: &str = "Untitled";

/// A track ready for the audio sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueuedTrack {
    /// Resolved stream URL, directly playable by the sink.
    pub source_url: String,
    /// Display title.
    pub title: String,
}

impl QueuedTrack {
    pub fn new(source_url: impl Into<String>, title: Option<String>) -> Self {
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());

        Self {
            source_url: source_url.into(),
            title,
        }
    }

    /// Parses the stdout of `yt-dlp -j`.
    ///
    /// `yt-dlp` prints one JSON object per line. An object carrying an `entries`
    /// array (playlist or search wrapper) contributes its first entry. Empty
    /// output or empty `entries` means the lookup legitimately found nothing.
    pub fn from_ytdlp_output(stdout: &[u8]) -> Result<Option<QueuedTrack>, MusicError> {
        let text = String::from_utf8_lossy(stdout);

        let Some(line) = text.lines().map(str::trim).find(|l| !l.is_empty()) else {
            return Ok(None);
        };

        let json: serde_json::Value = serde_json::from_str(line).map_err(|e| {
            MusicError::ResolveError(format!("Failed to parse track metadata: {}", e))
        })?;

        let entry = match json.get("entries") {
            Some(entries) => match entries.as_array().and_then(|list| list.first()) {
                Some(first) => first,
                None => return Ok(None),
            },
            None => &json,
        };

        let source_url = entry["url"]
            .as_str()
            .ok_or_else(|| MusicError::ResolveError("Result has no stream URL".to_string()))?;

        let title = entry["title"].as_str().map(|s| s.to_string());

        Ok(Some(QueuedTrack::new(source_url, title)))
    }
}

impl fmt::Display for QueuedTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}
