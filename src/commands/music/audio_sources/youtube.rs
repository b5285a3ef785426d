//! Implements `TrackResolver` with the `yt-dlp` command-line tool.

use std::process::Command;

use serenity::async_trait;
use tracing::{debug, info, warn};
use url::Url;

use super::{AudioSource, AudioSourceResult, TrackResolver, track_metadata::QueuedTrack};
use crate::commands::music::utils::music_manager::MusicError;

/// Prefer opus, then aac, then whatever audio the site offers.
const FORMAT_SELECTOR: &str = "bestaudio[acodec=opus]/bestaudio[acodec=aac]/bestaudio/best";

/// Resolves queries by shelling out to `yt-dlp`.
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
    binary: String,
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YtDlpResolver {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Checks if the input string is a YouTube watch page or a youtu.be short link.
    pub fn is_youtube_url(query: &str) -> bool {
        match Url::parse(query) {
            Ok(url) => {
                url.host_str().is_some_and(|host| {
                    matches!(host, "www.youtube.com" | "youtube.com" | "m.youtube.com")
                }) && url.path().starts_with("/watch")
                    || url.host_str() == Some("youtu.be")
            }
            Err(_) => false,
        }
    }

    /// Links go to `yt-dlp` untouched; anything else becomes a search for the
    /// first matching video.
    pub fn search_term(query: &str) -> String {
        let query = query.trim();
        if Self::is_youtube_url(query) || AudioSource::is_url(query) {
            query.to_string()
        } else {
            format!("ytsearch:{}", query)
        }
    }

    fn run(binary: &str, term: &str) -> AudioSourceResult<Option<QueuedTrack>> {
        let output = Command::new(binary)
            .args([
                "-j",
                "--no-playlist",
                "--quiet",
                "--no-warnings",
                "--default-search",
                "auto",
                "-f",
                FORMAT_SELECTOR,
                term,
            ])
            .output()
            .map_err(|e| MusicError::ResolveError(format!("Failed to run {}: {}", binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MusicError::ResolveError(format!(
                "{} exited with {}: {}",
                binary,
                output.status,
                stderr.trim()
            )));
        }

        QueuedTrack::from_ytdlp_output(&output.stdout)
    }
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve(&self, query: &str) -> AudioSourceResult<Option<QueuedTrack>> {
        if query.trim().is_empty() {
            return Ok(None);
        }

        let term = Self::search_term(query);
        info!("Resolving '{}' with {}", term, self.binary);

        let binary = self.binary.clone();
        let lookup_term = term.clone();
        let result = tokio::task::spawn_blocking(move || Self::run(&binary, &lookup_term))
            .await
            .map_err(|e| MusicError::ResolveError(format!("Resolver task failed: {}", e)))?;

        match &result {
            Ok(Some(track)) => debug!("Resolved '{}' to '{}'", term, track.title),
            Ok(None) => debug!("No results for '{}'", term),
            Err(e) => warn!("Failed to resolve '{}': {}", term, e),
        }

        result
    }
}
