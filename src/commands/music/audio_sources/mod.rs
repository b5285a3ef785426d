//! Track resolution: turning a free-text query or a link into a playable
//! `QueuedTrack`. The session core only sees the `TrackResolver` trait.

/// Submodule defining the `QueuedTrack` struct and its `yt-dlp` parsing.
pub mod track_metadata;
/// Submodule implementing `TrackResolver` on top of the `yt-dlp` binary.
pub mod youtube;

use crate::commands::music::utils::music_manager::MusicError;
use serenity::async_trait;
use track_metadata::QueuedTrack;
use url::Url;

/// A specialized `Result` type for resolution.
pub type AudioSourceResult<T> = Result<T, MusicError>;

/// Looks up a query and returns at most one playable result.
///
/// `Ok(None)` means the lookup succeeded but found nothing. Implementations
/// must not block the calling task; callers never retry automatically.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> AudioSourceResult<Option<QueuedTrack>>;
}

/// A utility struct providing general helper functions related to audio sources.
pub struct AudioSource;

impl AudioSource {
    /// Performs a basic check if the input string can be parsed as an http(s) URL.
    pub fn is_url(input: &str) -> bool {
        Url::parse(input).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
    }
}
