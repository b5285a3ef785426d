//! The seams between a guild session and the outside world: the voice transport
//! that connects to a channel, the audio sink that streams a track into it, and
//! the announcer that posts status lines to a text channel.

use std::sync::Arc;

use serenity::all::{ChannelId, GuildId};
use serenity::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::session_actor::SessionCommand;
use crate::commands::music::audio_sources::track_metadata::QueuedTrack;

/// Voice transport failures, split by whether retrying can help.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("transient voice transport failure: {0}")]
    Transient(String),

    #[error("voice transport failure: {0}")]
    Fatal(String),
}

impl ConnectError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ConnectError::Transient(_))
    }
}

/// Failures reported by the audio sink.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("failed to start playback: {0}")]
    Start(String),

    #[error("failed to control playback: {0}")]
    Control(String),
}

/// Completion callback handed to the sink with every `play` call.
///
/// The sink may fire it from any thread or task. Firing only posts a message to
/// the owning guild's mailbox; the session decides on its own task whether the
/// signal is still current.
#[derive(Debug, Clone)]
pub struct TrackCompletion {
    serial: u64,
    mailbox: mpsc::UnboundedSender<SessionCommand>,
}

impl TrackCompletion {
    pub(crate) fn new(serial: u64, mailbox: mpsc::UnboundedSender<SessionCommand>) -> Self {
        Self { serial, mailbox }
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// The track ran to its end or was stopped.
    pub fn finished(&self) {
        self.post(None);
    }

    /// The track ended because decoding or streaming failed.
    pub fn failed(&self, reason: impl Into<String>) {
        self.post(Some(reason.into()));
    }

    fn post(&self, error: Option<String>) {
        // The session may already be gone; nothing left to advance then.
        let _ = self.mailbox.send(SessionCommand::SinkCompleted {
            serial: self.serial,
            error,
        });
    }
}

/// A live voice-output connection for one guild.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Replaces whatever is playing with `track` at the given gain.
    async fn play(
        &self,
        track: &QueuedTrack,
        volume: f32,
        completion: TrackCompletion,
    ) -> Result<(), SinkError>;

    async fn pause(&self) -> Result<(), SinkError>;

    async fn resume(&self) -> Result<(), SinkError>;

    /// Stops the current track. The sink fires the track's completion.
    async fn stop(&self) -> Result<(), SinkError>;

    /// Applies a new gain to the current track without interrupting it.
    async fn set_volume(&self, volume: f32) -> Result<(), SinkError>;
}

/// Opens, moves and closes voice connections.
#[async_trait]
pub trait VoiceConnector: Send + Sync {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn AudioSink>, ConnectError>;

    /// Moves an existing connection to another channel of the same guild.
    async fn relocate(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), ConnectError>;

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), ConnectError>;

    /// Whether the transport still holds a live connection for the guild.
    async fn is_connected(&self, guild_id: GuildId) -> bool;

    /// Number of non-bot members in the bot's current voice channel.
    fn human_listeners(&self, guild_id: GuildId) -> usize;
}

/// Posts short status lines to a text channel.
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, channel_id: ChannelId, message: String);
}
