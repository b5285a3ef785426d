use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use dashmap::DashMap;
use futures::FutureExt;
use poise::serenity_prelude as serenity;
use serenity::client::Context;
use serenity::model::id::{ChannelId, GuildId};
use songbird::Songbird;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::inactivity::IdleSettings;
use super::reconnect::RetryPolicy;
use super::session_actor::{EnqueueOutcome, JoinOutcome, SessionActor, SessionHandle};
use super::voice::{Announcer, VoiceConnector};
use crate::commands::music::audio_sources::TrackResolver;
use crate::config::Config;

/// Errors that can occur during music operations
#[derive(Error, Debug)]
pub enum MusicError {
    #[error("Not in a guild")]
    NotInGuild,

    #[error("User is not in a voice channel")]
    UserNotInVoiceChannel,

    #[error("Not connected to a voice channel")]
    NotConnected,

    #[error("Failed to get voice manager")]
    NoVoiceManager,

    #[error("Failed to join voice channel: {0}")]
    JoinError(String),

    #[error("Nothing is playing")]
    NothingPlaying,

    #[error("Playback is not paused")]
    NotPaused,

    #[error("Volume must be between 0 and 200, got {0}")]
    VolumeOutOfRange(i64),

    #[error("No results found")]
    NoResults,

    #[error("Failed to fetch track: {0}")]
    ResolveError(String),

    #[error("Playback error: {0}")]
    PlaybackError(String),

    #[error("Guild session is no longer running")]
    SessionClosed,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl MusicError {
    /// Caller mistakes that are answered inline and not logged as faults.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            MusicError::NotInGuild
                | MusicError::UserNotInVoiceChannel
                | MusicError::NotConnected
                | MusicError::NothingPlaying
                | MusicError::NotPaused
                | MusicError::VolumeOutOfRange(_)
                | MusicError::NoResults
        )
    }
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

/// Timing knobs shared by every guild session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSettings {
    pub idle: IdleSettings,
    pub retry: RetryPolicy,
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            idle: IdleSettings {
                timeout: config.idle_timeout,
                poll_interval: config.idle_poll_interval,
            },
            retry: RetryPolicy {
                max_attempts: config.connect_attempts,
                base_delay: config.connect_base_delay,
            },
        }
    }
}

/// Guild-keyed table of session actors.
pub struct SessionRegistry {
    sessions: DashMap<GuildId, SessionHandle>,
    connector: Arc<dyn VoiceConnector>,
    announcer: Arc<dyn Announcer>,
    settings: SessionSettings,
}

impl SessionRegistry {
    pub fn new(
        connector: Arc<dyn VoiceConnector>,
        announcer: Arc<dyn Announcer>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            connector,
            announcer,
            settings,
        }
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    /// The guild's session, spawning a fresh actor if none is running.
    pub fn session(&self, guild_id: GuildId) -> SessionHandle {
        let mut entry = self
            .sessions
            .entry(guild_id)
            .or_insert_with(|| self.spawn(guild_id));

        if entry.is_closed() {
            info!("Restarting closed session for guild {}", guild_id);
            *entry = self.spawn(guild_id);
        }

        entry.clone()
    }

    /// The guild's session if one is running. Never spawns.
    pub fn existing(&self, guild_id: GuildId) -> Option<SessionHandle> {
        self.sessions
            .get(&guild_id)
            .map(|entry| entry.clone())
            .filter(|handle| !handle.is_closed())
    }

    fn spawn(&self, guild_id: GuildId) -> SessionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = SessionActor::new(
            guild_id,
            tx.clone(),
            rx,
            Arc::clone(&self.connector),
            Arc::clone(&self.announcer),
            self.settings,
        );

        let connector = Arc::clone(&self.connector);
        tokio::spawn(async move {
            if let Err(panic) = AssertUnwindSafe(actor.run()).catch_unwind().await {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!("Session actor for guild {} panicked: {}", guild_id, reason);

                // The next session starts disconnected, so the call must not outlive this one.
                if let Err(e) = connector.disconnect(guild_id).await {
                    warn!("Failed to leave voice after crash in guild {}: {}", guild_id, e);
                }
            }
        });

        debug!("Spawned session actor for guild {}", guild_id);
        SessionHandle::new(guild_id, tx)
    }

    /// Joins the caller's channel if needed, resolves `query` and queues the result.
    ///
    /// A failed or empty lookup leaves the queue untouched.
    pub async fn play(
        &self,
        guild_id: GuildId,
        voice_channel: ChannelId,
        text_channel: ChannelId,
        query: &str,
        resolver: &dyn TrackResolver,
    ) -> MusicResult<(JoinOutcome, EnqueueOutcome)> {
        let session = self.session(guild_id);
        let joined = session.join(voice_channel, text_channel).await?;

        let track = resolver
            .resolve(query)
            .await?
            .ok_or(MusicError::NoResults)?;

        let outcome = session.enqueue(track, Some(text_channel)).await?;
        Ok((joined, outcome))
    }
}

/// Get the Songbird voice client from the context
pub async fn get_songbird(ctx: &Context) -> MusicResult<Arc<Songbird>> {
    songbird::get(ctx).await.ok_or(MusicError::NoVoiceManager)
}

/// Get the voice channel ID that the user is currently in
pub fn get_user_voice_channel(
    ctx: &Context,
    guild_id: GuildId,
    user_id: serenity::UserId,
) -> MusicResult<ChannelId> {
    let guild = ctx.cache.guild(guild_id).ok_or(MusicError::NotInGuild)?;

    let voice_state = guild
        .voice_states
        .get(&user_id)
        .ok_or(MusicError::UserNotInVoiceChannel)?;

    voice_state
        .channel_id
        .ok_or(MusicError::UserNotInVoiceChannel)
}
