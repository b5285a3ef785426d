//! Songbird and serenity implementations of the voice seams.

use std::sync::Arc;

use dashmap::DashMap;
use poise::serenity_prelude as serenity;
use serenity::all::{Cache, ChannelId, CreateMessage, GuildId, Http};
use serenity::async_trait;
use serenity::prelude::Mutex;
use songbird::error::JoinError;
use songbird::input::HttpRequest;
use songbird::tracks::{ControlError, Track, TrackHandle};
use songbird::{Call, Event, Songbird, TrackEvent};
use tracing::{debug, info, warn};

use super::event_handlers::TrackEndNotifier;
use super::voice::{Announcer, AudioSink, ConnectError, SinkError, TrackCompletion, VoiceConnector};
use crate::commands::music::audio_sources::track_metadata::QueuedTrack;

/// Timeouts and dropped gateway messages are worth another try; anything else is not.
fn classify(err: JoinError) -> ConnectError {
    match err {
        JoinError::TimedOut | JoinError::Dropped | JoinError::Driver(_) => {
            ConnectError::Transient(err.to_string())
        }
        other => ConnectError::Fatal(other.to_string()),
    }
}

/// Interprets the result of attaching an end handler to a freshly started track.
///
/// A track that is already over cannot take handlers, but it did play, so the
/// completion is fired here instead.
fn watch_outcome(
    registered: Result<(), ControlError>,
    completion: &TrackCompletion,
) -> Result<(), SinkError> {
    match registered {
        Ok(()) => Ok(()),
        Err(ControlError::Finished) => {
            debug!("Track {} ended before it could be watched", completion.serial());
            completion.finished();
            Ok(())
        }
        Err(e) => Err(SinkError::Start(e.to_string())),
    }
}

/// Plays tracks into one guild's songbird call.
pub struct SongbirdSink {
    call: Arc<Mutex<Call>>,
    http: reqwest::Client,
    current: Mutex<Option<TrackHandle>>,
}

impl SongbirdSink {
    pub fn new(call: Arc<Mutex<Call>>, http: reqwest::Client) -> Self {
        Self {
            call,
            http,
            current: Mutex::new(None),
        }
    }

    async fn handle(&self) -> Result<TrackHandle, SinkError> {
        self.current
            .lock()
            .await
            .clone()
            .ok_or_else(|| SinkError::Control("no track loaded".to_string()))
    }
}

#[async_trait]
impl AudioSink for SongbirdSink {
    async fn play(
        &self,
        track: &QueuedTrack,
        volume: f32,
        completion: TrackCompletion,
    ) -> Result<(), SinkError> {
        let input = HttpRequest::new(self.http.clone(), track.source_url.clone());

        let handle = {
            let mut call = self.call.lock().await;
            call.play_only(Track::from(input).volume(volume))
        };

        for event in [TrackEvent::End, TrackEvent::Error] {
            let registered =
                handle.add_event(Event::Track(event), TrackEndNotifier::new(completion.clone()));
            if let Err(e) = watch_outcome(registered, &completion) {
                let _ = handle.stop();
                return Err(e);
            }
        }

        *self.current.lock().await = Some(handle);
        Ok(())
    }

    async fn pause(&self) -> Result<(), SinkError> {
        self.handle()
            .await?
            .pause()
            .map_err(|e| SinkError::Control(e.to_string()))
    }

    async fn resume(&self) -> Result<(), SinkError> {
        self.handle()
            .await?
            .play()
            .map_err(|e| SinkError::Control(e.to_string()))
    }

    async fn stop(&self) -> Result<(), SinkError> {
        let handle = self.current.lock().await.take();
        match handle {
            Some(handle) => handle
                .stop()
                .map_err(|e| SinkError::Control(e.to_string())),
            None => Err(SinkError::Control("no track loaded".to_string())),
        }
    }

    async fn set_volume(&self, volume: f32) -> Result<(), SinkError> {
        self.handle()
            .await?
            .set_volume(volume)
            .map_err(|e| SinkError::Control(e.to_string()))
    }
}

/// Opens songbird calls and reads listener counts from the serenity cache.
pub struct SongbirdConnector {
    songbird: Arc<Songbird>,
    cache: Arc<Cache>,
    http: reqwest::Client,
    // The cache learns about our own voice state later than we do.
    channels: DashMap<GuildId, ChannelId>,
}

impl SongbirdConnector {
    pub fn new(songbird: Arc<Songbird>, cache: Arc<Cache>, http: reqwest::Client) -> Self {
        Self {
            songbird,
            cache,
            http,
            channels: DashMap::new(),
        }
    }
}

#[async_trait]
impl VoiceConnector for SongbirdConnector {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn AudioSink>, ConnectError> {
        let call = self
            .songbird
            .join(guild_id, channel_id)
            .await
            .map_err(classify)?;

        info!("Joined voice channel {} in guild {}", channel_id, guild_id);
        self.channels.insert(guild_id, channel_id);
        Ok(Arc::new(SongbirdSink::new(call, self.http.clone())))
    }

    async fn relocate(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), ConnectError> {
        self.songbird
            .join(guild_id, channel_id)
            .await
            .map_err(classify)?;

        self.channels.insert(guild_id, channel_id);
        Ok(())
    }

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), ConnectError> {
        self.channels.remove(&guild_id);
        if self.songbird.get(guild_id).is_none() {
            debug!("No call to leave in guild {}", guild_id);
            return Ok(());
        }

        self.songbird
            .remove(guild_id)
            .await
            .map_err(|e| ConnectError::Fatal(e.to_string()))
    }

    async fn is_connected(&self, guild_id: GuildId) -> bool {
        match self.songbird.get(guild_id) {
            Some(call) => call.lock().await.current_channel().is_some(),
            None => false,
        }
    }

    fn human_listeners(&self, guild_id: GuildId) -> usize {
        let Some(bot_channel) = self.channels.get(&guild_id).map(|entry| *entry) else {
            return 0;
        };
        let me = self.cache.current_user().id;
        let Some(guild) = self.cache.guild(guild_id) else {
            return 0;
        };

        guild
            .voice_states
            .values()
            .filter(|state| state.channel_id == Some(bot_channel) && state.user_id != me)
            .filter(|state| !state.member.as_ref().is_some_and(|m| m.user.bot))
            .count()
    }
}

/// Sends status lines through the Discord REST API.
pub struct SerenityAnnouncer {
    http: Arc<Http>,
}

impl SerenityAnnouncer {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Announcer for SerenityAnnouncer {
    async fn announce(&self, channel_id: ChannelId, message: String) {
        let message = CreateMessage::new().content(message);
        if let Err(e) = channel_id.send_message(Arc::clone(&self.http), message).await {
            warn!("Failed to post to channel {}: {}", channel_id, e);
        }
    }
}
