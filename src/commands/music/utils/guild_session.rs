//! Per-guild playback state: the queue, the current track and the modifiers.
//!
//! Nothing here touches the network. The session actor owns one `GuildSession`
//! and drives the sink according to the transitions computed here.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serenity::all::{ChannelId, GuildId};

use super::music_manager::{MusicError, MusicResult};
use crate::commands::music::audio_sources::track_metadata::QueuedTrack;

pub const DEFAULT_VOLUME: f32 = 1.0;
pub const MAX_VOLUME: f32 = 2.0;
pub const MAX_VOLUME_PERCENT: i64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No voice connection.
    Idle,
    Connecting,
    Playing,
    Paused,
    /// Connected, nothing loaded, queue empty.
    StoppedEmpty,
}

/// The track loaded into the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub track: QueuedTrack,
    pub started_at: DateTime<Utc>,
    /// Identifies this particular start; completions carry it back.
    pub serial: u64,
}

/// Outcome of the next-track decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Loop is on: play the current track again.
    Replay(QueuedTrack),
    /// Head of the queue, already popped.
    Next(QueuedTrack),
    /// Nothing left; the session is now `StoppedEmpty`.
    Exhausted,
}

/// Read-only copy of a session handed to command handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub guild_id: GuildId,
    pub state: PlaybackState,
    pub current: Option<NowPlaying>,
    pub queue: Vec<QueuedTrack>,
    pub volume: f32,
    pub loop_enabled: bool,
    pub sticky: bool,
    pub voice_channel: Option<ChannelId>,
}

#[derive(Debug)]
pub struct GuildSession {
    guild_id: GuildId,
    queue: VecDeque<QueuedTrack>,
    current: Option<NowPlaying>,
    volume: f32,
    loop_enabled: bool,
    sticky: bool,
    state: PlaybackState,
    voice_channel: Option<ChannelId>,
    text_channel: Option<ChannelId>,
    next_serial: u64,
}

impl GuildSession {
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            queue: VecDeque::new(),
            current: None,
            volume: DEFAULT_VOLUME,
            loop_enabled: false,
            sticky: false,
            state: PlaybackState::Idle,
            voice_channel: None,
            text_channel: None,
            next_serial: 1,
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        !matches!(self.state, PlaybackState::Idle | PlaybackState::Connecting)
    }

    pub fn current(&self) -> Option<&NowPlaying> {
        self.current.as_ref()
    }

    pub fn queue(&self) -> impl ExactSizeIterator<Item = &QueuedTrack> {
        self.queue.iter()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    pub fn sticky(&self) -> bool {
        self.sticky
    }

    pub fn voice_channel(&self) -> Option<ChannelId> {
        self.voice_channel
    }

    pub fn text_channel(&self) -> Option<ChannelId> {
        self.text_channel
    }

    pub fn set_text_channel(&mut self, channel_id: ChannelId) {
        self.text_channel = Some(channel_id);
    }

    pub fn begin_connecting(&mut self) {
        self.state = PlaybackState::Connecting;
    }

    /// A fresh connection attempt failed for good.
    pub fn connect_failed(&mut self) {
        self.state = PlaybackState::Idle;
        self.voice_channel = None;
    }

    /// Voice is up in `channel_id`. The caller advances if the queue has work.
    pub fn connected(&mut self, channel_id: ChannelId) {
        self.voice_channel = Some(channel_id);
        if matches!(self.state, PlaybackState::Idle | PlaybackState::Connecting) {
            self.state = PlaybackState::StoppedEmpty;
        }
    }

    /// Appends to the queue and returns the 1-based position.
    pub fn enqueue(&mut self, track: QueuedTrack) -> usize {
        self.queue.push_back(track);
        self.queue.len()
    }

    /// Decides what plays next.
    ///
    /// `allow_replay` is false when the current track just failed to start, so a
    /// broken source under loop falls through to the queue instead of spinning.
    pub fn next_step(&mut self, allow_replay: bool) -> Advance {
        if allow_replay && self.loop_enabled {
            if let Some(now) = &self.current {
                return Advance::Replay(now.track.clone());
            }
        }

        match self.queue.pop_front() {
            Some(track) => Advance::Next(track),
            None => {
                self.current = None;
                if self.is_connected() {
                    self.state = PlaybackState::StoppedEmpty;
                }
                Advance::Exhausted
            }
        }
    }

    /// Marks `track` as loaded into the sink and returns its serial.
    pub fn begin(&mut self, track: QueuedTrack) -> u64 {
        let serial = self.next_serial;
        self.next_serial += 1;
        self.current = Some(NowPlaying {
            track,
            started_at: Utc::now(),
            serial,
        });
        self.state = PlaybackState::Playing;
        serial
    }

    /// The sink refused to start the current track.
    pub fn abandon_current(&mut self) {
        self.current = None;
    }

    /// Whether a completion for `serial` refers to the loaded track.
    pub fn is_current(&self, serial: u64) -> bool {
        self.current.as_ref().is_some_and(|now| now.serial == serial)
    }

    pub fn pause(&mut self) -> MusicResult<()> {
        match self.state {
            PlaybackState::Playing => {
                self.state = PlaybackState::Paused;
                Ok(())
            }
            _ => Err(MusicError::NothingPlaying),
        }
    }

    pub fn resume(&mut self) -> MusicResult<()> {
        match self.state {
            PlaybackState::Paused => {
                self.state = PlaybackState::Playing;
                Ok(())
            }
            _ => Err(MusicError::NotPaused),
        }
    }

    pub fn can_skip(&self) -> MusicResult<()> {
        match self.state {
            PlaybackState::Playing | PlaybackState::Paused => Ok(()),
            _ => Err(MusicError::NothingPlaying),
        }
    }

    /// Converts a 0-200 percentage into a gain, rejecting anything else.
    pub fn percent_to_volume(percent: i64) -> MusicResult<f32> {
        if !(0..=MAX_VOLUME_PERCENT).contains(&percent) {
            return Err(MusicError::VolumeOutOfRange(percent));
        }
        Ok((percent as f32 / 100.0).clamp(0.0, MAX_VOLUME))
    }

    pub fn set_volume(&mut self, percent: i64) -> MusicResult<f32> {
        let volume = Self::percent_to_volume(percent)?;
        self.volume = volume;
        Ok(volume)
    }

    pub fn toggle_loop(&mut self) -> bool {
        self.loop_enabled = !self.loop_enabled;
        self.loop_enabled
    }

    pub fn toggle_sticky(&mut self) -> bool {
        self.sticky = !self.sticky;
        self.sticky
    }

    /// Drops every queued track, returning how many there were.
    pub fn clear_queue(&mut self) -> usize {
        let removed = self.queue.len();
        self.queue.clear();
        removed
    }

    /// Back to a fresh, disconnected session. Serials keep counting so that
    /// completions from the torn-down sink can never match a later track.
    pub fn reset(&mut self) {
        let next_serial = self.next_serial;
        *self = Self::new(self.guild_id);
        self.next_serial = next_serial;
    }

    /// Whether the inactivity watchdog should be running, ignoring listeners.
    pub fn is_idle(&self) -> bool {
        !self.sticky
            && self.queue.is_empty()
            && matches!(
                self.state,
                PlaybackState::StoppedEmpty | PlaybackState::Paused
            )
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            guild_id: self.guild_id,
            state: self.state,
            current: self.current.clone(),
            queue: self.queue.iter().cloned().collect(),
            volume: self.volume,
            loop_enabled: self.loop_enabled,
            sticky: self.sticky,
            voice_channel: self.voice_channel,
        }
    }
}
