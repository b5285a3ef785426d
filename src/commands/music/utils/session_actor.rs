//! One actor per guild. Every operation on a guild's session, including sink
//! completions and watchdog ticks, arrives as a `SessionCommand` in a private
//! mailbox and is handled to completion before the next one starts.

use std::sync::Arc;

use serenity::all::{ChannelId, GuildId};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::guild_session::{Advance, GuildSession, PlaybackState, SessionSnapshot};
use super::inactivity::InactivityWatchdog;
use super::music_manager::{MusicError, MusicResult, SessionSettings};
use super::reconnect::with_retry;
use super::voice::{Announcer, AudioSink, TrackCompletion, VoiceConnector};
use crate::commands::music::audio_sources::track_metadata::QueuedTrack;

type Reply<T> = oneshot::Sender<MusicResult<T>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Connected,
    Moved,
    AlreadyConnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The session was idle and the track started right away.
    Playing(QueuedTrack),
    /// The track waits at this 1-based queue position.
    Queued { track: QueuedTrack, position: usize },
    /// The session was idle but the sink refused the track.
    Skipped(QueuedTrack),
}

#[derive(Debug)]
pub(crate) enum SessionCommand {
    Join {
        voice_channel: ChannelId,
        text_channel: ChannelId,
        reply: Reply<JoinOutcome>,
    },
    Enqueue {
        track: QueuedTrack,
        text_channel: Option<ChannelId>,
        reply: Reply<EnqueueOutcome>,
    },
    Pause {
        reply: Reply<QueuedTrack>,
    },
    Resume {
        reply: Reply<QueuedTrack>,
    },
    Skip {
        reply: Reply<QueuedTrack>,
    },
    SetVolume {
        percent: i64,
        reply: Reply<f32>,
    },
    ToggleLoop {
        reply: Reply<bool>,
    },
    ToggleSticky {
        reply: Reply<bool>,
    },
    ClearQueue {
        reply: Reply<usize>,
    },
    Disconnect {
        reply: Reply<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    SinkCompleted {
        serial: u64,
        error: Option<String>,
    },
    IdleCheck {
        generation: u64,
        expired: bool,
    },
    ListenersChanged,
    ConnectionLost,
}

/// Cheap, cloneable address of a guild's session actor.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    guild_id: GuildId,
    mailbox: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub(crate) fn new(guild_id: GuildId, mailbox: mpsc::UnboundedSender<SessionCommand>) -> Self {
        Self { guild_id, mailbox }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// The actor behind this handle has stopped.
    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> MusicResult<T> {
        let (tx, rx) = oneshot::channel();
        self.mailbox
            .send(build(tx))
            .map_err(|_| MusicError::SessionClosed)?;
        rx.await.map_err(|_| MusicError::SessionClosed)
    }

    /// Connects to (or moves into) `voice_channel`; status lines go to `text_channel`.
    pub async fn join(&self, voice_channel: ChannelId, text_channel: ChannelId) -> MusicResult<JoinOutcome> {
        self.request(|reply| SessionCommand::Join {
            voice_channel,
            text_channel,
            reply,
        })
        .await?
    }

    pub async fn enqueue(
        &self,
        track: QueuedTrack,
        text_channel: Option<ChannelId>,
    ) -> MusicResult<EnqueueOutcome> {
        self.request(|reply| SessionCommand::Enqueue {
            track,
            text_channel,
            reply,
        })
        .await?
    }

    pub async fn pause(&self) -> MusicResult<QueuedTrack> {
        self.request(|reply| SessionCommand::Pause { reply }).await?
    }

    pub async fn resume(&self) -> MusicResult<QueuedTrack> {
        self.request(|reply| SessionCommand::Resume { reply }).await?
    }

    /// Stops the current track; the queue moves on when the sink reports the end.
    pub async fn skip(&self) -> MusicResult<QueuedTrack> {
        self.request(|reply| SessionCommand::Skip { reply }).await?
    }

    pub async fn set_volume(&self, percent: i64) -> MusicResult<f32> {
        self.request(|reply| SessionCommand::SetVolume { percent, reply })
            .await?
    }

    pub async fn toggle_loop(&self) -> MusicResult<bool> {
        self.request(|reply| SessionCommand::ToggleLoop { reply }).await?
    }

    pub async fn toggle_sticky(&self) -> MusicResult<bool> {
        self.request(|reply| SessionCommand::ToggleSticky { reply })
            .await?
    }

    pub async fn clear_queue(&self) -> MusicResult<usize> {
        self.request(|reply| SessionCommand::ClearQueue { reply }).await?
    }

    /// Tears the session down. `Ok(false)` if it was not connected.
    pub async fn disconnect(&self) -> MusicResult<bool> {
        self.request(|reply| SessionCommand::Disconnect { reply }).await?
    }

    pub async fn snapshot(&self) -> MusicResult<SessionSnapshot> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    /// Someone joined or left the bot's voice channel.
    pub fn listeners_changed(&self) {
        let _ = self.mailbox.send(SessionCommand::ListenersChanged);
    }

    /// The bot was removed from voice by someone else.
    pub fn connection_lost(&self) {
        let _ = self.mailbox.send(SessionCommand::ConnectionLost);
    }
}

pub(crate) struct SessionActor {
    session: GuildSession,
    sink: Option<Arc<dyn AudioSink>>,
    watchdog: InactivityWatchdog,
    settings: SessionSettings,
    connector: Arc<dyn VoiceConnector>,
    announcer: Arc<dyn Announcer>,
    mailbox_tx: mpsc::UnboundedSender<SessionCommand>,
    mailbox: mpsc::UnboundedReceiver<SessionCommand>,
}

impl SessionActor {
    pub(crate) fn new(
        guild_id: GuildId,
        mailbox_tx: mpsc::UnboundedSender<SessionCommand>,
        mailbox: mpsc::UnboundedReceiver<SessionCommand>,
        connector: Arc<dyn VoiceConnector>,
        announcer: Arc<dyn Announcer>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            session: GuildSession::new(guild_id),
            sink: None,
            watchdog: InactivityWatchdog::new(settings.idle),
            settings,
            connector,
            announcer,
            mailbox_tx,
            mailbox,
        }
    }

    fn guild_id(&self) -> GuildId {
        self.session.guild_id()
    }

    pub(crate) async fn run(mut self) {
        debug!("Session actor started for guild {}", self.guild_id());

        while let Some(command) = self.mailbox.recv().await {
            self.handle(command).await;
            self.refresh_watchdog().await;
        }

        debug!("Session actor stopped for guild {}", self.guild_id());
    }

    async fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Join {
                voice_channel,
                text_channel,
                reply,
            } => {
                let _ = reply.send(self.join(voice_channel, text_channel).await);
            }
            SessionCommand::Enqueue {
                track,
                text_channel,
                reply,
            } => {
                let _ = reply.send(self.enqueue(track, text_channel).await);
            }
            SessionCommand::Pause { reply } => {
                let _ = reply.send(self.pause().await);
            }
            SessionCommand::Resume { reply } => {
                let _ = reply.send(self.resume().await);
            }
            SessionCommand::Skip { reply } => {
                let _ = reply.send(self.skip().await);
            }
            SessionCommand::SetVolume { percent, reply } => {
                let _ = reply.send(self.set_volume(percent).await);
            }
            SessionCommand::ToggleLoop { reply } => {
                let enabled = self.session.toggle_loop();
                info!("Loop for guild {} is now {}", self.guild_id(), enabled);
                let _ = reply.send(Ok(enabled));
            }
            SessionCommand::ToggleSticky { reply } => {
                let enabled = self.session.toggle_sticky();
                info!("24/7 mode for guild {} is now {}", self.guild_id(), enabled);
                let _ = reply.send(Ok(enabled));
            }
            SessionCommand::ClearQueue { reply } => {
                let removed = self.session.clear_queue();
                info!("Cleared {} queued tracks for guild {}", removed, self.guild_id());
                let _ = reply.send(Ok(removed));
            }
            SessionCommand::Disconnect { reply } => {
                let was_connected = self.teardown(true).await;
                let _ = reply.send(Ok(was_connected));
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.session.snapshot());
            }
            SessionCommand::SinkCompleted { serial, error } => {
                self.on_completion(serial, error).await;
            }
            SessionCommand::IdleCheck { generation, expired } => {
                self.on_idle_check(generation, expired).await;
            }
            SessionCommand::ListenersChanged => {
                debug!("Listener change in guild {}", self.guild_id());
            }
            SessionCommand::ConnectionLost => {
                // The update may belong to a connection we already left or replaced.
                if self.sink.is_none() || self.connector.is_connected(self.guild_id()).await {
                    debug!("Ignoring stale voice loss in guild {}", self.guild_id());
                } else if self.teardown(false).await {
                    warn!("Voice connection for guild {} was closed externally", self.guild_id());
                }
            }
        }
    }

    async fn join(&mut self, voice_channel: ChannelId, text_channel: ChannelId) -> MusicResult<JoinOutcome> {
        let guild_id = self.guild_id();
        self.session.set_text_channel(text_channel);
        let connector = Arc::clone(&self.connector);
        let policy = self.settings.retry;

        if self.sink.is_some() {
            if self.session.voice_channel() == Some(voice_channel) {
                return Ok(JoinOutcome::AlreadyConnected);
            }

            info!("Moving guild {} to voice channel {}", guild_id, voice_channel);
            with_retry(policy, "Voice move", || connector.relocate(guild_id, voice_channel))
                .await
                .map_err(|e| MusicError::JoinError(e.to_string()))?;
            self.session.connected(voice_channel);
            return Ok(JoinOutcome::Moved);
        }

        info!("Connecting guild {} to voice channel {}", guild_id, voice_channel);
        self.session.begin_connecting();

        match with_retry(policy, "Voice join", || connector.connect(guild_id, voice_channel)).await {
            Ok(sink) => {
                self.sink = Some(sink);
                self.session.connected(voice_channel);
                if self.session.queue_len() > 0 {
                    self.advance(true).await;
                }
                Ok(JoinOutcome::Connected)
            }
            Err(e) => {
                self.session.connect_failed();
                Err(MusicError::JoinError(e.to_string()))
            }
        }
    }

    async fn enqueue(
        &mut self,
        track: QueuedTrack,
        text_channel: Option<ChannelId>,
    ) -> MusicResult<EnqueueOutcome> {
        if let Some(channel_id) = text_channel {
            self.session.set_text_channel(channel_id);
        }

        let position = self.session.enqueue(track.clone());
        info!(
            "Queued '{}' at position {} for guild {}",
            track.title,
            position,
            self.guild_id()
        );

        if self.session.state() != PlaybackState::StoppedEmpty {
            return Ok(EnqueueOutcome::Queued { track, position });
        }

        match self.advance(false).await {
            Some(_) => Ok(EnqueueOutcome::Playing(track)),
            None => Ok(EnqueueOutcome::Skipped(track)),
        }
    }

    fn live_sink(&self) -> MusicResult<Arc<dyn AudioSink>> {
        self.sink.clone().ok_or(MusicError::NotConnected)
    }

    fn current_track(&self) -> MusicResult<QueuedTrack> {
        self.session
            .current()
            .map(|now| now.track.clone())
            .ok_or(MusicError::NothingPlaying)
    }

    async fn pause(&mut self) -> MusicResult<QueuedTrack> {
        let sink = self.live_sink()?;
        self.session.pause()?;

        if let Err(e) = sink.pause().await {
            self.session.resume()?;
            return Err(MusicError::PlaybackError(e.to_string()));
        }
        self.current_track()
    }

    async fn resume(&mut self) -> MusicResult<QueuedTrack> {
        let sink = self.live_sink()?;
        self.session.resume()?;

        if let Err(e) = sink.resume().await {
            self.session.pause()?;
            return Err(MusicError::PlaybackError(e.to_string()));
        }
        self.current_track()
    }

    async fn skip(&mut self) -> MusicResult<QueuedTrack> {
        let sink = self.live_sink()?;
        self.session.can_skip()?;

        let (track, serial) = match self.session.current() {
            Some(now) => (now.track.clone(), now.serial),
            None => return Err(MusicError::NothingPlaying),
        };

        info!("Skipping '{}' in guild {}", track.title, self.guild_id());
        if let Err(e) = sink.stop().await {
            // No completion will come for a track the sink could not stop.
            warn!("Sink refused to stop in guild {}: {}", self.guild_id(), e);
            self.on_completion(serial, Some(e.to_string())).await;
        }

        Ok(track)
    }

    async fn set_volume(&mut self, percent: i64) -> MusicResult<f32> {
        let volume = self.session.set_volume(percent)?;

        if let (Some(sink), Some(_)) = (&self.sink, self.session.current()) {
            if let Err(e) = sink.set_volume(volume).await {
                warn!("Failed to apply volume in guild {}: {}", self.guild_id(), e);
            }
        }

        info!("Volume for guild {} set to {}", self.guild_id(), volume);
        Ok(volume)
    }

    async fn on_completion(&mut self, serial: u64, error: Option<String>) {
        if !self.session.is_current(serial) {
            debug!(
                "Ignoring stale completion {} in guild {}",
                serial,
                self.guild_id()
            );
            return;
        }

        if let Some(reason) = error {
            warn!("Playback failed in guild {}: {}", self.guild_id(), reason);
        }

        self.advance(true).await;
    }

    /// Loads the next track into the sink. Returns the track that started.
    async fn advance(&mut self, announce: bool) -> Option<QueuedTrack> {
        let sink = self.sink.clone()?;
        let mut allow_replay = true;

        loop {
            let track = match self.session.next_step(allow_replay) {
                Advance::Replay(track) | Advance::Next(track) => track,
                Advance::Exhausted => {
                    info!("Queue finished for guild {}", self.guild_id());
                    return None;
                }
            };

            let serial = self.session.begin(track.clone());
            let completion = TrackCompletion::new(serial, self.mailbox_tx.clone());

            match sink.play(&track, self.session.volume(), completion).await {
                Ok(()) => {
                    info!("Now playing '{}' in guild {}", track.title, self.guild_id());
                    if announce {
                        self.announce(format!("🎶 Now playing: **{}**", track.title))
                            .await;
                    }
                    return Some(track);
                }
                Err(e) => {
                    error!(
                        "Failed to start '{}' in guild {}: {}",
                        track.title,
                        self.guild_id(),
                        e
                    );
                    self.session.abandon_current();
                    self.announce(format!(
                        "An error occurred while playing **{}**, skipping.",
                        track.title
                    ))
                    .await;
                    allow_replay = false;
                }
            }
        }
    }

    /// Drops the sink and resets the session. Returns whether anything was connected.
    async fn teardown(&mut self, leave_channel: bool) -> bool {
        self.watchdog.disarm();

        let Some(sink) = self.sink.take() else {
            self.session.reset();
            // A connection without a sink is left over from a crashed actor.
            return leave_channel && self.leave_orphaned_connection().await;
        };

        if self.session.current().is_some() {
            if let Err(e) = sink.stop().await {
                debug!("Stop during teardown failed in guild {}: {}", self.guild_id(), e);
            }
        }

        if leave_channel {
            if let Err(e) = self.connector.disconnect(self.guild_id()).await {
                warn!("Failed to leave voice in guild {}: {}", self.guild_id(), e);
            }
        }

        self.session.reset();
        info!("Session for guild {} torn down", self.guild_id());
        true
    }

    async fn leave_orphaned_connection(&self) -> bool {
        let guild_id = self.guild_id();
        if !self.connector.is_connected(guild_id).await {
            return false;
        }

        info!("Leaving orphaned voice connection in guild {}", guild_id);
        if let Err(e) = self.connector.disconnect(guild_id).await {
            warn!("Failed to leave voice in guild {}: {}", guild_id, e);
        }
        true
    }

    fn is_idle(&self) -> bool {
        self.sink.is_some()
            && self.session.is_idle()
            && self.connector.human_listeners(self.guild_id()) == 0
    }

    /// Arms the watchdog when the session turns idle, cancels it when it stops being idle.
    async fn refresh_watchdog(&mut self) {
        match (self.is_idle(), self.watchdog.is_armed()) {
            (true, false) => {
                let generation = self.watchdog.arm(self.mailbox_tx.clone());
                let timeout = self.watchdog.settings().timeout;
                info!(
                    "Guild {} is idle, watchdog generation {} armed for {:?}",
                    self.guild_id(),
                    generation,
                    timeout
                );
                self.announce(format!(
                    "😴 No one is listening. Leaving in {} unless something plays.",
                    super::format_duration(timeout)
                ))
                .await;
            }
            (false, true) => {
                self.watchdog.disarm();
            }
            _ => {}
        }
    }

    async fn on_idle_check(&mut self, generation: u64, expired: bool) {
        if !self.watchdog.is_current(generation) {
            debug!(
                "Ignoring stale idle check {} in guild {}",
                generation,
                self.guild_id()
            );
            return;
        }

        // A check that fails here is cancelled by the refresh that follows.
        if expired && self.is_idle() {
            info!("Disconnecting guild {} after inactivity", self.guild_id());
            let text_channel = self.session.text_channel();
            self.teardown(true).await;
            if let Some(channel_id) = text_channel {
                self.announcer
                    .announce(channel_id, "👋 Leaving due to inactivity.".to_string())
                    .await;
            }
        }
    }

    async fn announce(&self, message: String) {
        if let Some(channel_id) = self.session.text_channel() {
            self.announcer.announce(channel_id, message).await;
        }
    }
}
