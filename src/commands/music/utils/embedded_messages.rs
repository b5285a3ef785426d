use chrono::{DateTime, Utc};
use poise::{CreateReply, serenity_prelude as serenity};
use serenity::all::{ChannelId, CreateEmbed};

use super::format_duration;
use super::guild_session::{NowPlaying, PlaybackState, SessionSnapshot};
use super::music_manager::MusicError;
use super::session_actor::{EnqueueOutcome, JoinOutcome};
use crate::commands::music::audio_sources::track_metadata::QueuedTrack;

const SUCCESS: u32 = 0x00ff00;
const FAILURE: u32 = 0xff0000;

/// Bitrate below which `join` warns about audio quality, in bits per second.
pub const LOW_BITRATE: u32 = 128_000;

fn success(title: &str, description: impl Into<String>) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title(title)
            .description(description)
            .color(SUCCESS),
    )
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "enabled" } else { "disabled" }
}

/// Create an embed for a failed command. Input mistakes are only shown to the caller.
pub fn error(err: &MusicError) -> CreateReply {
    let description = match err {
        MusicError::UserNotInVoiceChannel => "You need to be in a voice channel".to_string(),
        MusicError::NotConnected => "I'm not connected to a voice channel".to_string(),
        MusicError::NothingPlaying => "No track is currently playing".to_string(),
        MusicError::NotPaused => "Playback is not paused".to_string(),
        MusicError::VolumeOutOfRange(_) => "Provide a number between 0 and 200".to_string(),
        MusicError::NoResults => "No results found".to_string(),
        other => other.to_string(),
    };

    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title("❌ Error")
                .description(description)
                .color(FAILURE),
        )
        .ephemeral(err.is_user_error())
}

/// Create an embed for a `play` request
pub fn enqueued(outcome: &EnqueueOutcome) -> CreateReply {
    match outcome {
        EnqueueOutcome::Playing(track) => {
            success("🎵 Now Playing", format!("**{}**", track.title))
        }
        EnqueueOutcome::Queued { track, position } => CreateReply::default().embed(
            CreateEmbed::new()
                .title("🎵 Added to Queue")
                .description(format!("**{}**", track.title))
                .field("Position", format!("`#{}`", position), true)
                .color(SUCCESS),
        ),
        EnqueueOutcome::Skipped(track) => CreateReply::default().embed(
            CreateEmbed::new()
                .title("❌ Error")
                .description(format!("Could not play **{}**", track.title))
                .color(FAILURE),
        ),
    }
}

/// Create an embed for `join`
pub fn joined(outcome: JoinOutcome, channel_id: ChannelId, bitrate: Option<u32>) -> CreateReply {
    let description = match outcome {
        JoinOutcome::Connected => format!("Joined <#{}>", channel_id),
        JoinOutcome::Moved => format!("Moved to <#{}>", channel_id),
        JoinOutcome::AlreadyConnected => format!("Already in <#{}>", channel_id),
    };

    let mut embed = CreateEmbed::new()
        .title("🔊 Voice")
        .description(description)
        .color(SUCCESS);

    if let Some(notice) = bitrate.and_then(bitrate_notice) {
        embed = embed.field("Audio quality", notice, false);
    }

    CreateReply::default().embed(embed)
}

/// Warning text for channels below `LOW_BITRATE`.
pub fn bitrate_notice(bitrate: u32) -> Option<String> {
    (bitrate < LOW_BITRATE).then(|| {
        format!(
            "This channel runs at {} kbps. Raise it to at least {} kbps for better audio.",
            bitrate / 1000,
            LOW_BITRATE / 1000
        )
    })
}

pub fn paused(track: &QueuedTrack) -> CreateReply {
    success("⏸️ Paused", format!("Paused **{}**", track.title))
}

pub fn resumed(track: &QueuedTrack) -> CreateReply {
    success("▶️ Resumed", format!("Resumed **{}**", track.title))
}

pub fn skipped(track: &QueuedTrack) -> CreateReply {
    success("⏭️ Skipped", format!("Skipped **{}**", track.title))
}

/// Create an embed for `disconnect`
pub fn disconnected(was_connected: bool) -> CreateReply {
    if was_connected {
        success(
            "👋 Left Voice Channel",
            "Disconnected and cleared the queue",
        )
    } else {
        success("👋 Disconnected", "I wasn't connected, nothing to clear")
    }
}

pub fn queue_cleared(removed: usize) -> CreateReply {
    success(
        "🧹 Queue Cleared",
        format!("Removed {} track{}", removed, if removed == 1 { "" } else { "s" }),
    )
}

pub fn volume_set(volume: f32) -> CreateReply {
    success(
        "🔊 Volume",
        format!("Volume set to {}%", (volume * 100.0).round() as i64),
    )
}

pub fn loop_toggled(enabled: bool) -> CreateReply {
    success("🔁 Loop", format!("Loop {}", on_off(enabled)))
}

pub fn sticky_toggled(enabled: bool) -> CreateReply {
    let description = if enabled {
        "24/7 mode enabled, I'll stay in voice"
    } else {
        "24/7 mode disabled"
    };
    success("🕒 24/7", description)
}

/// Numbered listing of the upcoming tracks.
pub fn queue_description(queue: &[QueuedTrack]) -> String {
    if queue.is_empty() {
        return "**📭 Queue is empty**".to_string();
    }

    let mut description = format!("**📋 Queue - {} tracks**\n", queue.len());
    for (index, track) in queue.iter().enumerate() {
        description.push_str(&format!("{}. {}\n", index + 1, track.title));
    }
    description
}

pub fn music_queue(snapshot: &SessionSnapshot) -> CreateReply {
    let mut description = String::new();
    match &snapshot.current {
        Some(now) => description.push_str(&format!("**🎵 Now Playing**\n{}\n\n", now.track.title)),
        None => description.push_str("**🔇 Nothing playing**\n\n"),
    }
    description.push_str(&queue_description(&snapshot.queue));

    CreateReply::default().embed(
        CreateEmbed::new()
            .title("🎵 Music Queue")
            .description(description)
            .color(SUCCESS),
    )
}

/// Title, pause marker, elapsed time and modes of the loaded track.
pub fn now_playing_description(
    now: &NowPlaying,
    state: PlaybackState,
    loop_enabled: bool,
    sticky: bool,
    at: DateTime<Utc>,
) -> String {
    let elapsed = (at - now.started_at).to_std().unwrap_or_default();
    let marker = if state == PlaybackState::Paused {
        " (paused)"
    } else {
        ""
    };

    format!(
        "**{}**{}\nElapsed: `{}`\nLoop: {} • 24/7: {}",
        now.track.title,
        marker,
        format_duration(elapsed),
        on_off(loop_enabled),
        on_off(sticky)
    )
}

pub fn now_playing(snapshot: &SessionSnapshot) -> CreateReply {
    let Some(now) = &snapshot.current else {
        return error(&MusicError::NothingPlaying);
    };

    success(
        "🎵 Now Playing",
        now_playing_description(
            now,
            snapshot.state,
            snapshot.loop_enabled,
            snapshot.sticky,
            Utc::now(),
        ),
    )
}

/// Create an embed for the warning shown when a prefixed message can't be deleted
pub fn cannot_delete_trigger() -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("⚠️ Warning")
            .description("I don't have permission to delete messages here")
            .color(FAILURE),
    )
}
