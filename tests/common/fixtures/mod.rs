//! Test fixtures for the jukebox bot
//! This module contains sample ids and tracks used in tests

use jukebox::commands::music::audio_sources::track_metadata::QueuedTrack;
use poise::serenity_prelude::{ChannelId, GuildId};

/// Sample guild ID for testing
pub const SAMPLE_GUILD_ID: u64 = 123456789;

/// Sample voice channel ID for testing
pub const SAMPLE_VOICE_CHANNEL_ID: u64 = 555555555;

/// Sample text channel ID for testing
pub const SAMPLE_TEXT_CHANNEL_ID: u64 = 987654321;

pub fn guild() -> GuildId {
    GuildId::new(SAMPLE_GUILD_ID)
}

pub fn other_guild() -> GuildId {
    GuildId::new(SAMPLE_GUILD_ID + 1)
}

pub fn voice_channel() -> ChannelId {
    ChannelId::new(SAMPLE_VOICE_CHANNEL_ID)
}

pub fn other_voice_channel() -> ChannelId {
    ChannelId::new(SAMPLE_VOICE_CHANNEL_ID + 1)
}

pub fn text_channel() -> ChannelId {
    ChannelId::new(SAMPLE_TEXT_CHANNEL_ID)
}

/// A track whose title and URL derive from `name`.
pub fn track(name: &str) -> QueuedTrack {
    QueuedTrack::new(
        format!("https://cdn.example.com/audio/{name}.webm"),
        Some(name.to_string()),
    )
}
