use super::*;
use crate::commands::music::utils::music_manager::get_user_voice_channel;
use poise::serenity_prelude::ChannelId;

/// Join your voice channel
#[poise::command(slash_command, prefix_command, guild_only, category = "Music")]
pub async fn join(ctx: Context<'_>) -> CommandResult {
    let result = async {
        let guild_id = guild_id(ctx)?;
        let voice_channel =
            get_user_voice_channel(ctx.serenity_context(), guild_id, ctx.author().id)?;

        if let Err(e) = ctx.defer().await {
            warn!("Failed to defer join response: {}", e);
        }

        let outcome = session(ctx)?.join(voice_channel, ctx.channel_id()).await?;
        Ok::<_, MusicError>((outcome, voice_channel))
    }
    .await;

    respond(ctx, result, |(outcome, channel_id)| {
        embedded_messages::joined(*outcome, *channel_id, channel_bitrate(ctx, *channel_id))
    })
    .await
}

fn channel_bitrate(ctx: Context<'_>, channel_id: ChannelId) -> Option<u32> {
    ctx.guild()?.channels.get(&channel_id)?.bitrate
}
