use super::*;
use crate::commands::music::utils::music_manager::get_user_voice_channel;
use tracing::info;

/// Play a song from YouTube or a direct URL
#[poise::command(slash_command, prefix_command, guild_only, category = "Music")]
pub async fn play(
    ctx: Context<'_>,
    #[description = "URL or search query"]
    #[rest]
    query: String,
) -> CommandResult {
    info!("Received play command with query: {}", query);

    let result = async {
        let guild_id = guild_id(ctx)?;
        let voice_channel =
            get_user_voice_channel(ctx.serenity_context(), guild_id, ctx.author().id)?;

        // Defer the response since resolving might take time
        if let Err(e) = ctx.defer().await {
            warn!("Failed to defer play response: {}", e);
        }

        let data = ctx.data();
        data.sessions
            .play(
                guild_id,
                voice_channel,
                ctx.channel_id(),
                &query,
                data.resolver.as_ref(),
            )
            .await
    }
    .await;

    respond(ctx, result, |(_, outcome)| embedded_messages::enqueued(outcome)).await
}
