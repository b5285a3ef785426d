use super::*;

/// Show the track that is playing right now
#[poise::command(slash_command, prefix_command, guild_only, category = "Music")]
pub async fn nowplaying(ctx: Context<'_>) -> CommandResult {
    let result = match session(ctx) {
        Ok(session) => session.snapshot().await,
        Err(e) => Err(e),
    };
    respond(ctx, result, embedded_messages::now_playing).await
}
