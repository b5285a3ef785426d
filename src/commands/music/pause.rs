use super::*;

/// Pause the current track
#[poise::command(slash_command, prefix_command, guild_only, category = "Music")]
pub async fn pause(ctx: Context<'_>) -> CommandResult {
    let result = match session(ctx) {
        Ok(session) => session.pause().await,
        Err(e) => Err(e),
    };
    respond(ctx, result, embedded_messages::paused).await
}

/// Resume the paused track
#[poise::command(slash_command, prefix_command, guild_only, category = "Music")]
pub async fn resume(ctx: Context<'_>) -> CommandResult {
    let result = match session(ctx) {
        Ok(session) => session.resume().await,
        Err(e) => Err(e),
    };
    respond(ctx, result, embedded_messages::resumed).await
}
