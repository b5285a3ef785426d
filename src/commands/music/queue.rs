use super::*;

/// View the current music queue
#[poise::command(slash_command, prefix_command, guild_only, category = "Music")]
pub async fn queue(ctx: Context<'_>) -> CommandResult {
    let result = match session(ctx) {
        Ok(session) => session.snapshot().await,
        Err(e) => Err(e),
    };
    respond(ctx, result, embedded_messages::music_queue).await
}

/// Remove every track waiting in the queue
#[poise::command(slash_command, prefix_command, guild_only, category = "Music")]
pub async fn cleanqueue(ctx: Context<'_>) -> CommandResult {
    let result = match session(ctx) {
        Ok(session) => session.clear_queue().await,
        Err(e) => Err(e),
    };
    respond(ctx, result, |removed| embedded_messages::queue_cleared(*removed)).await
}
