use super::*;

/// Leave the voice channel and clear the queue
#[poise::command(slash_command, prefix_command, guild_only, category = "Music")]
pub async fn disconnect(ctx: Context<'_>) -> CommandResult {
    let result = match session(ctx) {
        Ok(session) => session.disconnect().await,
        Err(e) => Err(e),
    };
    respond(ctx, result, |was_connected| {
        embedded_messages::disconnected(*was_connected)
    })
    .await
}
