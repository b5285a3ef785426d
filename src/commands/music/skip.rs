use super::*;

/// Skip the currently playing song
#[poise::command(slash_command, prefix_command, guild_only, category = "Music")]
pub async fn skip(ctx: Context<'_>) -> CommandResult {
    let result = match session(ctx) {
        Ok(session) => session.skip().await,
        Err(e) => Err(e),
    };
    respond(ctx, result, embedded_messages::skipped).await
}
