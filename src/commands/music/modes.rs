use super::*;

/// Toggle replaying the current track
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Music",
    rename = "loop"
)]
pub async fn toggle_loop(ctx: Context<'_>) -> CommandResult {
    let result = match session(ctx) {
        Ok(session) => session.toggle_loop().await,
        Err(e) => Err(e),
    };
    respond(ctx, result, |enabled| embedded_messages::loop_toggled(*enabled)).await
}

/// Toggle 24/7 mode, which keeps the bot in voice while idle
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Music",
    rename = "247"
)]
pub async fn twenty_four_seven(ctx: Context<'_>) -> CommandResult {
    let result = match session(ctx) {
        Ok(session) => session.toggle_sticky().await,
        Err(e) => Err(e),
    };
    respond(ctx, result, |enabled| embedded_messages::sticky_toggled(*enabled)).await
}
