use super::*;

/// Set the playback volume
#[poise::command(slash_command, prefix_command, guild_only, category = "Music")]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "Volume from 0 to 200"] percent: i64,
) -> CommandResult {
    let result = match session(ctx) {
        Ok(session) => session.set_volume(percent).await,
        Err(e) => Err(e),
    };
    respond(ctx, result, |volume| embedded_messages::volume_set(*volume)).await
}
