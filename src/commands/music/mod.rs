pub mod audio_sources;
pub mod utils;

pub mod disconnect;
pub mod join;
pub mod modes;
pub mod nowplaying;
pub mod pause;
pub mod play;
pub mod queue;
pub mod skip;
pub mod volume;

use poise::CreateReply;
use poise::serenity_prelude::GuildId;
use tracing::{debug, warn};

use crate::{CommandResult, Context};
use utils::embedded_messages;
use utils::music_manager::{MusicError, MusicResult};
use utils::session_actor::SessionHandle;

fn guild_id(ctx: Context<'_>) -> MusicResult<GuildId> {
    ctx.guild_id().ok_or(MusicError::NotInGuild)
}

/// The invoking guild's session.
fn session(ctx: Context<'_>) -> MusicResult<SessionHandle> {
    Ok(ctx.data().sessions.session(guild_id(ctx)?))
}

/// Sends `render(value)` on success and an error embed otherwise.
async fn respond<T>(
    ctx: Context<'_>,
    result: MusicResult<T>,
    render: impl FnOnce(&T) -> CreateReply,
) -> CommandResult {
    let reply = match &result {
        Ok(value) => render(value),
        Err(err) => {
            if err.is_user_error() {
                debug!("`{}` rejected: {}", ctx.command().name, err);
            } else {
                warn!("`{}` failed: {}", ctx.command().name, err);
            }
            embedded_messages::error(err)
        }
    };

    ctx.send(reply).await?;
    Ok(())
}
