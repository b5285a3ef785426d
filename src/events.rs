use poise::serenity_prelude as serenity;
use serenity::all::{FullEvent, VoiceState};
use tracing::{debug, info};

use crate::{Data, Error};

pub async fn handle_event(
    ctx: &serenity::Context,
    event: &FullEvent,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            info!("{} is connected", data_about_bot.user.name);
        }
        FullEvent::VoiceStateUpdate { old, new } => {
            voice_state_update(ctx, old.as_ref(), new, data);
        }
        _ => (),
    }
    Ok(())
}

/// Someone moved in voice. Forward it to the guild's session, if any.
fn voice_state_update(
    ctx: &serenity::Context,
    old: Option<&VoiceState>,
    new: &VoiceState,
    data: &Data,
) {
    let Some(guild_id) = new.guild_id.or_else(|| old.and_then(|state| state.guild_id)) else {
        return;
    };
    let Some(session) = data.sessions.existing(guild_id) else {
        return;
    };

    if new.user_id == ctx.cache.current_user().id && new.channel_id.is_none() {
        debug!("Bot left voice in guild {}", guild_id);
        session.connection_lost();
    } else {
        session.listeners_changed();
    }
}
