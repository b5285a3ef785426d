use std::sync::Arc;

use poise::serenity_prelude as serenity;
use tracing::{error, warn};

pub mod commands;
pub mod config;
pub mod events;

use commands::music::audio_sources::TrackResolver;
use commands::music::utils::embedded_messages;
use commands::music::utils::music_manager::SessionRegistry;
use config::Config;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

// User data, which is stored and accessible in all command invocations
pub struct Data {
    pub sessions: SessionRegistry,
    pub resolver: Arc<dyn TrackResolver>,
    pub config: Config,
}

#[poise::command(slash_command, category = "General")]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> CommandResult {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            show_context_menu_commands: true,
            ..Default::default()
        },
    )
    .await
    .map_err(|e| e.into())
}

#[poise::command(prefix_command, hide_in_help)]
pub async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx)
        .await
        .map_err(|e| e.into())
}

/// Deletes the chat message that triggered a prefixed command.
pub async fn delete_trigger(ctx: Context<'_>) {
    let poise::Context::Prefix(prefix) = ctx else {
        return;
    };

    if let Err(e) = prefix.msg.delete(ctx).await {
        warn!(
            "Could not delete command message {} in channel {}: {}",
            prefix.msg.id,
            prefix.msg.channel_id,
            e
        );
        if let Err(e) = ctx.send(embedded_messages::cannot_delete_trigger()).await {
            warn!("Could not send permission warning: {}", e);
        }
    }
}

pub async fn on_error(err: poise::FrameworkError<'_, Data, Error>) {
    match err {
        poise::FrameworkError::ArgumentParse { ctx, .. } if ctx.command().name == "volume" => {
            if let Err(e) = ctx.say("Provide a number between 0 and 200").await {
                warn!("Failed to send volume usage hint: {}", e);
            }
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {}", ctx.command().name, error);
            if let Err(e) = ctx.say("Something went wrong while running that command").await {
                warn!("Failed to send error notice: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling framework error: {}", e);
            }
        }
    }
}

/// Framework options shared by the binary and anything else embedding the bot.
pub fn framework_options(prefix: String) -> poise::FrameworkOptions<Data, Error> {
    use commands::music::{
        disconnect::*, join::*, modes::*, nowplaying::*, pause::*, play::*, queue::*, skip::*,
        volume::*,
    };

    poise::FrameworkOptions {
        commands: vec![
            // Default commands
            register(),
            help(),
            // Music commands
            play(),
            pause(),
            resume(),
            skip(),
            disconnect(),
            join(),
            queue(),
            cleanqueue(),
            volume(),
            toggle_loop(),
            nowplaying(),
            twenty_four_seven(),
        ],
        prefix_options: poise::PrefixFrameworkOptions {
            prefix: Some(prefix),
            case_insensitive_commands: true,
            ..Default::default()
        },
        pre_command: |ctx| Box::pin(delete_trigger(ctx)),
        on_error: |err| Box::pin(on_error(err)),
        event_handler: |ctx, event, _framework, data| {
            Box::pin(events::handle_event(ctx, event, data))
        },
        ..Default::default()
    }
}

/// Wires the shared state from a ready serenity context.
pub async fn build_data(ctx: &serenity::Context, config: Config) -> Result<Data, Error> {
    use commands::music::audio_sources::youtube::YtDlpResolver;
    use commands::music::utils::music_manager::{SessionSettings, get_songbird};
    use commands::music::utils::songbird_voice::{SerenityAnnouncer, SongbirdConnector};

    let songbird = get_songbird(ctx).await?;
    let http_client = reqwest::Client::new();

    let connector = SongbirdConnector::new(songbird, Arc::clone(&ctx.cache), http_client);
    let announcer = SerenityAnnouncer::new(Arc::clone(&ctx.http));
    let sessions = SessionRegistry::new(
        Arc::new(connector),
        Arc::new(announcer),
        SessionSettings::from(&config),
    );

    Ok(Data {
        sessions,
        resolver: Arc::new(YtDlpResolver::new(config.ytdlp_path.clone())),
        config,
    })
}
