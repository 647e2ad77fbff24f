use std::sync::Arc;
use std::time::Duration;

use poise::serenity_prelude::{self as serenity, GatewayIntents, GuildId};
use sqlx::PgPool;
use tracing::{error, info};

use crate::bot::data::Data;
use crate::bot::error::Error;
use crate::commands;
use crate::config::Settings;
use crate::handlers::event_handler::event_handler;
use crate::services::mutes::{events, sweeper};

pub async fn run(settings: Settings, pool: PgPool) -> Result<(), Error> {
    let token = settings.discord_token.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::setup::setup(),
                commands::mute::mute(),
                commands::mute::unmute(),
                commands::mute::mutes(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: None, // Slash commands only
                ..Default::default()
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Command error: {:?}", error);
                            let _ = ctx.say(format!("Error: {}", error)).await;
                        }
                        poise::FrameworkError::ArgumentParse { error, ctx, .. } => {
                            let _ = ctx.say(format!("Invalid argument: {}", error)).await;
                        }
                        poise::FrameworkError::MissingUserPermissions { ctx, .. } => {
                            let _ = ctx.say("You don't have permission to use this command.").await;
                        }
                        poise::FrameworkError::UnknownCommand { .. } => {
                            // Prefix commands are disabled; pings land here
                        }
                        err => {
                            error!("Framework error: {:?}", err);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot connected as {}", ready.user.name);

                let data = Arc::new(Data::new(
                    pool,
                    settings,
                    ctx.http.clone(),
                    ctx.cache.clone(),
                    ready.user.id,
                ));

                events::spawn_event_logger(data.events.subscribe());

                sweeper::spawn_expiry_sweeper(
                    data.mutes.clone(),
                    data.events.clone(),
                    Duration::from_secs(data.settings.mute_sweep_interval_seconds),
                );
                info!(
                    "Started expired mute sweeper (every {}s)",
                    data.settings.mute_sweep_interval_seconds
                );

                // Register commands globally or per-guild based on GUILD_ID env var
                match data.settings.guild_id {
                    Some(guild_id) => {
                        let guild_id = GuildId::new(guild_id);
                        poise::builtins::register_in_guild(ctx, &framework.options().commands, guild_id)
                            .await
                            .map_err(|e| {
                                error!("Failed to register guild commands for {}: {:?}", guild_id, e);
                                Error::Serenity(e)
                            })?;
                        info!(
                            "Registered {} commands in guild {}",
                            framework.options().commands.len(),
                            guild_id
                        );
                    }
                    None => {
                        poise::builtins::register_globally(ctx, &framework.options().commands)
                            .await
                            .map_err(|e| {
                                error!("Failed to register commands globally: {:?}", e);
                                Error::Serenity(e)
                            })?;
                        info!(
                            "Registered {} commands globally",
                            framework.options().commands.len()
                        );
                    }
                }

                Ok(data)
            })
        })
        .build();

    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_MEMBERS;

    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .map_err(Error::Serenity)?;

    info!("Starting Discord client...");
    client.start().await.map_err(Error::Serenity)
}
