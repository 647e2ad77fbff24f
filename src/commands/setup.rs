use poise::serenity_prelude::{Channel, Role};

use crate::bot::data::Context;
use crate::bot::error::Error;
use crate::constants::embeds;
use crate::db::queries::guild_config;
use crate::utils::formatting::{mention_channel, mention_role};

/// Setup commands for configuring muting
#[poise::command(
    slash_command,
    subcommands("mute_role", "log_channel", "remove_roles_on_mute"),
    required_permissions = "ADMINISTRATOR",
    guild_only
)]
pub async fn setup(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say("Use one of the subcommands: `/setup mute-role`, `/setup log-channel`, `/setup remove-roles-on-mute`").await?;
    Ok(())
}

/// Set the role given to muted members
#[poise::command(slash_command, rename = "mute-role", guild_only)]
pub async fn mute_role(
    ctx: Context<'_>,
    #[description = "Role that prevents members from talking"] role: Role,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    if role.id.get() == guild_id.get() {
        let embed = embeds::error_embed()
            .title("Invalid Role")
            .description("@everyone can't be used as the mute role.");
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        return Ok(());
    }

    guild_config::set_mute_role(&ctx.data().pool, guild_id.get() as i64, role.id.get() as i64)
        .await?;

    let embed = embeds::success_embed()
        .title("Mute Role Set")
        .description(format!("Muted members will get {}", mention_role(role.id)));

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;

    Ok(())
}

/// Set the channel that mute and unmute actions are logged to
#[poise::command(slash_command, rename = "log-channel", guild_only)]
pub async fn log_channel(
    ctx: Context<'_>,
    #[description = "Text channel for moderation logs"]
    #[channel_types("Text")]
    channel: Channel,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    guild_config::set_log_channel(
        &ctx.data().pool,
        guild_id.get() as i64,
        channel.id().get() as i64,
    )
    .await?;

    let embed = embeds::success_embed()
        .title("Log Channel Set")
        .description(format!(
            "Moderation logs will be posted in {}",
            mention_channel(channel.id().get())
        ));

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;

    Ok(())
}

/// Choose whether muting strips a member's other roles until unmute
#[poise::command(slash_command, rename = "remove-roles-on-mute", guild_only)]
pub async fn remove_roles_on_mute(
    ctx: Context<'_>,
    #[description = "Remove other roles while muted"] enabled: bool,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    guild_config::set_remove_roles_on_mute(&ctx.data().pool, guild_id.get() as i64, enabled)
        .await?;

    let description = if enabled {
        "Muting will remove a member's roles and restore them on unmute."
    } else {
        "Muting will only add the mute role."
    };
    let embed = embeds::success_embed()
        .title("Mute Behaviour Updated")
        .description(description);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;

    Ok(())
}
