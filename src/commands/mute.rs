use poise::serenity_prelude::{CreateEmbedFooter, User};

use crate::bot::data::Context;
use crate::bot::error::Error;
use crate::constants::embeds;
use crate::constants::timeouts::MUTES_LIST_LIMIT;
use crate::services::mutes::CaseDetails;
use crate::utils::duration;
use crate::utils::formatting::{mention_user, relative_timestamp, truncate};

const LIST_REASON_MAX_LEN: usize = 60;

/// Mute a member with the guild's mute role
#[poise::command(slash_command, required_permissions = "MODERATE_MEMBERS", guild_only)]
pub async fn mute(
    ctx: Context<'_>,
    #[description = "Member to mute"] user: User,
    #[description = "How long, e.g. 30m, 2h, 1d12h (omit for indefinite)"] duration: Option<String>,
    #[description = "Reason for the mute"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    if user.bot {
        let embed = embeds::error_embed()
            .title("Cannot Mute")
            .description("Bots can't be muted.");
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        return Ok(());
    }

    let mute_time = duration.as_deref().map(duration::parse).transpose()?;

    ctx.defer_ephemeral().await?;

    let result = ctx
        .data()
        .mutes
        .mute_user(
            guild_id,
            user.id,
            mute_time,
            CaseDetails::by(ctx.author().id, reason),
        )
        .await?;
    ctx.data().events.publish(&result.events);

    let title = if result.updated_existing {
        "Mute Updated"
    } else {
        "User Muted"
    };
    let length = match mute_time.filter(|t| !t.is_zero()) {
        Some(t) => format!("for {}", duration::humanize(t)),
        None => "indefinitely".to_string(),
    };

    let embed = embeds::success_embed().title(title).description(format!(
        "{} has been muted {} (case #{}).",
        mention_user(user.id),
        length,
        result.case.case_number
    ));

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;

    Ok(())
}

/// Unmute a member now or after a delay
#[poise::command(slash_command, required_permissions = "MODERATE_MEMBERS", guild_only)]
pub async fn unmute(
    ctx: Context<'_>,
    #[description = "Member to unmute"] user: User,
    #[description = "Unmute after this long, e.g. 10m (omit to unmute now)"] delay: Option<String>,
    #[description = "Reason for the unmute"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    let unmute_time = delay.as_deref().map(duration::parse).transpose()?;

    ctx.defer_ephemeral().await?;

    let result = ctx
        .data()
        .mutes
        .unmute_user(
            guild_id,
            user.id,
            unmute_time,
            CaseDetails::by(ctx.author().id, reason),
        )
        .await?;

    let embed = match result {
        Some(result) => {
            ctx.data().events.publish(&result.events);

            match unmute_time.filter(|t| !t.is_zero()) {
                Some(t) => embeds::success_embed()
                    .title("Unmute Scheduled")
                    .description(format!(
                        "{} will be unmuted in {} (case #{}).",
                        mention_user(user.id),
                        duration::humanize(t),
                        result.case.case_number
                    )),
                None => embeds::success_embed()
                    .title("User Unmuted")
                    .description(format!(
                        "{} has been unmuted (case #{}).",
                        mention_user(user.id),
                        result.case.case_number
                    )),
            }
        }
        None => embeds::error_embed()
            .title("Not Muted")
            .description(format!("{} is not muted.", mention_user(user.id))),
    };

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;

    Ok(())
}

/// List the active mutes in this server
#[poise::command(slash_command, required_permissions = "MODERATE_MEMBERS", guild_only)]
pub async fn mutes(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    let mut active = ctx.data().mutes.active_mutes(guild_id).await?;

    if active.is_empty() {
        let embed = embeds::info_embed()
            .title("Active Mutes")
            .description("Nobody is muted right now.");
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        return Ok(());
    }

    // Soonest expiry first, indefinite mutes last
    active.sort_by_key(|record| (record.expires_at.is_none(), record.expires_at));
    let total = active.len();

    let lines: Vec<String> = active
        .iter()
        .take(MUTES_LIST_LIMIT)
        .map(|record| {
            let until = match record.expires_at {
                Some(at) => format!("expires {}", relative_timestamp(at)),
                None => "indefinite".to_string(),
            };
            match record.reason.as_deref() {
                Some(reason) => format!(
                    "{} ({}): {}",
                    mention_user(record.user()),
                    until,
                    truncate(reason, LIST_REASON_MAX_LEN)
                ),
                None => format!("{} ({})", mention_user(record.user()), until),
            }
        })
        .collect();

    let mut embed = embeds::standard_embed()
        .title(format!("Active Mutes ({})", total))
        .description(embeds::bullet_list(&lines));
    if total > MUTES_LIST_LIMIT {
        embed = embed.footer(CreateEmbedFooter::new(format!(
            "Showing {} of {}",
            MUTES_LIST_LIMIT, total
        )));
    }

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;

    Ok(())
}
