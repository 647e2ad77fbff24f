use std::sync::Arc;

use poise::serenity_prelude::{GuildMemberUpdateEvent, Member};
use tracing::debug;

use crate::bot::data::Data;
use crate::bot::error::Error;

/// A member joined; put the mute role back if they left while muted
pub async fn handle_member_join(data: &Arc<Data>, member: &Member) -> Result<(), Error> {
    if member.user.bot {
        return Ok(());
    }

    let reapplied = data
        .mutes
        .reapply_mute_on_join(member.guild_id, member.user.id)
        .await?;
    if reapplied {
        debug!("User {} rejoined guild {} while muted", member.user.id, member.guild_id);
    }

    Ok(())
}

/// A member's roles changed; forget their mute if the mute role was taken off by hand
pub async fn handle_member_update(
    data: &Arc<Data>,
    old: Option<&Member>,
    event: &GuildMemberUpdateEvent,
) -> Result<(), Error> {
    let Some(mute_role) = data.mutes.settings(event.guild_id).await?.mute_role else {
        return Ok(());
    };

    if event.roles.contains(&mute_role) {
        return Ok(());
    }
    // Without the old member in cache we can't tell what changed; the
    // orchestrator re-checks the record and fresh member state either way
    if old.is_some_and(|old| !old.roles.contains(&mute_role)) {
        return Ok(());
    }

    data.mutes
        .clear_mute_on_role_removal(event.guild_id, event.user.id)
        .await?;

    Ok(())
}
