use std::sync::Arc;

use serenity::all::{CreateEmbed, CreateMessage, GuildId, Http};
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::bot::error::Error;
use crate::constants::embeds;
use crate::db::queries::guild_config;
use crate::services::directory::UserSummary;
use crate::utils::formatting::mention_user;

/// A moderation action worth reporting to the guild's log channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModLogEntry {
    MemberMute {
        guild_id: GuildId,
        moderator: UserSummary,
        user: UserSummary,
        case_number: i32,
        reason: String,
    },
    MemberTimedMute {
        guild_id: GuildId,
        moderator: UserSummary,
        user: UserSummary,
        case_number: i32,
        time: String,
        reason: String,
    },
    MemberUnmute {
        guild_id: GuildId,
        moderator: UserSummary,
        user: UserSummary,
        case_number: i32,
        reason: String,
    },
    MemberTimedUnmute {
        guild_id: GuildId,
        moderator: UserSummary,
        user: UserSummary,
        case_number: i32,
        time: String,
        reason: String,
    },
}

impl ModLogEntry {
    pub fn guild_id(&self) -> GuildId {
        match self {
            ModLogEntry::MemberMute { guild_id, .. }
            | ModLogEntry::MemberTimedMute { guild_id, .. }
            | ModLogEntry::MemberUnmute { guild_id, .. }
            | ModLogEntry::MemberTimedUnmute { guild_id, .. } => *guild_id,
        }
    }

    /// Render the entry as a log channel embed
    pub fn to_embed(&self) -> CreateEmbed {
        let (embed, title, description, case_number, reason) = match self {
            ModLogEntry::MemberMute { moderator, user, case_number, reason, .. } => (
                embeds::warning_embed(),
                "Member Muted",
                format!("{} ({}) was muted indefinitely by {}", mention_user(user.id), user.tag, moderator.tag),
                case_number,
                reason,
            ),
            ModLogEntry::MemberTimedMute { moderator, user, case_number, time, reason, .. } => (
                embeds::warning_embed(),
                "Member Muted",
                format!("{} ({}) was muted for **{}** by {}", mention_user(user.id), user.tag, time, moderator.tag),
                case_number,
                reason,
            ),
            ModLogEntry::MemberUnmute { moderator, user, case_number, reason, .. } => (
                embeds::success_embed(),
                "Member Unmuted",
                format!("{} ({}) was unmuted by {}", mention_user(user.id), user.tag, moderator.tag),
                case_number,
                reason,
            ),
            ModLogEntry::MemberTimedUnmute { moderator, user, case_number, time, reason, .. } => (
                embeds::info_embed(),
                "Unmute Scheduled",
                format!("{} ({}) will be unmuted in **{}** ({})", mention_user(user.id), user.tag, time, moderator.tag),
                case_number,
                reason,
            ),
        };

        let reason = if reason.is_empty() { "No reason given" } else { reason.as_str() };

        embed
            .title(title)
            .description(description)
            .field("Case", format!("#{}", case_number), true)
            .field("Reason", reason, true)
    }
}

/// Fire-and-forget sink for moderation log lines.
///
/// Implementations must never block the caller or surface delivery errors.
pub trait ModLog: Send + Sync {
    fn log(&self, entry: ModLogEntry);
}

/// Posts log entries to the guild's configured log channel
pub struct DiscordModLog {
    http: Arc<Http>,
    pool: PgPool,
}

impl DiscordModLog {
    pub fn new(http: Arc<Http>, pool: PgPool) -> Self {
        Self { http, pool }
    }
}

impl ModLog for DiscordModLog {
    fn log(&self, entry: ModLogEntry) {
        let http = self.http.clone();
        let pool = self.pool.clone();

        tokio::spawn(async move {
            if let Err(e) = post_entry(&http, &pool, &entry).await {
                warn!("Failed to post mod log entry for guild {}: {:?}", entry.guild_id(), e);
            }
        });
    }
}

async fn post_entry(http: &Http, pool: &PgPool, entry: &ModLogEntry) -> Result<(), Error> {
    let guild_id = entry.guild_id();
    let config = guild_config::get(pool, guild_id.get() as i64).await?;

    let Some(channel_id) = config.and_then(|c| c.log_channel()) else {
        debug!("No log channel configured for guild {}, skipping mod log", guild_id);
        return Ok(());
    };

    channel_id
        .send_message(http, CreateMessage::new().embed(entry.to_embed()))
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenity::all::UserId;

    fn summary(id: u64, tag: &str) -> UserSummary {
        UserSummary {
            id: UserId::new(id),
            tag: tag.to_string(),
        }
    }

    #[test]
    fn test_timed_mute_embed() {
        let entry = ModLogEntry::MemberTimedMute {
            guild_id: GuildId::new(1),
            moderator: summary(2, "mod#0001"),
            user: summary(3, "someone#1234"),
            case_number: 7,
            time: "2 hours".to_string(),
            reason: String::new(),
        };
        assert_eq!(entry.guild_id(), GuildId::new(1));

        let embed = serde_json::to_value(entry.to_embed()).unwrap();
        assert_eq!(embed["title"], "Member Muted");
        assert_eq!(
            embed["description"],
            "<@3> (someone#1234) was muted for **2 hours** by mod#0001"
        );
        assert_eq!(embed["fields"][0]["value"], "#7");
        assert_eq!(embed["fields"][1]["value"], "No reason given");
    }

    #[test]
    fn test_unmute_embed_keeps_reason() {
        let entry = ModLogEntry::MemberUnmute {
            guild_id: GuildId::new(1),
            moderator: summary(2, "mod#0001"),
            user: summary(3, "someone#1234"),
            case_number: 8,
            reason: "Appeal accepted".to_string(),
        };

        let embed = serde_json::to_value(entry.to_embed()).unwrap();
        assert_eq!(embed["title"], "Member Unmuted");
        assert_eq!(embed["fields"][1]["value"], "Appeal accepted");
    }
}
