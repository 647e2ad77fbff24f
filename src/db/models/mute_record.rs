use chrono::{DateTime, Utc};
use serenity::all::{GuildId, RoleId, UserId};

/// An active mute. At most one exists per guild member.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MuteRecord {
    pub guild_id: i64,
    pub user_id: i64,
    /// `None` means the mute never expires on its own
    pub expires_at: Option<DateTime<Utc>>,
    /// Roles the member held when muted, never including the mute role
    pub roles_to_restore: Vec<i64>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MuteRecord {
    pub fn guild(&self) -> GuildId {
        GuildId::new(self.guild_id as u64)
    }

    pub fn user(&self) -> UserId {
        UserId::new(self.user_id as u64)
    }

    pub fn roles_to_restore(&self) -> Vec<RoleId> {
        self.roles_to_restore
            .iter()
            .map(|id| RoleId::new(*id as u64))
            .collect()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    pub fn is_indefinite(&self) -> bool {
        self.expires_at.is_none()
    }
}
