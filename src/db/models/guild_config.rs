use chrono::{DateTime, Utc};
use serenity::all::{ChannelId, RoleId};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GuildConfig {
    pub guild_id: i64,
    pub mute_role_id: Option<i64>,
    pub log_channel_id: Option<i64>,
    pub remove_roles_on_mute: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GuildConfig {
    pub fn mute_role(&self) -> Option<RoleId> {
        self.mute_role_id.map(|id| RoleId::new(id as u64))
    }

    pub fn log_channel(&self) -> Option<ChannelId> {
        self.log_channel_id.map(|id| ChannelId::new(id as u64))
    }
}
