use async_trait::async_trait;
use serenity::all::{GuildId, RoleId};
use sqlx::PgPool;

use crate::bot::error::Error;
use crate::db::queries::guild_config;

/// Per-guild mute configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MuteSettings {
    pub mute_role: Option<RoleId>,
    /// Strip every other role while muted
    pub remove_roles_on_mute: bool,
}

#[async_trait]
pub trait MuteSettingsSource: Send + Sync {
    async fn mute_settings(&self, guild_id: GuildId) -> Result<MuteSettings, Error>;
}

/// Reads `guild_configs`, falling back to the process-wide default mute role
pub struct PgMuteSettings {
    pool: PgPool,
    default_mute_role: Option<RoleId>,
}

impl PgMuteSettings {
    pub fn new(pool: PgPool, default_mute_role: Option<RoleId>) -> Self {
        Self {
            pool,
            default_mute_role,
        }
    }
}

#[async_trait]
impl MuteSettingsSource for PgMuteSettings {
    async fn mute_settings(&self, guild_id: GuildId) -> Result<MuteSettings, Error> {
        let config = guild_config::get(&self.pool, guild_id.get() as i64).await?;

        Ok(MuteSettings {
            mute_role: config
                .as_ref()
                .and_then(|c| c.mute_role())
                .or(self.default_mute_role),
            remove_roles_on_mute: config.is_some_and(|c| c.remove_roles_on_mute),
        })
    }
}
