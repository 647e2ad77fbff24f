use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serenity::all::{GuildId, RoleId, UserId};
use sqlx::PgPool;

use crate::bot::error::Error;
use crate::db::models::MuteRecord;
use crate::db::queries::mute;

/// Authoritative record of active mutes, one per guild member.
///
/// Each operation is atomic for a single member. Callers check for an
/// existing record before `add_mute`/`update_expiry_time`; skipping that
/// check is a bug and fails with a store inconsistency error.
#[async_trait]
pub trait MuteStore: Send + Sync {
    async fn find_existing_mute_for_user_id(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<Option<MuteRecord>, Error>;

    /// Fails with `Error::MuteAlreadyExists` if the member already has a record
    async fn add_mute(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        expires_at: Option<DateTime<Utc>>,
        roles_to_restore: &[RoleId],
        reason: Option<&str>,
    ) -> Result<MuteRecord, Error>;

    /// Fails with `Error::MuteNotFound` if the member has no record
    async fn update_expiry_time(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), Error>;

    /// Delete the member's record. Clearing a missing record is a no-op.
    async fn clear(&self, guild_id: GuildId, user_id: UserId) -> Result<(), Error>;

    /// Records in every guild that expired at or before `now`
    async fn get_expired_mutes(&self, now: DateTime<Utc>) -> Result<Vec<MuteRecord>, Error>;

    async fn get_active_mutes(&self, guild_id: GuildId) -> Result<Vec<MuteRecord>, Error>;
}

pub struct PgMuteStore {
    pool: PgPool,
}

impl PgMuteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MuteStore for PgMuteStore {
    async fn find_existing_mute_for_user_id(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<Option<MuteRecord>, Error> {
        Ok(mute::find(&self.pool, guild_id.get() as i64, user_id.get() as i64).await?)
    }

    async fn add_mute(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        expires_at: Option<DateTime<Utc>>,
        roles_to_restore: &[RoleId],
        reason: Option<&str>,
    ) -> Result<MuteRecord, Error> {
        let roles: Vec<i64> = roles_to_restore.iter().map(|id| id.get() as i64).collect();

        mute::create(
            &self.pool,
            guild_id.get() as i64,
            user_id.get() as i64,
            expires_at,
            &roles,
            reason,
        )
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => Error::MuteAlreadyExists {
                guild_id: guild_id.get(),
                user_id: user_id.get(),
            },
            other => Error::Database(other),
        })
    }

    async fn update_expiry_time(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), Error> {
        let updated = mute::update_expiry(
            &self.pool,
            guild_id.get() as i64,
            user_id.get() as i64,
            expires_at,
        )
        .await?;

        if !updated {
            return Err(Error::MuteNotFound {
                guild_id: guild_id.get(),
                user_id: user_id.get(),
            });
        }

        Ok(())
    }

    async fn clear(&self, guild_id: GuildId, user_id: UserId) -> Result<(), Error> {
        mute::delete(&self.pool, guild_id.get() as i64, user_id.get() as i64).await?;
        Ok(())
    }

    async fn get_expired_mutes(&self, now: DateTime<Utc>) -> Result<Vec<MuteRecord>, Error> {
        Ok(mute::get_expired(&self.pool, now).await?)
    }

    async fn get_active_mutes(&self, guild_id: GuildId) -> Result<Vec<MuteRecord>, Error> {
        Ok(mute::list_active_for_guild(&self.pool, guild_id.get() as i64).await?)
    }
}
