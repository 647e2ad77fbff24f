use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::db::models::MuteRecord;

pub async fn find(
    pool: &PgPool,
    guild_id: i64,
    user_id: i64,
) -> Result<Option<MuteRecord>, sqlx::Error> {
    sqlx::query_as::<_, MuteRecord>("SELECT * FROM mutes WHERE guild_id = $1 AND user_id = $2")
        .bind(guild_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Insert a new mute. Fails with a unique violation if the member already has one.
pub async fn create(
    pool: &PgPool,
    guild_id: i64,
    user_id: i64,
    expires_at: Option<DateTime<Utc>>,
    roles_to_restore: &[i64],
    reason: Option<&str>,
) -> Result<MuteRecord, sqlx::Error> {
    sqlx::query_as::<_, MuteRecord>(
        r#"
        INSERT INTO mutes (guild_id, user_id, expires_at, roles_to_restore, reason)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#
    )
    .bind(guild_id)
    .bind(user_id)
    .bind(expires_at)
    .bind(roles_to_restore)
    .bind(reason)
    .fetch_one(pool)
    .await
}

/// Returns false when there was no mute to update
pub async fn update_expiry(
    pool: &PgPool,
    guild_id: i64,
    user_id: i64,
    expires_at: Option<DateTime<Utc>>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE mutes SET expires_at = $3 WHERE guild_id = $1 AND user_id = $2"
    )
    .bind(guild_id)
    .bind(user_id)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &PgPool, guild_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM mutes WHERE guild_id = $1 AND user_id = $2")
        .bind(guild_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Mutes in every guild whose expiry is at or before `now`
pub async fn get_expired(
    pool: &PgPool,
    now: DateTime<Utc>,
) -> Result<Vec<MuteRecord>, sqlx::Error> {
    sqlx::query_as::<_, MuteRecord>(
        r#"
        SELECT * FROM mutes
        WHERE expires_at IS NOT NULL AND expires_at <= $1
        ORDER BY expires_at ASC
        "#
    )
    .bind(now)
    .fetch_all(pool)
    .await
}

pub async fn list_active_for_guild(
    pool: &PgPool,
    guild_id: i64,
) -> Result<Vec<MuteRecord>, sqlx::Error> {
    sqlx::query_as::<_, MuteRecord>(
        r#"
        SELECT * FROM mutes
        WHERE guild_id = $1
        ORDER BY expires_at ASC NULLS LAST, created_at ASC
        "#
    )
    .bind(guild_id)
    .fetch_all(pool)
    .await
}
