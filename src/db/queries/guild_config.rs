use sqlx::PgPool;

use crate::db::models::GuildConfig;

pub async fn get_or_create(pool: &PgPool, guild_id: i64) -> Result<GuildConfig, sqlx::Error> {
    let existing = get(pool, guild_id).await?;

    if let Some(config) = existing {
        return Ok(config);
    }

    sqlx::query_as::<_, GuildConfig>(
        r#"
        INSERT INTO guild_configs (guild_id)
        VALUES ($1)
        ON CONFLICT (guild_id) DO UPDATE SET guild_id = EXCLUDED.guild_id
        RETURNING *
        "#
    )
    .bind(guild_id)
    .fetch_one(pool)
    .await
}

pub async fn get(pool: &PgPool, guild_id: i64) -> Result<Option<GuildConfig>, sqlx::Error> {
    sqlx::query_as::<_, GuildConfig>(
        "SELECT * FROM guild_configs WHERE guild_id = $1"
    )
    .bind(guild_id)
    .fetch_optional(pool)
    .await
}

pub async fn set_mute_role(
    pool: &PgPool,
    guild_id: i64,
    role_id: i64,
) -> Result<GuildConfig, sqlx::Error> {
    get_or_create(pool, guild_id).await?;

    sqlx::query_as::<_, GuildConfig>(
        r#"
        UPDATE guild_configs
        SET mute_role_id = $2, updated_at = NOW()
        WHERE guild_id = $1
        RETURNING *
        "#
    )
    .bind(guild_id)
    .bind(role_id)
    .fetch_one(pool)
    .await
}

pub async fn set_log_channel(
    pool: &PgPool,
    guild_id: i64,
    channel_id: i64,
) -> Result<GuildConfig, sqlx::Error> {
    get_or_create(pool, guild_id).await?;

    sqlx::query_as::<_, GuildConfig>(
        r#"
        UPDATE guild_configs
        SET log_channel_id = $2, updated_at = NOW()
        WHERE guild_id = $1
        RETURNING *
        "#
    )
    .bind(guild_id)
    .bind(channel_id)
    .fetch_one(pool)
    .await
}

pub async fn set_remove_roles_on_mute(
    pool: &PgPool,
    guild_id: i64,
    enabled: bool,
) -> Result<GuildConfig, sqlx::Error> {
    get_or_create(pool, guild_id).await?;

    sqlx::query_as::<_, GuildConfig>(
        r#"
        UPDATE guild_configs
        SET remove_roles_on_mute = $2, updated_at = NOW()
        WHERE guild_id = $1
        RETURNING *
        "#
    )
    .bind(guild_id)
    .bind(enabled)
    .fetch_one(pool)
    .await
}
