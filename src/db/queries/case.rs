use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{Case, CaseType};

/// Insert a case with the next case number for the guild.
///
/// Two concurrent inserts can race on the number; the loser gets a unique
/// violation and is expected to retry.
pub async fn create(
    pool: &PgPool,
    guild_id: i64,
    user_id: i64,
    mod_id: i64,
    case_type: CaseType,
    reason: Option<&str>,
    notes: &[String],
) -> Result<Case, sqlx::Error> {
    sqlx::query_as::<_, Case>(
        r#"
        INSERT INTO cases (id, guild_id, case_number, user_id, mod_id, case_type, reason, notes)
        VALUES (
            $1, $2,
            (SELECT COALESCE(MAX(case_number), 0) + 1 FROM cases WHERE guild_id = $2),
            $3, $4, $5, $6, $7
        )
        RETURNING *
        "#
    )
    .bind(Uuid::new_v4())
    .bind(guild_id)
    .bind(user_id)
    .bind(mod_id)
    .bind(case_type)
    .bind(reason)
    .bind(notes)
    .fetch_one(pool)
    .await
}
