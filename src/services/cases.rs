use async_trait::async_trait;
use serenity::all::{GuildId, UserId};
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::bot::error::Error;
use crate::db::models::{Case, CaseType};
use crate::db::queries::case;

/// Attempts at allocating a case number before giving up
const CASE_NUMBER_ATTEMPTS: usize = 3;

/// Everything the ledger needs to record a case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseArgs {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub mod_id: UserId,
    pub case_type: CaseType,
    pub reason: Option<String>,
    pub note_details: Vec<String>,
}

/// Assigns case numbers and persists moderation history
#[async_trait]
pub trait CaseLedger: Send + Sync {
    async fn create_case(&self, args: CaseArgs) -> Result<Case, Error>;
}

pub struct PgCaseLedger {
    pool: PgPool,
}

impl PgCaseLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CaseLedger for PgCaseLedger {
    async fn create_case(&self, args: CaseArgs) -> Result<Case, Error> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            let result = case::create(
                &self.pool,
                args.guild_id.get() as i64,
                args.user_id.get() as i64,
                args.mod_id.get() as i64,
                args.case_type,
                args.reason.as_deref(),
                &args.note_details,
            )
            .await;

            match result {
                Ok(created) => {
                    debug!(
                        "Created {} case #{} for user {} in guild {}",
                        created.case_type, created.case_number, args.user_id, args.guild_id
                    );
                    return Ok(created);
                }
                Err(sqlx::Error::Database(e))
                    if e.is_unique_violation() && attempt < CASE_NUMBER_ATTEMPTS =>
                {
                    warn!(
                        "Case number collision in guild {}, retrying (attempt {})",
                        args.guild_id, attempt
                    );
                }
                Err(e) => return Err(Error::Database(e)),
            }
        }
    }
}
