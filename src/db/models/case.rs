use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "case_type", rename_all = "lowercase")]
pub enum CaseType {
    Mute,
    Unmute,
}

impl CaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseType::Mute => "mute",
            CaseType::Unmute => "unmute",
        }
    }
}

impl std::fmt::Display for CaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A moderation case. Case numbers are sequential per guild.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Case {
    pub id: Uuid,
    pub guild_id: i64,
    pub case_number: i32,
    pub user_id: i64,
    pub mod_id: i64,
    pub case_type: CaseType,
    pub reason: Option<String>,
    pub notes: Vec<String>,
    pub created_at: DateTime<Utc>,
}
