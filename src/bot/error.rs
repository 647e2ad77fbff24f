use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Discord API error: {0}")]
    Serenity(#[from] serenity::Error),

    #[error("No mute role configured for guild {0}")]
    MuteRoleNotConfigured(u64),

    #[error("User {user_id} already has a mute record in guild {guild_id}")]
    MuteAlreadyExists { guild_id: u64, user_id: u64 },

    #[error("User {user_id} has no mute record in guild {guild_id}")]
    MuteNotFound { guild_id: u64, user_id: u64 },

    #[error("Failed to update roles of user {user_id}: {reason}")]
    RoleMutation { user_id: u64, reason: String },

    #[error("Failed to create case: {0}")]
    CaseCreation(String),

    #[error("User not found: {0}")]
    UserNotFound(u64),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("{0}")]
    Custom(String),
}

impl Error {
    pub fn custom<S: Into<String>>(msg: S) -> Self {
        Error::Custom(msg.into())
    }
}
