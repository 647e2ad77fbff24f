use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serenity::all::{Cache, EditMember, GuildId, Http, Member, RoleId, User, UserId};
use serenity::http::HttpError;
use tracing::debug;

use crate::bot::error::Error;

/// Discord JSON error code for "Unknown Member"
const UNKNOWN_MEMBER: isize = 10007;
/// Discord JSON error code for "Unknown User"
const UNKNOWN_USER: isize = 10013;

/// The parts of a Discord user the moderation flow needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub id: UserId,
    pub tag: String,
}

impl UserSummary {
    /// Placeholder for a user that could not be fetched
    pub fn unknown(id: UserId) -> Self {
        Self {
            id,
            tag: format!("Unknown#{}", id),
        }
    }
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            tag: user.tag(),
        }
    }
}

/// A member's role state at the time it was fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSnapshot {
    pub user_id: UserId,
    pub roles: Vec<RoleId>,
}

impl MemberSnapshot {
    pub fn has_role(&self, role_id: RoleId) -> bool {
        self.roles.contains(&role_id)
    }
}

impl From<&Member> for MemberSnapshot {
    fn from(member: &Member) -> Self {
        Self {
            user_id: member.user.id,
            roles: member.roles.clone(),
        }
    }
}

/// Resolves users, members and guild roles
#[async_trait]
pub trait Directory: Send + Sync {
    async fn resolve_user(&self, user_id: UserId) -> Result<UserSummary, Error>;

    /// `Ok(None)` when the user is not (or no longer) a member of the guild.
    /// `force_fresh` skips the cache so role decisions never act on stale data.
    async fn resolve_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        force_fresh: bool,
    ) -> Result<Option<MemberSnapshot>, Error>;

    /// Roles that currently exist in the guild
    async fn guild_role_ids(&self, guild_id: GuildId) -> Result<HashSet<RoleId>, Error>;
}

/// Mutates a member's roles
#[async_trait]
pub trait MemberRoles: Send + Sync {
    async fn add_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<(), Error>;

    async fn remove_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<(), Error>;

    /// Replace the member's whole role set
    async fn set_roles(&self, guild_id: GuildId, user_id: UserId, roles: &[RoleId]) -> Result<(), Error>;
}

/// Directory and role mutation backed by the Discord API
pub struct DiscordDirectory {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl DiscordDirectory {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>) -> Self {
        Self { http, cache }
    }
}

/// Whether a Discord error means the user or member does not exist
fn is_unknown_entity(err: &serenity::Error) -> bool {
    match err {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => {
            response.error.code == UNKNOWN_MEMBER || response.error.code == UNKNOWN_USER
        }
        _ => false,
    }
}

fn role_mutation_error(user_id: UserId, err: serenity::Error) -> Error {
    Error::RoleMutation {
        user_id: user_id.get(),
        reason: err.to_string(),
    }
}

#[async_trait]
impl Directory for DiscordDirectory {
    async fn resolve_user(&self, user_id: UserId) -> Result<UserSummary, Error> {
        if let Some(user) = self.cache.user(user_id) {
            return Ok(UserSummary::from(&*user));
        }

        match self.http.get_user(user_id).await {
            Ok(user) => Ok(UserSummary::from(&user)),
            Err(e) if is_unknown_entity(&e) => Err(Error::UserNotFound(user_id.get())),
            Err(e) => Err(Error::Serenity(e)),
        }
    }

    async fn resolve_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        force_fresh: bool,
    ) -> Result<Option<MemberSnapshot>, Error> {
        if !force_fresh {
            if let Some(member) = self.cache.member(guild_id, user_id) {
                return Ok(Some(MemberSnapshot::from(&*member)));
            }
        }

        match self.http.get_member(guild_id, user_id).await {
            Ok(member) => Ok(Some(MemberSnapshot::from(&member))),
            Err(e) if is_unknown_entity(&e) => {
                debug!("User {} is not a member of guild {}", user_id, guild_id);
                Ok(None)
            }
            Err(e) => Err(Error::Serenity(e)),
        }
    }

    async fn guild_role_ids(&self, guild_id: GuildId) -> Result<HashSet<RoleId>, Error> {
        if let Some(guild) = self.cache.guild(guild_id) {
            return Ok(guild.roles.keys().copied().collect());
        }

        let roles = self.http.get_guild_roles(guild_id).await?;
        Ok(roles.into_iter().map(|role| role.id).collect())
    }
}

#[async_trait]
impl MemberRoles for DiscordDirectory {
    async fn add_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<(), Error> {
        self.http
            .add_member_role(guild_id, user_id, role_id, Some("Muted"))
            .await
            .map_err(|e| role_mutation_error(user_id, e))
    }

    async fn remove_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<(), Error> {
        self.http
            .remove_member_role(guild_id, user_id, role_id, Some("Unmuted"))
            .await
            .map_err(|e| role_mutation_error(user_id, e))
    }

    async fn set_roles(&self, guild_id: GuildId, user_id: UserId, roles: &[RoleId]) -> Result<(), Error> {
        let edit = EditMember::new().roles(roles.iter().copied());

        guild_id
            .edit_member(self.http.as_ref(), user_id, edit)
            .await
            .map(|_| ())
            .map_err(|e| role_mutation_error(user_id, e))
    }
}
