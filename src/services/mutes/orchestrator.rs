use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serenity::all::{GuildId, RoleId, UserId};
use tracing::{debug, error, info, warn};

use crate::bot::error::Error;
use crate::db::models::{Case, CaseType, MuteRecord};
use crate::services::cases::{CaseArgs, CaseLedger};
use crate::services::directory::{Directory, MemberRoles, MemberSnapshot, UserSummary};
use crate::services::logs::{ModLog, ModLogEntry};
use crate::services::mutes::events::MuteEvent;
use crate::services::mutes::lock::{member_roles_lock, LockManager};
use crate::services::mutes::reconcile::{capture_roles_to_restore, compute_restored_roles};
use crate::services::mutes::settings::{MuteSettings, MuteSettingsSource};
use crate::services::mutes::store::MuteStore;
use crate::utils::duration::humanize;

/// Who is acting and why. Missing moderator means the bot itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseDetails {
    pub mod_id: Option<UserId>,
    pub reason: Option<String>,
}

impl CaseDetails {
    pub fn by(mod_id: UserId, reason: Option<String>) -> Self {
        Self {
            mod_id: Some(mod_id),
            reason,
        }
    }

    /// An action taken by the bot on its own
    pub fn automatic(reason: impl Into<String>) -> Self {
        Self {
            mod_id: None,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MuteResult {
    pub case: Case,
    pub record: MuteRecord,
    /// An existing mute had its expiry changed instead of a new one being created
    pub updated_existing: bool,
    pub events: Vec<MuteEvent>,
}

#[derive(Debug, Clone)]
pub struct UnmuteResult {
    pub case: Case,
    /// Empty for scheduled unmutes; their event fires when the mute expires
    pub events: Vec<MuteEvent>,
}

/// Outcome of one pass over expired mutes
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub unmuted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub events: Vec<MuteEvent>,
}

/// What changed inside the member lock during an unmute
#[derive(Debug, Clone, Copy)]
enum UnmuteTransition {
    Scheduled { had_record: bool },
    Unmuted { had_record: bool },
}

/// A member counts as muted if they have a mute record or hold the mute role.
///
/// With no record and no resolvable member there is nothing to act on.
fn is_considered_muted(
    existing: Option<&MuteRecord>,
    member: Option<&MemberSnapshot>,
    mute_role: Option<RoleId>,
) -> bool {
    if existing.is_some() {
        return true;
    }

    match (member, mute_role) {
        (Some(member), Some(role)) => member.has_role(role),
        _ => false,
    }
}

/// Without a cut-off any state counts; with one, only a record expired by then
fn is_due(existing: Option<&MuteRecord>, due_by: Option<DateTime<Utc>>) -> bool {
    match due_by {
        Some(now) => existing.is_some_and(|record| record.is_expired(now)),
        None => true,
    }
}

fn expiry_from_now(duration: Duration) -> Result<DateTime<Utc>, Error> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| Utc::now().checked_add_signed(d))
        .ok_or_else(|| Error::InvalidDuration(format!("{} is too long", humanize(duration))))
}

/// Applies and lifts mutes.
///
/// Every role change and mute-record write for a member happens under that
/// member's lock. State read before taking the lock is only used to bail out
/// early; the decision is made again on fresh state once the lock is held.
pub struct MuteOrchestrator {
    store: Arc<dyn MuteStore>,
    directory: Arc<dyn Directory>,
    roles: Arc<dyn MemberRoles>,
    cases: Arc<dyn CaseLedger>,
    mod_log: Arc<dyn ModLog>,
    settings: Arc<dyn MuteSettingsSource>,
    locks: LockManager,
    bot_user_id: UserId,
}

impl MuteOrchestrator {
    pub fn new(
        store: Arc<dyn MuteStore>,
        directory: Arc<dyn Directory>,
        roles: Arc<dyn MemberRoles>,
        cases: Arc<dyn CaseLedger>,
        mod_log: Arc<dyn ModLog>,
        settings: Arc<dyn MuteSettingsSource>,
        bot_user_id: UserId,
    ) -> Self {
        Self {
            store,
            directory,
            roles,
            cases,
            mod_log,
            settings,
            locks: LockManager::new(),
            bot_user_id,
        }
    }

    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    pub async fn settings(&self, guild_id: GuildId) -> Result<MuteSettings, Error> {
        self.settings.mute_settings(guild_id).await
    }

    pub async fn active_mutes(&self, guild_id: GuildId) -> Result<Vec<MuteRecord>, Error> {
        self.store.get_active_mutes(guild_id).await
    }

    /// Mute a member, indefinitely or for `mute_time`.
    ///
    /// Muting an already muted member updates the existing record's expiry.
    pub async fn mute_user(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        mute_time: Option<Duration>,
        details: CaseDetails,
    ) -> Result<MuteResult, Error> {
        let mute_time = mute_time.filter(|t| !t.is_zero());
        let settings = self.settings.mute_settings(guild_id).await?;
        let mute_role = settings
            .mute_role
            .ok_or(Error::MuteRoleNotConfigured(guild_id.get()))?;
        let expires_at = mute_time.map(expiry_from_now).transpose()?;

        let user = self.user_summary(user_id).await;
        let mod_id = details.mod_id.unwrap_or(self.bot_user_id);

        let lock = self.locks.acquire(member_roles_lock(guild_id, user_id)).await;
        let applied = self
            .apply_mute(
                guild_id,
                user_id,
                mute_role,
                settings.remove_roles_on_mute,
                expires_at,
                details.reason.as_deref(),
            )
            .await;
        lock.release();
        let (record, updated_existing) = applied?;

        let time_until_unmute = mute_time.map(humanize);
        let note = match (&time_until_unmute, updated_existing) {
            (Some(time), false) => format!("Muted for {}", time),
            (None, false) => "Muted indefinitely".to_string(),
            (Some(time), true) => format!("Mute updated to {}", time),
            (None, true) => "Mute updated to indefinite".to_string(),
        };

        let case = self
            .create_case(CaseArgs {
                guild_id,
                user_id,
                mod_id,
                case_type: CaseType::Mute,
                reason: details.reason.clone(),
                note_details: vec![note],
            })
            .await?;

        let moderator = self.user_summary(mod_id).await;
        let reason = details.reason.clone().unwrap_or_default();
        self.mod_log.log(match time_until_unmute {
            Some(time) => ModLogEntry::MemberTimedMute {
                guild_id,
                moderator,
                user,
                case_number: case.case_number,
                time,
                reason,
            },
            None => ModLogEntry::MemberMute {
                guild_id,
                moderator,
                user,
                case_number: case.case_number,
                reason,
            },
        });

        info!(
            "Muted user {} in guild {} until {:?} (case #{})",
            user_id, guild_id, record.expires_at, case.case_number
        );

        Ok(MuteResult {
            events: vec![MuteEvent::Mute {
                guild_id: guild_id.get(),
                user_id: user_id.get(),
                reason: details.reason,
                expires_at: record.expires_at,
            }],
            case,
            record,
            updated_existing,
        })
    }

    /// Must be called with the member lock held
    async fn apply_mute(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        mute_role: RoleId,
        remove_roles_on_mute: bool,
        expires_at: Option<DateTime<Utc>>,
        reason: Option<&str>,
    ) -> Result<(MuteRecord, bool), Error> {
        let existing = self.store.find_existing_mute_for_user_id(guild_id, user_id).await?;
        let member = self.directory.resolve_member(guild_id, user_id, true).await?;

        let mut roles_to_restore = Vec::new();
        match &member {
            Some(member) if !member.has_role(mute_role) => {
                roles_to_restore = capture_roles_to_restore(&member.roles, Some(mute_role));
                // An existing record keeps its original roles, so stripping now would lose these
                if remove_roles_on_mute && existing.is_none() {
                    self.roles.set_roles(guild_id, user_id, &[mute_role]).await?;
                } else {
                    self.roles.add_role(guild_id, user_id, mute_role).await?;
                }
            }
            Some(_) => debug!("User {} already has the mute role in guild {}", user_id, guild_id),
            None => debug!(
                "User {} is not in guild {}, recording mute to apply on join",
                user_id, guild_id
            ),
        }

        match existing {
            Some(_) => {
                self.store.update_expiry_time(guild_id, user_id, expires_at).await?;
                let record = self
                    .store
                    .find_existing_mute_for_user_id(guild_id, user_id)
                    .await?
                    .ok_or(Error::MuteNotFound {
                        guild_id: guild_id.get(),
                        user_id: user_id.get(),
                    })?;
                Ok((record, true))
            }
            None => {
                let record = self
                    .store
                    .add_mute(guild_id, user_id, expires_at, &roles_to_restore, reason)
                    .await?;
                Ok((record, false))
            }
        }
    }

    /// Unmute a member now, or schedule the unmute `unmute_time` from now.
    ///
    /// Returns `Ok(None)` when the member is not muted; nothing is written
    /// and no case is created in that case.
    pub async fn unmute_user(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        unmute_time: Option<Duration>,
        details: CaseDetails,
    ) -> Result<Option<UnmuteResult>, Error> {
        self.lift_mute(guild_id, user_id, unmute_time, details, None).await
    }

    /// With `due_by` set, only a mute that expired at or before it is lifted
    async fn lift_mute(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        unmute_time: Option<Duration>,
        details: CaseDetails,
        due_by: Option<DateTime<Utc>>,
    ) -> Result<Option<UnmuteResult>, Error> {
        let unmute_time = unmute_time.filter(|t| !t.is_zero());
        let mute_role = self.settings.mute_settings(guild_id).await?.mute_role;

        let existing = self.store.find_existing_mute_for_user_id(guild_id, user_id).await?;
        if !is_due(existing.as_ref(), due_by) {
            return Ok(None);
        }
        let member = self.directory.resolve_member(guild_id, user_id, true).await?;
        if !is_considered_muted(existing.as_ref(), member.as_ref(), mute_role) {
            return Ok(None);
        }

        let user = self.user_summary(user_id).await;
        let mod_id = details.mod_id.unwrap_or(self.bot_user_id);
        let expires_at = unmute_time.map(expiry_from_now).transpose()?;

        let lock = self.locks.acquire(member_roles_lock(guild_id, user_id)).await;
        let transition = match expires_at {
            Some(expires_at) => self.schedule_unmute(guild_id, user_id, mute_role, expires_at).await,
            None => self.unmute_now(guild_id, user_id, mute_role, due_by).await,
        };
        lock.release();

        let Some(transition) = transition? else {
            debug!(
                "User {} in guild {} was unmuted concurrently, nothing to do",
                user_id, guild_id
            );
            return Ok(None);
        };

        let time_until_unmute = unmute_time.map(humanize);
        let had_record = match transition {
            UnmuteTransition::Scheduled { had_record } | UnmuteTransition::Unmuted { had_record } => had_record,
        };

        let mut note_details = Vec::new();
        match &time_until_unmute {
            Some(time) => note_details.push(format!("Scheduled unmute in {}", time)),
            None => note_details.push("Unmuted immediately".to_string()),
        }
        if !had_record {
            note_details.push("Removed external mute".to_string());
        }

        let case = self
            .create_case(CaseArgs {
                guild_id,
                user_id,
                mod_id,
                case_type: CaseType::Unmute,
                reason: details.reason.clone(),
                note_details,
            })
            .await?;

        let moderator = self.user_summary(mod_id).await;
        let reason = details.reason.clone().unwrap_or_default();
        self.mod_log.log(match time_until_unmute {
            Some(time) => ModLogEntry::MemberTimedUnmute {
                guild_id,
                moderator,
                user,
                case_number: case.case_number,
                time,
                reason,
            },
            None => ModLogEntry::MemberUnmute {
                guild_id,
                moderator,
                user,
                case_number: case.case_number,
                reason,
            },
        });

        let events = match transition {
            UnmuteTransition::Unmuted { .. } => {
                info!(
                    "Unmuted user {} in guild {} (case #{})",
                    user_id, guild_id, case.case_number
                );
                vec![MuteEvent::Unmute {
                    guild_id: guild_id.get(),
                    user_id: user_id.get(),
                    reason: details.reason,
                }]
            }
            UnmuteTransition::Scheduled { .. } => {
                info!(
                    "Scheduled unmute of user {} in guild {} at {:?} (case #{})",
                    user_id, guild_id, expires_at, case.case_number
                );
                Vec::new()
            }
        };

        Ok(Some(UnmuteResult { case, events }))
    }

    /// Must be called with the member lock held
    async fn schedule_unmute(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        mute_role: Option<RoleId>,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<UnmuteTransition>, Error> {
        let existing = self.store.find_existing_mute_for_user_id(guild_id, user_id).await?;
        let member = self.directory.resolve_member(guild_id, user_id, true).await?;
        if !is_considered_muted(existing.as_ref(), member.as_ref(), mute_role) {
            return Ok(None);
        }

        match existing {
            Some(_) => {
                self.store
                    .update_expiry_time(guild_id, user_id, Some(expires_at))
                    .await?;
            }
            None => {
                self.store
                    .add_mute(guild_id, user_id, Some(expires_at), &[], None)
                    .await?;
            }
        }

        Ok(Some(UnmuteTransition::Scheduled {
            had_record: existing.is_some(),
        }))
    }

    /// Must be called with the member lock held.
    ///
    /// The record is only cleared after the role changes succeed, so a
    /// failed role update leaves the mute tracked for a later retry.
    async fn unmute_now(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        mute_role: Option<RoleId>,
        due_by: Option<DateTime<Utc>>,
    ) -> Result<Option<UnmuteTransition>, Error> {
        let existing = self.store.find_existing_mute_for_user_id(guild_id, user_id).await?;
        // The mute may have been extended while waiting for the lock
        if !is_due(existing.as_ref(), due_by) {
            return Ok(None);
        }
        let member = self.directory.resolve_member(guild_id, user_id, true).await?;
        if !is_considered_muted(existing.as_ref(), member.as_ref(), mute_role) {
            return Ok(None);
        }

        match &member {
            Some(member) => {
                if let Some(role) = mute_role {
                    if member.has_role(role) {
                        self.roles.remove_role(guild_id, user_id, role).await?;
                    }
                }

                if let Some(record) = existing.as_ref().filter(|r| !r.roles_to_restore.is_empty()) {
                    let guild_roles = self.directory.guild_role_ids(guild_id).await?;
                    let target = compute_restored_roles(
                        &member.roles,
                        mute_role,
                        &record.roles_to_restore(),
                        &guild_roles,
                    );
                    let target: Vec<RoleId> = target.into_iter().collect();
                    self.roles.set_roles(guild_id, user_id, &target).await?;
                }
            }
            None => {
                warn!(
                    "Member {} not found in guild {} when attempting to unmute",
                    user_id, guild_id
                );
            }
        }

        if existing.is_some() {
            self.store.clear(guild_id, user_id).await?;
        }

        Ok(Some(UnmuteTransition::Unmuted {
            had_record: existing.is_some(),
        }))
    }

    /// Unmute every member whose mute expired at or before `now`.
    ///
    /// One member failing does not stop the others.
    pub async fn expire_due_mutes(&self, now: DateTime<Utc>) -> Result<SweepReport, Error> {
        let expired = self.store.get_expired_mutes(now).await?;
        let mut report = SweepReport::default();

        for record in expired {
            let (guild_id, user_id) = (record.guild(), record.user());
            debug!("Mute of user {} in guild {} expired", user_id, guild_id);

            match self
                .lift_mute(
                    guild_id,
                    user_id,
                    None,
                    CaseDetails::automatic("Mute expired"),
                    Some(now),
                )
                .await
            {
                Ok(Some(result)) => {
                    report.unmuted += 1;
                    report.events.extend(result.events);
                }
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    error!(
                        "Failed to clear expired mute of user {} in guild {}: {:?}",
                        user_id, guild_id, e
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Put the mute role back on a member who rejoined while muted.
    ///
    /// Returns whether the role was applied.
    pub async fn reapply_mute_on_join(&self, guild_id: GuildId, user_id: UserId) -> Result<bool, Error> {
        let Some(mute_role) = self.settings.mute_settings(guild_id).await?.mute_role else {
            return Ok(false);
        };

        let _lock = self.locks.acquire(member_roles_lock(guild_id, user_id)).await;

        let Some(record) = self.store.find_existing_mute_for_user_id(guild_id, user_id).await? else {
            return Ok(false);
        };
        if record.is_expired(Utc::now()) {
            // The sweeper will lift it
            return Ok(false);
        }

        let Some(member) = self.directory.resolve_member(guild_id, user_id, true).await? else {
            return Ok(false);
        };
        if member.has_role(mute_role) {
            return Ok(false);
        }

        self.roles.add_role(guild_id, user_id, mute_role).await?;
        info!("Reapplied mute role to user {} on rejoining guild {}", user_id, guild_id);

        Ok(true)
    }

    /// Forget a mute whose role was removed by hand.
    ///
    /// Returns whether a record was cleared. Roles are not restored.
    pub async fn clear_mute_on_role_removal(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<bool, Error> {
        let Some(mute_role) = self.settings.mute_settings(guild_id).await?.mute_role else {
            return Ok(false);
        };

        let _lock = self.locks.acquire(member_roles_lock(guild_id, user_id)).await;

        if self
            .store
            .find_existing_mute_for_user_id(guild_id, user_id)
            .await?
            .is_none()
        {
            return Ok(false);
        }

        let Some(member) = self.directory.resolve_member(guild_id, user_id, true).await? else {
            return Ok(false);
        };
        if member.has_role(mute_role) {
            return Ok(false);
        }

        self.store.clear(guild_id, user_id).await?;
        info!(
            "Mute role was removed from user {} in guild {} manually, cleared mute",
            user_id, guild_id
        );

        Ok(true)
    }

    async fn create_case(&self, args: CaseArgs) -> Result<Case, Error> {
        let (guild_id, user_id, case_type) = (args.guild_id, args.user_id, args.case_type);

        self.cases.create_case(args).await.map_err(|e| {
            // The role change already happened and is not rolled back
            error!(
                "Failed to create {} case for user {} in guild {} after the action was applied: {:?}",
                case_type, user_id, guild_id, e
            );
            Error::CaseCreation(e.to_string())
        })
    }

    /// Users who deleted their account still get muted, unmuted and logged
    async fn user_summary(&self, user_id: UserId) -> UserSummary {
        match self.directory.resolve_user(user_id).await {
            Ok(user) => user,
            Err(e) => {
                debug!("Could not resolve user {}: {:?}", user_id, e);
                UserSummary::unknown(user_id)
            }
        }
    }
}
