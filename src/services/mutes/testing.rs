//! In-memory collaborators for exercising the mute flow without Discord or Postgres.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serenity::all::{GuildId, RoleId, UserId};
use tokio::task::yield_now;
use uuid::Uuid;

use crate::bot::error::Error;
use crate::db::models::{Case, MuteRecord};
use crate::services::cases::{CaseArgs, CaseLedger};
use crate::services::directory::{Directory, MemberRoles, MemberSnapshot, UserSummary};
use crate::services::logs::{ModLog, ModLogEntry};
use crate::services::mutes::settings::{MuteSettings, MuteSettingsSource};
use crate::services::mutes::store::MuteStore;

type MemberKey = (GuildId, UserId);

#[derive(Default)]
pub struct MemoryMuteStore {
    records: Mutex<HashMap<MemberKey, MuteRecord>>,
    writes: Mutex<usize>,
}

impl MemoryMuteStore {
    pub fn insert(&self, record: MuteRecord) {
        self.records
            .lock()
            .unwrap()
            .insert((record.guild(), record.user()), record);
    }

    pub fn get(&self, guild_id: GuildId, user_id: UserId) -> Option<MuteRecord> {
        self.records.lock().unwrap().get(&(guild_id, user_id)).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }

    fn record_write(&self) {
        *self.writes.lock().unwrap() += 1;
    }
}

pub fn mute_record(
    guild_id: GuildId,
    user_id: UserId,
    expires_at: Option<DateTime<Utc>>,
    roles_to_restore: &[RoleId],
) -> MuteRecord {
    MuteRecord {
        guild_id: guild_id.get() as i64,
        user_id: user_id.get() as i64,
        expires_at,
        roles_to_restore: roles_to_restore.iter().map(|r| r.get() as i64).collect(),
        reason: None,
        created_at: Utc::now(),
    }
}

#[async_trait]
impl MuteStore for MemoryMuteStore {
    async fn find_existing_mute_for_user_id(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<Option<MuteRecord>, Error> {
        yield_now().await;
        Ok(self.get(guild_id, user_id))
    }

    async fn add_mute(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        expires_at: Option<DateTime<Utc>>,
        roles_to_restore: &[RoleId],
        reason: Option<&str>,
    ) -> Result<MuteRecord, Error> {
        yield_now().await;
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&(guild_id, user_id)) {
            return Err(Error::MuteAlreadyExists {
                guild_id: guild_id.get(),
                user_id: user_id.get(),
            });
        }

        let mut record = mute_record(guild_id, user_id, expires_at, roles_to_restore);
        record.reason = reason.map(str::to_string);
        records.insert((guild_id, user_id), record.clone());
        drop(records);
        self.record_write();
        Ok(record)
    }

    async fn update_expiry_time(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), Error> {
        yield_now().await;
        let mut records = self.records.lock().unwrap();
        let record = records.get_mut(&(guild_id, user_id)).ok_or(Error::MuteNotFound {
            guild_id: guild_id.get(),
            user_id: user_id.get(),
        })?;
        record.expires_at = expires_at;
        drop(records);
        self.record_write();
        Ok(())
    }

    async fn clear(&self, guild_id: GuildId, user_id: UserId) -> Result<(), Error> {
        yield_now().await;
        if self.records.lock().unwrap().remove(&(guild_id, user_id)).is_some() {
            self.record_write();
        }
        Ok(())
    }

    async fn get_expired_mutes(&self, now: DateTime<Utc>) -> Result<Vec<MuteRecord>, Error> {
        yield_now().await;
        let mut expired: Vec<MuteRecord> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|record| record.is_expired(now))
            .cloned()
            .collect();
        expired.sort_by_key(|record| record.expires_at);
        Ok(expired)
    }

    async fn get_active_mutes(&self, guild_id: GuildId) -> Result<Vec<MuteRecord>, Error> {
        yield_now().await;
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|record| record.guild() == guild_id)
            .cloned()
            .collect())
    }
}

/// A role mutation observed by `FakeDirectory`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleCall {
    Add(UserId, RoleId),
    Remove(UserId, RoleId),
    Set(UserId, Vec<RoleId>),
}

/// Guild members, roles and users, with role mutations applied in memory
#[derive(Default)]
pub struct FakeDirectory {
    members: Mutex<HashMap<MemberKey, Vec<RoleId>>>,
    guild_roles: Mutex<HashMap<GuildId, HashSet<RoleId>>>,
    calls: Mutex<Vec<RoleCall>>,
    failing_users: Mutex<HashSet<UserId>>,
    deleted_users: Mutex<HashSet<UserId>>,
}

impl FakeDirectory {
    pub fn add_member(&self, guild_id: GuildId, user_id: UserId, roles: &[RoleId]) {
        self.members
            .lock()
            .unwrap()
            .insert((guild_id, user_id), roles.to_vec());
    }

    pub fn remove_member(&self, guild_id: GuildId, user_id: UserId) {
        self.members.lock().unwrap().remove(&(guild_id, user_id));
    }

    pub fn set_guild_roles(&self, guild_id: GuildId, roles: &[RoleId]) {
        self.guild_roles
            .lock()
            .unwrap()
            .insert(guild_id, roles.iter().copied().collect());
    }

    pub fn member_roles(&self, guild_id: GuildId, user_id: UserId) -> Option<Vec<RoleId>> {
        self.members.lock().unwrap().get(&(guild_id, user_id)).cloned()
    }

    pub fn calls(&self) -> Vec<RoleCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Make every role mutation for `user_id` fail until called again with `false`
    pub fn fail_role_updates(&self, user_id: UserId, fail: bool) {
        let mut failing = self.failing_users.lock().unwrap();
        if fail {
            failing.insert(user_id);
        } else {
            failing.remove(&user_id);
        }
    }

    /// Make `resolve_user` fail as it does for a deleted Discord account
    pub fn delete_user(&self, user_id: UserId) {
        self.deleted_users.lock().unwrap().insert(user_id);
    }

    fn mutate(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        call: RoleCall,
        apply: impl FnOnce(&mut Vec<RoleId>),
    ) -> Result<(), Error> {
        if self.failing_users.lock().unwrap().contains(&user_id) {
            return Err(Error::RoleMutation {
                user_id: user_id.get(),
                reason: "Missing Permissions".to_string(),
            });
        }

        let mut members = self.members.lock().unwrap();
        let roles = members.get_mut(&(guild_id, user_id)).ok_or(Error::RoleMutation {
            user_id: user_id.get(),
            reason: "Unknown Member".to_string(),
        })?;
        apply(roles);
        drop(members);
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl Directory for FakeDirectory {
    async fn resolve_user(&self, user_id: UserId) -> Result<UserSummary, Error> {
        yield_now().await;
        if self.deleted_users.lock().unwrap().contains(&user_id) {
            return Err(Error::UserNotFound(user_id.get()));
        }
        Ok(UserSummary {
            id: user_id,
            tag: format!("user{}", user_id),
        })
    }

    async fn resolve_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        _force_fresh: bool,
    ) -> Result<Option<MemberSnapshot>, Error> {
        yield_now().await;
        Ok(self
            .member_roles(guild_id, user_id)
            .map(|roles| MemberSnapshot { user_id, roles }))
    }

    async fn guild_role_ids(&self, guild_id: GuildId) -> Result<HashSet<RoleId>, Error> {
        yield_now().await;
        Ok(self
            .guild_roles
            .lock()
            .unwrap()
            .get(&guild_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl MemberRoles for FakeDirectory {
    async fn add_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<(), Error> {
        yield_now().await;
        self.mutate(guild_id, user_id, RoleCall::Add(user_id, role_id), |roles| {
            if !roles.contains(&role_id) {
                roles.push(role_id);
            }
        })
    }

    async fn remove_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<(), Error> {
        yield_now().await;
        self.mutate(guild_id, user_id, RoleCall::Remove(user_id, role_id), |roles| {
            roles.retain(|r| *r != role_id)
        })
    }

    async fn set_roles(&self, guild_id: GuildId, user_id: UserId, new_roles: &[RoleId]) -> Result<(), Error> {
        yield_now().await;
        let new_roles = new_roles.to_vec();
        self.mutate(guild_id, user_id, RoleCall::Set(user_id, new_roles.clone()), |roles| {
            *roles = new_roles
        })
    }
}

#[derive(Default)]
pub struct MemoryCaseLedger {
    cases: Mutex<Vec<Case>>,
    fail: Mutex<bool>,
}

impl MemoryCaseLedger {
    pub fn cases(&self) -> Vec<Case> {
        self.cases.lock().unwrap().clone()
    }

    pub fn fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl CaseLedger for MemoryCaseLedger {
    async fn create_case(&self, args: CaseArgs) -> Result<Case, Error> {
        yield_now().await;
        if *self.fail.lock().unwrap() {
            return Err(Error::custom("ledger unavailable"));
        }

        let mut cases = self.cases.lock().unwrap();
        let case = Case {
            id: Uuid::new_v4(),
            guild_id: args.guild_id.get() as i64,
            case_number: cases.len() as i32 + 1,
            user_id: args.user_id.get() as i64,
            mod_id: args.mod_id.get() as i64,
            case_type: args.case_type,
            reason: args.reason,
            notes: args.note_details,
            created_at: Utc::now(),
        };
        cases.push(case.clone());
        Ok(case)
    }
}

#[derive(Default)]
pub struct RecordingModLog {
    entries: Mutex<Vec<ModLogEntry>>,
}

impl RecordingModLog {
    pub fn entries(&self) -> Vec<ModLogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl ModLog for RecordingModLog {
    fn log(&self, entry: ModLogEntry) {
        self.entries.lock().unwrap().push(entry);
    }
}

pub struct StaticMuteSettings(pub MuteSettings);

#[async_trait]
impl MuteSettingsSource for StaticMuteSettings {
    async fn mute_settings(&self, _guild_id: GuildId) -> Result<MuteSettings, Error> {
        Ok(self.0)
    }
}
