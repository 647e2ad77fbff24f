use std::fmt;
use std::sync::Arc;

use serenity::all::{Cache, Http, RoleId, UserId};
use sqlx::PgPool;

use crate::config::Settings;
use crate::constants::timeouts::MUTE_EVENT_CHANNEL_CAPACITY;
use crate::services::cases::PgCaseLedger;
use crate::services::directory::DiscordDirectory;
use crate::services::logs::DiscordModLog;
use crate::services::mutes::settings::PgMuteSettings;
use crate::services::mutes::store::PgMuteStore;
use crate::services::mutes::{MuteEventBus, MuteOrchestrator};

/// Shared data available to all commands and handlers
pub struct Data {
    pub pool: PgPool,
    pub settings: Settings,
    pub mutes: Arc<MuteOrchestrator>,
    /// Mute/unmute events for anything in the process that wants them
    pub events: MuteEventBus,
}

impl Data {
    pub fn new(
        pool: PgPool,
        settings: Settings,
        http: Arc<Http>,
        cache: Arc<Cache>,
        bot_user_id: UserId,
    ) -> Self {
        let directory = Arc::new(DiscordDirectory::new(http.clone(), cache));
        let default_mute_role = settings.default_mute_role_id.map(RoleId::new);

        let mutes = Arc::new(MuteOrchestrator::new(
            Arc::new(PgMuteStore::new(pool.clone())),
            directory.clone(),
            directory,
            Arc::new(PgCaseLedger::new(pool.clone())),
            Arc::new(DiscordModLog::new(http, pool.clone())),
            Arc::new(PgMuteSettings::new(pool.clone(), default_mute_role)),
            bot_user_id,
        ));

        Self {
            pool,
            settings,
            mutes,
            events: MuteEventBus::new(MUTE_EVENT_CHANNEL_CAPACITY),
        }
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Data")
            .field("active_member_locks", &self.mutes.locks().active_keys())
            .finish_non_exhaustive()
    }
}

pub type Context<'a> = poise::Context<'a, Arc<Data>, crate::bot::error::Error>;
