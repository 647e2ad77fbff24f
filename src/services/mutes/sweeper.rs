use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::bot::error::Error;
use crate::constants::timeouts::SWEEP_STARTUP_DELAY_SECONDS;
use crate::services::mutes::events::MuteEventBus;
use crate::services::mutes::orchestrator::{MuteOrchestrator, SweepReport};

/// Start the expired-mute sweeper background task
pub fn spawn_expiry_sweeper(
    mutes: Arc<MuteOrchestrator>,
    events: MuteEventBus,
    check_interval: Duration,
) {
    tokio::spawn(async move {
        sleep(Duration::from_secs(SWEEP_STARTUP_DELAY_SECONDS)).await;

        let mut ticker = interval(check_interval);
        // A slow sweep should not trigger a burst of catch-up sweeps
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if let Err(e) = run_sweep(&mutes, &events).await {
                error!("Error sweeping expired mutes: {:?}", e);
            }
        }
    });
}

/// Lift every expired mute once and publish the resulting events
pub async fn run_sweep(mutes: &MuteOrchestrator, events: &MuteEventBus) -> Result<SweepReport, Error> {
    let report = mutes.expire_due_mutes(Utc::now()).await?;
    events.publish(&report.events);

    if report.failed > 0 {
        warn!(
            "Expired mute sweep: {} unmuted, {} skipped, {} failed",
            report.unmuted, report.skipped, report.failed
        );
    } else if report.unmuted > 0 {
        info!("Expired mute sweep: {} unmuted", report.unmuted);
    } else {
        debug!("Expired mute sweep: nothing to do");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mutes::events::MuteEvent;
    use crate::services::mutes::settings::MuteSettings;
    use crate::services::mutes::testing::{
        mute_record, FakeDirectory, MemoryCaseLedger, MemoryMuteStore, RecordingModLog,
        StaticMuteSettings,
    };
    use serenity::all::{GuildId, RoleId, UserId};

    #[tokio::test]
    async fn test_run_sweep_publishes_unmute_events() {
        let (guild, user, mute_role) = (GuildId::new(1), UserId::new(2), RoleId::new(3));
        let store = Arc::new(MemoryMuteStore::default());
        let directory = Arc::new(FakeDirectory::default());
        store.insert(mute_record(
            guild,
            user,
            Some(Utc::now() - chrono::Duration::seconds(1)),
            &[],
        ));
        directory.add_member(guild, user, &[mute_role]);

        let mutes = MuteOrchestrator::new(
            store.clone(),
            directory.clone(),
            directory.clone(),
            Arc::new(MemoryCaseLedger::default()),
            Arc::new(RecordingModLog::default()),
            Arc::new(StaticMuteSettings(MuteSettings {
                mute_role: Some(mute_role),
                remove_roles_on_mute: false,
            })),
            UserId::new(99),
        );
        let bus = MuteEventBus::new(8);
        let mut rx = bus.subscribe();

        let report = run_sweep(&mutes, &bus).await.unwrap();

        assert_eq!(report.unmuted, 1);
        assert!(store.get(guild, user).is_none());
        assert!(directory.member_roles(guild, user).unwrap().is_empty());
        assert_eq!(
            rx.try_recv().unwrap(),
            MuteEvent::Unmute {
                guild_id: 1,
                user_id: 2,
                reason: Some("Mute expired".to_string()),
            }
        );

        // Nothing left for the next tick
        let second = run_sweep(&mutes, &bus).await.unwrap();
        assert_eq!(second.unmuted + second.skipped + second.failed, 0);
    }
}
