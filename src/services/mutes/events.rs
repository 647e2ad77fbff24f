use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Domain events produced by the mute orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MuteEvent {
    Mute {
        guild_id: u64,
        user_id: u64,
        reason: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    },
    Unmute {
        guild_id: u64,
        user_id: u64,
        reason: Option<String>,
    },
}

/// Process-local fan-out of mute events. Delivery is best-effort.
#[derive(Clone)]
pub struct MuteEventBus {
    tx: broadcast::Sender<MuteEvent>,
}

impl MuteEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MuteEvent> {
        self.tx.subscribe()
    }

    /// Publish events in order. Returns how many were delivered to at least one subscriber.
    pub fn publish(&self, events: &[MuteEvent]) -> usize {
        events
            .iter()
            .filter(|event| match self.tx.send((*event).clone()) {
                Ok(_) => true,
                Err(_) => {
                    debug!("No subscribers for {:?}", event);
                    false
                }
            })
            .count()
    }
}

/// Log every published event until the bus is dropped
pub fn spawn_event_logger(mut rx: broadcast::Receiver<MuteEvent>) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => debug!("Mute event: {}", json),
                    Err(e) => warn!("Failed to serialize mute event {:?}: {:?}", event, e),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Mute event logger lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = MuteEventBus::new(8);
        let mut rx = bus.subscribe();
        let event = MuteEvent::Unmute {
            guild_id: 1,
            user_id: 2,
            reason: Some("appealed".to_string()),
        };

        assert_eq!(bus.publish(std::slice::from_ref(&event)), 1);
        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn test_publish_without_subscribers_is_harmless() {
        let bus = MuteEventBus::new(8);
        let event = MuteEvent::Unmute {
            guild_id: 1,
            user_id: 2,
            reason: None,
        };

        assert_eq!(bus.publish(&[event]), 0);
    }

    #[test]
    fn test_event_json_shape() {
        let event = MuteEvent::Unmute {
            guild_id: 1,
            user_id: 2,
            reason: None,
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "unmute");
        assert_eq!(json["user_id"], 2);
    }
}
