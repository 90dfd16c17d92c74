use crate::db::Store;
use crate::domain::events::{ActivityEvent, NotificationEvent, is_streamed};
use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Append-only activity journal plus the SSE fan-out.
#[derive(Clone)]
pub struct ActivityService {
    store: Store,
    event_bus: broadcast::Sender<NotificationEvent>,
}

impl ActivityService {
    #[must_use]
    pub const fn new(store: Store, event_bus: broadcast::Sender<NotificationEvent>) -> Self {
        Self { store, event_bus }
    }

    /// Write one activity row and, for streamed event types, push it to
    /// connected SSE clients.
    pub async fn record(
        &self,
        entity_type: &str,
        entity_id: Option<&str>,
        event_type: &str,
        message: &str,
        details: Option<serde_json::Value>,
    ) -> Result<()> {
        let entry = self
            .store
            .activity()
            .append(entity_type, entity_id, event_type, message, details)
            .await?;

        if is_streamed(event_type) {
            // A send error just means no client is connected.
            let _ = self.event_bus.send(NotificationEvent::Activity(ActivityEvent {
                id: entry.id,
                entity_type: entry.entity_type,
                entity_id: entry.entity_id,
                event_type: entry.event_type,
                message: entry.message,
                created_at: entry.created_at,
            }));
        } else {
            debug!(event_type = %event_type, "Activity recorded (not streamed)");
        }

        Ok(())
    }

    /// The activity-cleanup worker body.
    pub async fn cleanup(&self) -> Result<()> {
        let removed = self.store.activity().purge_old().await?;
        if removed > 0 {
            info!(removed, "Purged old activity rows");
        }
        Ok(())
    }
}
