//! Domain events for the application.
//!
//! Events are fanned out over the broadcast bus and reach connected
//! clients through the activity SSE stream.

use serde::Serialize;

/// Activity event types. These are also the `event_type` values written
/// to the activity log.
pub mod event_types {
    pub const GRABBED: &str = "grabbed";
    pub const DOWNLOADED: &str = "downloaded";
    pub const IMPORTED: &str = "imported";
    pub const UNMONITORED: &str = "unmonitored";
    pub const SCAN_COMPLETED: &str = "scan_completed";
    pub const FAILED: &str = "failed";
    pub const DELETED: &str = "deleted";
    pub const ADDED: &str = "added";
    pub const RENAMED: &str = "renamed";
}

/// Only these activity types are pushed to SSE clients; the rest stay
/// queryable in the log.
#[must_use]
pub fn is_streamed(event_type: &str) -> bool {
    matches!(
        event_type,
        event_types::GRABBED
            | event_types::DOWNLOADED
            | event_types::IMPORTED
            | event_types::UNMONITORED
            | event_types::SCAN_COMPLETED
            | event_types::FAILED
            | event_types::DELETED
    )
}

/// Events sent to connected clients via SSE.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum NotificationEvent {
    Activity(ActivityEvent),
}

#[derive(Clone, Debug, Serialize)]
pub struct ActivityEvent {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub event_type: String,
    pub message: String,
    pub created_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_gating() {
        assert!(is_streamed(event_types::GRABBED));
        assert!(is_streamed(event_types::IMPORTED));
        assert!(is_streamed(event_types::DELETED));
        assert!(!is_streamed(event_types::ADDED));
        assert!(!is_streamed("random"));
    }
}
