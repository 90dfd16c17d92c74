//! Activity listing and the SSE stream.
//!
//! The stream sends `event: connected` on subscribe, `event: activity`
//! for the gated event types, and `event: heartbeat` every 30 seconds.

use axum::{
    Json,
    extract::{Query, State},
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use serde::Deserialize;
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tracing::warn;

use super::{ApiError, AppState, types::ApiResponse};
use crate::constants::limits;
use crate::db::ActivityEntry;
use crate::domain::events::NotificationEvent;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

pub async fn list_activity(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ApiResponse<Vec<ActivityEntry>>>, ApiError> {
    let entries = state
        .shared
        .store
        .activity()
        .list(
            query.entity_type.as_deref(),
            query.entity_id.as_deref(),
            query.limit.unwrap_or(limits::DEFAULT_ACTIVITY_LIMIT),
            query.offset.unwrap_or(0),
        )
        .await?;

    Ok(Json(ApiResponse::success(entries)))
}

pub async fn stream_activity(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.shared.event_bus.subscribe();

    let stream = futures::stream::unfold(
        StreamState {
            rx,
            connected_sent: false,
            heartbeat: tokio::time::interval(Duration::from_secs(30)),
        },
        |mut s| async move {
            if !s.connected_sent {
                s.connected_sent = true;
                // The first heartbeat tick fires immediately; burn it so
                // the cadence starts after the connect event.
                s.heartbeat.tick().await;
                return Some((Ok(Event::default().event("connected").data("{}")), s));
            }

            loop {
                tokio::select! {
                    received = s.rx.recv() => match received {
                        Ok(NotificationEvent::Activity(activity)) => {
                            match serde_json::to_string(&activity) {
                                Ok(json) => {
                                    return Some((
                                        Ok(Event::default().event("activity").data(json)),
                                        s,
                                    ));
                                }
                                Err(e) => {
                                    warn!(error = %e, "Failed to serialize SSE event, skipping");
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(count)) => {
                            warn!("SSE client lagged by {count} events");
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    },
                    _ = s.heartbeat.tick() => {
                        return Some((Ok(Event::default().event("heartbeat").data("{}")), s));
                    }
                }
            }
        },
    );

    Sse::new(stream)
}

struct StreamState {
    rx: broadcast::Receiver<NotificationEvent>,
    connected_sent: bool,
    heartbeat: tokio::time::Interval,
}
