use crate::constants::retention;
use crate::entities::{activity_log, prelude::ActivityLog};
use anyhow::Result;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

pub struct ActivityRepository {
    conn: DatabaseConnection,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ActivityEntry {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub event_type: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub created_at: Option<String>,
}

fn map_model(m: activity_log::Model) -> ActivityEntry {
    ActivityEntry {
        id: m.id,
        entity_type: m.entity_type,
        entity_id: m.entity_id,
        event_type: m.event_type,
        message: m.message,
        details: m.details.and_then(|d| serde_json::from_str(&d).ok()),
        created_at: m.created_at,
    }
}

impl ActivityRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn append(
        &self,
        entity_type: &str,
        entity_id: Option<&str>,
        event_type: &str,
        message: &str,
        details: Option<serde_json::Value>,
    ) -> Result<ActivityEntry> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = ActivityLog::insert(activity_log::ActiveModel {
            entity_type: Set(entity_type.to_string()),
            entity_id: Set(entity_id.map(str::to_string)),
            event_type: Set(event_type.to_string()),
            message: Set(message.to_string()),
            details: Set(details.as_ref().and_then(|d| serde_json::to_string(d).ok())),
            created_at: Set(Some(now.clone())),
            ..Default::default()
        })
        .exec(&self.conn)
        .await?;

        Ok(ActivityEntry {
            id: result.last_insert_id,
            entity_type: entity_type.to_string(),
            entity_id: entity_id.map(str::to_string),
            event_type: event_type.to_string(),
            message: message.to_string(),
            details,
            created_at: Some(now),
        })
    }

    pub async fn list(
        &self,
        entity_type: Option<&str>,
        entity_id: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<ActivityEntry>> {
        let mut query = ActivityLog::find()
            .order_by_desc(activity_log::Column::Id)
            .limit(limit)
            .offset(offset);

        if let Some(entity_type) = entity_type {
            query = query.filter(activity_log::Column::EntityType.eq(entity_type));
        }
        if let Some(entity_id) = entity_id {
            query = query.filter(activity_log::Column::EntityId.eq(entity_id));
        }

        Ok(query
            .all(&self.conn)
            .await?
            .into_iter()
            .map(map_model)
            .collect())
    }

    /// Drop rows past the retention window. Returns how many were removed.
    pub async fn purge_old(&self) -> Result<u64> {
        let cutoff = (chrono::Utc::now()
            - chrono::Duration::days(retention::ACTIVITY_DAYS))
        .to_rfc3339();

        let result = ActivityLog::delete_many()
            .filter(activity_log::Column::CreatedAt.lt(cutoff))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected)
    }
}
