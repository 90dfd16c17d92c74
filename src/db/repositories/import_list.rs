use crate::entities::{import_lists, prelude::ImportLists};
use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};

pub struct ImportListRepository {
    conn: DatabaseConnection,
}

impl ImportListRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn upsert(&self, list: &import_lists::Model) -> Result<()> {
        ImportLists::insert(import_lists::ActiveModel {
            id: Set(list.id.clone()),
            name: Set(list.name.clone()),
            list_type: Set(list.list_type.clone()),
            media_type: Set(list.media_type.clone()),
            enabled: Set(list.enabled),
            list_id: Set(list.list_id.clone()),
            quality_profile_id: Set(list.quality_profile_id.clone()),
            root_folder: Set(list.root_folder.clone()),
            monitor: Set(list.monitor.clone()),
            minimum_availability: Set(list.minimum_availability.clone()),
            search_on_add: Set(list.search_on_add),
            refresh_interval_minutes: Set(list.refresh_interval_minutes),
            last_sync: Set(list.last_sync.clone()),
        })
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(import_lists::Column::Id)
                .update_columns([
                    import_lists::Column::Name,
                    import_lists::Column::ListType,
                    import_lists::Column::MediaType,
                    import_lists::Column::Enabled,
                    import_lists::Column::ListId,
                    import_lists::Column::QualityProfileId,
                    import_lists::Column::RootFolder,
                    import_lists::Column::Monitor,
                    import_lists::Column::MinimumAvailability,
                    import_lists::Column::SearchOnAdd,
                    import_lists::Column::RefreshIntervalMinutes,
                ])
                .to_owned(),
        )
        .exec_without_returning(&self.conn)
        .await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<import_lists::Model>> {
        Ok(ImportLists::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn list(&self) -> Result<Vec<import_lists::Model>> {
        Ok(ImportLists::find()
            .order_by_asc(import_lists::Column::Name)
            .all(&self.conn)
            .await?)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        ImportLists::delete_by_id(id).exec(&self.conn).await?;
        Ok(())
    }

    /// Enabled lists whose `last_sync + refresh_interval` has elapsed.
    pub async fn due(&self) -> Result<Vec<import_lists::Model>> {
        let now = chrono::Utc::now();
        let lists = ImportLists::find()
            .filter(import_lists::Column::Enabled.eq(true))
            .all(&self.conn)
            .await?;

        Ok(lists
            .into_iter()
            .filter(|list| {
                list.last_sync
                    .as_deref()
                    .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                    .is_none_or(|last| {
                        let due_at =
                            last + chrono::Duration::minutes(list.refresh_interval_minutes);
                        due_at.with_timezone(&chrono::Utc) <= now
                    })
            })
            .collect())
    }

    pub async fn set_last_sync(&self, id: &str) -> Result<()> {
        ImportLists::update_many()
            .col_expr(
                import_lists::Column::LastSync,
                sea_orm::sea_query::Expr::value(Some(chrono::Utc::now().to_rfc3339())),
            )
            .filter(import_lists::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }
}
