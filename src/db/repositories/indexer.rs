use crate::entities::{download_clients, indexers, prelude::*};
use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};

pub struct IndexerRepository {
    conn: DatabaseConnection,
}

impl IndexerRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn upsert(&self, indexer: &indexers::Model) -> Result<()> {
        Indexers::insert(indexers::ActiveModel {
            id: Set(indexer.id.clone()),
            name: Set(indexer.name.clone()),
            base_url: Set(indexer.base_url.clone()),
            api_key: Set(indexer.api_key.clone()),
            protocol: Set(indexer.protocol.clone()),
            categories: Set(indexer.categories.clone()),
            enabled: Set(indexer.enabled),
            supports_rss: Set(indexer.supports_rss),
            rss_interval_minutes: Set(indexer.rss_interval_minutes),
            priority: Set(indexer.priority),
        })
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(indexers::Column::Id)
                .update_columns([
                    indexers::Column::Name,
                    indexers::Column::BaseUrl,
                    indexers::Column::ApiKey,
                    indexers::Column::Protocol,
                    indexers::Column::Categories,
                    indexers::Column::Enabled,
                    indexers::Column::SupportsRss,
                    indexers::Column::RssIntervalMinutes,
                    indexers::Column::Priority,
                ])
                .to_owned(),
        )
        .exec_without_returning(&self.conn)
        .await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<indexers::Model>> {
        Ok(Indexers::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn list(&self) -> Result<Vec<indexers::Model>> {
        Ok(Indexers::find()
            .order_by_asc(indexers::Column::Priority)
            .all(&self.conn)
            .await?)
    }

    pub async fn enabled(&self) -> Result<Vec<indexers::Model>> {
        Ok(Indexers::find()
            .filter(indexers::Column::Enabled.eq(true))
            .order_by_asc(indexers::Column::Priority)
            .all(&self.conn)
            .await?)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        Indexers::delete_by_id(id).exec(&self.conn).await?;
        Ok(())
    }
}

pub struct DownloadClientRepository {
    conn: DatabaseConnection,
}

impl DownloadClientRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn upsert(&self, client: &download_clients::Model) -> Result<()> {
        DownloadClients::insert(download_clients::ActiveModel {
            id: Set(client.id.clone()),
            name: Set(client.name.clone()),
            kind: Set(client.kind.clone()),
            base_url: Set(client.base_url.clone()),
            username: Set(client.username.clone()),
            password: Set(client.password.clone()),
            api_key: Set(client.api_key.clone()),
            category: Set(client.category.clone()),
            enabled: Set(client.enabled),
            remove_completed: Set(client.remove_completed),
            keep_source: Set(client.keep_source),
        })
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(download_clients::Column::Id)
                .update_columns([
                    download_clients::Column::Name,
                    download_clients::Column::Kind,
                    download_clients::Column::BaseUrl,
                    download_clients::Column::Username,
                    download_clients::Column::Password,
                    download_clients::Column::ApiKey,
                    download_clients::Column::Category,
                    download_clients::Column::Enabled,
                    download_clients::Column::RemoveCompleted,
                    download_clients::Column::KeepSource,
                ])
                .to_owned(),
        )
        .exec_without_returning(&self.conn)
        .await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<download_clients::Model>> {
        Ok(DownloadClients::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn list(&self) -> Result<Vec<download_clients::Model>> {
        Ok(DownloadClients::find()
            .order_by_asc(download_clients::Column::Name)
            .all(&self.conn)
            .await?)
    }

    pub async fn enabled(&self) -> Result<Vec<download_clients::Model>> {
        Ok(DownloadClients::find()
            .filter(download_clients::Column::Enabled.eq(true))
            .order_by_asc(download_clients::Column::Name)
            .all(&self.conn)
            .await?)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        DownloadClients::delete_by_id(id).exec(&self.conn).await?;
        Ok(())
    }
}
