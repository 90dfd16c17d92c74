use crate::entities::{downloads, prelude::Downloads};
use crate::models::download::{Download, DownloadState};
use anyhow::Result;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

pub struct DownloadRepository {
    conn: DatabaseConnection,
}

const ACTIVE_STATES: [&str; 3] = ["queued", "downloading", "importing"];

fn map_model(m: downloads::Model) -> Download {
    Download {
        status: DownloadState::parse(&m.status),
        id: m.id,
        movie_id: m.movie_id,
        series_id: m.series_id,
        season_number: m.season_number,
        episode_number: m.episode_number,
        title: m.title,
        download_url: m.download_url,
        size: m.size,
        indexer: m.indexer,
        quality: m.quality,
        progress: m.progress,
        download_client_id: m.download_client_id,
        client_job_id: m.client_job_id,
        error_message: m.error_message,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

impl DownloadRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(&self, download: &Download) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();

        Downloads::insert(downloads::ActiveModel {
            id: Set(download.id.clone()),
            movie_id: Set(download.movie_id.clone()),
            series_id: Set(download.series_id.clone()),
            season_number: Set(download.season_number),
            episode_number: Set(download.episode_number),
            title: Set(download.title.clone()),
            download_url: Set(download.download_url.clone()),
            size: Set(download.size),
            indexer: Set(download.indexer.clone()),
            quality: Set(download.quality.clone()),
            status: Set(download.status.as_str().to_string()),
            progress: Set(download.progress),
            download_client_id: Set(download.download_client_id.clone()),
            client_job_id: Set(download.client_job_id.clone()),
            error_message: Set(download.error_message.clone()),
            created_at: Set(Some(now.clone())),
            updated_at: Set(Some(now)),
        })
        .exec_without_returning(&self.conn)
        .await?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Download>> {
        Ok(Downloads::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(map_model))
    }

    pub async fn list(&self, status: Option<DownloadState>, limit: u64) -> Result<Vec<Download>> {
        let mut query = Downloads::find()
            .order_by_desc(downloads::Column::CreatedAt)
            .limit(limit);

        if let Some(status) = status {
            query = query.filter(downloads::Column::Status.eq(status.as_str()));
        }

        Ok(query
            .all(&self.conn)
            .await?
            .into_iter()
            .map(map_model)
            .collect())
    }

    pub async fn active(&self) -> Result<Vec<Download>> {
        Ok(Downloads::find()
            .filter(downloads::Column::Status.is_in(ACTIVE_STATES))
            .all(&self.conn)
            .await?
            .into_iter()
            .map(map_model)
            .collect())
    }

    /// Whether the movie already has a download in flight.
    pub async fn has_active_for_movie(&self, movie_id: &str) -> Result<bool> {
        let count = Downloads::find()
            .filter(downloads::Column::MovieId.eq(movie_id))
            .filter(downloads::Column::Status.is_in(ACTIVE_STATES))
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }

    /// Whether the episode (or its whole season, for season packs) has a
    /// download in flight.
    pub async fn has_active_for_episode(
        &self,
        series_id: &str,
        season_number: i32,
        episode_number: Option<i32>,
    ) -> Result<bool> {
        let mut query = Downloads::find()
            .filter(downloads::Column::SeriesId.eq(series_id))
            .filter(downloads::Column::SeasonNumber.eq(season_number))
            .filter(downloads::Column::Status.is_in(ACTIVE_STATES));

        if let Some(episode) = episode_number {
            query = query.filter(
                Condition::any()
                    .add(downloads::Column::EpisodeNumber.eq(episode))
                    .add(downloads::Column::EpisodeNumber.is_null()),
            );
        }

        Ok(query.count(&self.conn).await? > 0)
    }

    /// Whether the exact download URL is already tracked, in any state.
    /// Re-grabbing the same URL must be a no-op.
    pub async fn has_url(&self, download_url: &str) -> Result<bool> {
        let count = Downloads::find()
            .filter(downloads::Column::DownloadUrl.eq(download_url))
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }

    pub async fn update_progress(
        &self,
        id: &str,
        status: DownloadState,
        progress: f64,
        size: Option<i64>,
    ) -> Result<()> {
        let mut model = downloads::ActiveModel {
            id: Set(id.to_string()),
            status: Set(status.as_str().to_string()),
            progress: Set(progress),
            updated_at: Set(Some(chrono::Utc::now().to_rfc3339())),
            ..Default::default()
        };
        if let Some(size) = size {
            model.size = Set(Some(size));
        }

        Downloads::update(model).exec(&self.conn).await?;
        Ok(())
    }

    pub async fn set_status(
        &self,
        id: &str,
        status: DownloadState,
        error_message: Option<&str>,
    ) -> Result<()> {
        let model = downloads::ActiveModel {
            id: Set(id.to_string()),
            status: Set(status.as_str().to_string()),
            error_message: Set(error_message.map(str::to_string)),
            updated_at: Set(Some(chrono::Utc::now().to_rfc3339())),
            ..Default::default()
        };

        Downloads::update(model).exec(&self.conn).await?;
        Ok(())
    }

    pub async fn set_client_ids(
        &self,
        id: &str,
        download_client_id: &str,
        client_job_id: Option<&str>,
    ) -> Result<()> {
        let model = downloads::ActiveModel {
            id: Set(id.to_string()),
            download_client_id: Set(Some(download_client_id.to_string())),
            client_job_id: Set(client_job_id.map(str::to_string)),
            updated_at: Set(Some(chrono::Utc::now().to_rfc3339())),
            ..Default::default()
        };

        Downloads::update(model).exec(&self.conn).await?;
        Ok(())
    }
}
