//! Shared scaffolding for integration tests: an in-memory store wired
//! into the full application state, with stubbed external services.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use mediastack::clients::{
    ExternalIdKind, ListItem, MediaInfoProbe, MetadataProvider, MovieMetadata, Notifier,
    SeasonMetadata, SeriesMetadata,
};
use mediastack::config::Config;
use mediastack::db::Store;
use mediastack::models::media::MediaInfo;
use mediastack::state::SharedState;

pub struct StubProvider;

#[async_trait]
impl MetadataProvider for StubProvider {
    async fn get_movie(&self, tmdb_id: i64) -> anyhow::Result<MovieMetadata> {
        Ok(MovieMetadata {
            tmdb_id,
            title: format!("Stub Movie {tmdb_id}"),
            year: Some(2020),
            ..Default::default()
        })
    }

    async fn get_series(&self, tmdb_id: i64) -> anyhow::Result<SeriesMetadata> {
        Ok(SeriesMetadata {
            tmdb_id,
            title: format!("Stub Series {tmdb_id}"),
            year: Some(2020),
            ..Default::default()
        })
    }

    async fn get_season(&self, _tmdb_id: i64, season_number: i32) -> anyhow::Result<SeasonMetadata> {
        Ok(SeasonMetadata {
            season_number,
            episodes: vec![],
        })
    }

    async fn find_by_external_id(
        &self,
        _imdb_id: &str,
        _kind: ExternalIdKind,
    ) -> anyhow::Result<Option<i64>> {
        Ok(None)
    }

    async fn fetch_list(
        &self,
        _list_type: &str,
        _list_id: Option<&str>,
    ) -> anyhow::Result<Vec<ListItem>> {
        Ok(vec![])
    }
}

pub struct StubNotifier;

#[async_trait]
impl Notifier for StubNotifier {
    async fn notify(&self, _event: &str, _message: &str, _media_ref: Option<&str>) {}
}

pub struct StubProbe;

#[async_trait]
impl MediaInfoProbe for StubProbe {
    async fn probe(&self, _path: &Path) -> anyhow::Result<MediaInfo> {
        Ok(MediaInfo {
            resolution_width: 1920,
            resolution_height: 1080,
            video_codec: "h264".to_string(),
            audio_codec: "aac".to_string(),
            ..Default::default()
        })
    }
}

pub async fn test_state() -> Arc<SharedState> {
    let store = Store::with_pool_options("sqlite::memory:", 1, 1)
        .await
        .expect("in-memory store");

    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.workers.enabled = false;

    let shared = SharedState::with_parts(
        config,
        store,
        Arc::new(StubProvider),
        Arc::new(StubNotifier),
        Arc::new(StubProbe),
    )
    .expect("state wiring");

    Arc::new(shared)
}
