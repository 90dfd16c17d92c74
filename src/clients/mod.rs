pub mod probe;
pub mod qbittorrent;
pub mod sabnzbd;
pub mod tmdb;
pub mod torznab;
pub mod traits;
pub mod webhook;

pub use traits::{
    AddResult, ClientJob, DownloadClient, ExternalIdKind, IndexerClient, IndexerTest, JobState,
    ListItem, MediaInfoProbe, MetadataProvider, MovieMetadata, Notifier, SearchKind,
    SeasonMetadata, SeriesMetadata,
};

use crate::entities::{download_clients, indexers};
use crate::models::release::Protocol;
use std::sync::Arc;
use std::time::Duration;

/// Build an indexer client from its configuration row.
#[must_use]
pub fn build_indexer(row: &indexers::Model) -> Arc<dyn IndexerClient> {
    let categories = row
        .categories
        .as_deref()
        .and_then(|json| serde_json::from_str(json).ok())
        .unwrap_or_default();

    Arc::new(torznab::TorznabClient::new(torznab::TorznabConfig {
        id: row.id.clone(),
        name: row.name.clone(),
        base_url: row.base_url.clone(),
        api_key: row.api_key.clone(),
        protocol: Protocol::parse(&row.protocol),
        categories,
        supports_rss: row.supports_rss,
        timeout: Duration::from_secs(10),
    }))
}

/// Build a download client from its configuration row. Unknown kinds map
/// to qBittorrent, the common default.
#[must_use]
pub fn build_download_client(
    row: &download_clients::Model,
    timeout: Duration,
) -> Arc<dyn DownloadClient> {
    if row.kind == "sabnzbd" {
        Arc::new(sabnzbd::SabnzbdClient::new(sabnzbd::SabnzbdConfig {
            id: row.id.clone(),
            name: row.name.clone(),
            base_url: row.base_url.clone(),
            api_key: row.api_key.clone().unwrap_or_default(),
            category: row.category.clone(),
            keep_source: row.keep_source,
            timeout,
        }))
    } else {
        Arc::new(qbittorrent::QbitClient::new(qbittorrent::QbitConfig {
            id: row.id.clone(),
            name: row.name.clone(),
            base_url: row.base_url.clone(),
            username: row.username.clone().unwrap_or_default(),
            password: row.password.clone().unwrap_or_default(),
            category: row.category.clone(),
            timeout,
        }))
    }
}
