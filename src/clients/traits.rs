//! Capability interfaces for everything that lives outside the process:
//! indexers, download clients, metadata providers, notifiers and the
//! media prober. The automation services only ever see these traits.

use crate::models::media::MediaInfo;
use crate::models::release::{Protocol, Release};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Movie,
    Series,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexerTest {
    pub ok: bool,
    pub version: Option<String>,
    pub message: Option<String>,
}

/// One indexer (Torznab/Newznab endpoint). Failures are reported, never
/// thrown: `search` and `fetch_rss` log and return an empty slice so one
/// broken indexer cannot poison a sweep.
#[async_trait]
pub trait IndexerClient: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn protocol(&self) -> Protocol;

    fn supports_rss(&self) -> bool;

    async fn search(&self, kind: SearchKind, query: &str) -> Vec<Release>;

    async fn fetch_rss(&self) -> Vec<Release>;

    async fn test(&self) -> IndexerTest;
}

#[derive(Debug, Clone, Serialize)]
pub struct AddResult {
    pub ok: bool,
    pub client_job_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Downloading,
    Stalled,
    Completed,
    Error,
}

/// A job as reported by a download client.
#[derive(Debug, Clone, Serialize)]
pub struct ClientJob {
    pub id: String,
    pub name: String,
    pub state: JobState,
    /// 0.0 to 1.0.
    pub progress: f64,
    pub size: i64,
    pub downloaded: i64,
    pub save_path: String,
    pub content_path: String,
    pub error_message: Option<String>,
    pub added_at: Option<i64>,
    pub seeders: Option<i32>,
}

/// A torrent or usenet download client.
///
/// `add` must be idempotent: re-adding a URL the client already knows
/// reports success with the existing job id.
#[async_trait]
pub trait DownloadClient: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn protocol(&self) -> Protocol;

    /// Whether the importer should leave the client's copy in place.
    fn keep_source(&self) -> bool;

    async fn add(
        &self,
        url: &str,
        save_path: Option<&str>,
        category: Option<&str>,
    ) -> Result<AddResult>;

    async fn list(&self, category: Option<&str>) -> Result<Vec<ClientJob>>;

    async fn remove(&self, job_id: &str, delete_files: bool) -> Result<()>;

    async fn test(&self) -> Result<String>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovieMetadata {
    pub tmdb_id: i64,
    pub imdb_id: Option<String>,
    pub title: String,
    pub year: Option<i32>,
    pub runtime: Option<i32>,
    pub overview: Option<String>,
    pub status: Option<String>,
    pub certification: Option<String>,
    pub collection_title: Option<String>,
    pub genres: Vec<String>,
    pub theatrical_release_date: Option<String>,
    pub digital_release_date: Option<String>,
    pub physical_release_date: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub credits: MovieCredits,
    pub vote_average: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovieCredits {
    pub directors: Vec<String>,
    pub writers: Vec<String>,
    /// Billing order preserved; the first five are the leads.
    pub cast: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub season_number: i32,
    pub episode_count: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeriesMetadata {
    pub tmdb_id: i64,
    pub tvdb_id: Option<i64>,
    pub imdb_id: Option<String>,
    pub title: String,
    pub year: Option<i32>,
    pub network: Option<String>,
    pub overview: Option<String>,
    pub status: Option<String>,
    pub genres: Vec<String>,
    pub poster_path: Option<String>,
    pub seasons: Vec<SeasonSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpisodeMetadata {
    pub episode_number: i32,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeasonMetadata {
    pub season_number: i32,
    pub episodes: Vec<EpisodeMetadata>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalIdKind {
    Movie,
    Series,
}

/// An item from an external list before it is resolved into the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListItem {
    pub tmdb_id: Option<i64>,
    pub imdb_id: Option<String>,
    pub title: String,
    pub year: Option<i32>,
}

/// Metadata lookups (TMDB in production, stubs in tests).
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn get_movie(&self, tmdb_id: i64) -> Result<MovieMetadata>;

    async fn get_series(&self, tmdb_id: i64) -> Result<SeriesMetadata>;

    async fn get_season(&self, tmdb_id: i64, season_number: i32) -> Result<SeasonMetadata>;

    async fn find_by_external_id(
        &self,
        imdb_id: &str,
        kind: ExternalIdKind,
    ) -> Result<Option<i64>>;

    /// Fetch the raw items of an import list.
    async fn fetch_list(&self, list_type: &str, list_id: Option<&str>) -> Result<Vec<ListItem>>;
}

/// Outbound notifications. Implementations must not block the caller
/// beyond their own HTTP timeout; callers fire-and-forget via `spawn`.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &str, message: &str, media_ref: Option<&str>);
}

/// Media-file analysis (ffprobe in production).
#[async_trait]
pub trait MediaInfoProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<MediaInfo>;
}
