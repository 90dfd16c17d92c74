use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::movies::DeleteQuery;
use super::{ApiError, AppState, types::ApiResponse};
use crate::constants::limits;
use crate::db::SeriesFilter;
use crate::models::episode::Episode;
use crate::models::series::{Season, Series};
use crate::services::auto_search::SearchOutcome;
use crate::services::library::NewSeries;
use crate::services::naming::FileNamer;

#[derive(Debug, Deserialize)]
pub struct SeriesListQuery {
    pub monitored: Option<bool>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

pub async fn list_series(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SeriesListQuery>,
) -> Result<Json<ApiResponse<Vec<Series>>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(limits::DEFAULT_PAGE_SIZE)
        .min(limits::MAX_PAGE_SIZE);

    let series = state
        .shared
        .store
        .series()
        .list(&SeriesFilter {
            monitored: query.monitored,
            limit: Some(limit),
            offset: query.offset,
        })
        .await?;

    Ok(Json(ApiResponse::success(series)))
}

pub async fn get_series(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Series>>, ApiError> {
    let series = state
        .shared
        .store
        .series()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Series", &id))?;

    Ok(Json(ApiResponse::success(series)))
}

pub async fn create_series(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewSeries>,
) -> Result<Json<ApiResponse<Series>>, ApiError> {
    if new.title.trim().is_empty() {
        return Err(ApiError::validation("Title must not be empty"));
    }

    let namer = FileNamer::new(state.shared.store.naming().get().await?);
    let series = state.shared.library.create_series(new, &namer).await?;

    if series.tmdb_id.is_some() {
        let metadata = state.shared.metadata.clone();
        let series_id = series.id.clone();
        tokio::spawn(async move {
            if let Err(e) = metadata.enrich_series(&series_id, None).await {
                tracing::warn!(series_id = %series_id, error = %e, "Series enrichment failed");
            }
        });
    }

    Ok(Json(ApiResponse::success(series)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSeries {
    pub monitored: Option<bool>,
    pub monitor_new_seasons: Option<crate::models::series::NewSeasonMonitor>,
    pub use_season_folder: Option<bool>,
    pub quality_profile_id: Option<String>,
}

pub async fn update_series(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<UpdateSeries>,
) -> Result<Json<ApiResponse<Series>>, ApiError> {
    let mut series = state
        .shared
        .store
        .series()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Series", &id))?;

    if let Some(monitored) = update.monitored
        && monitored != series.monitored
    {
        // Monitor changes cascade to seasons and episodes.
        state.shared.library.set_series_monitored(&id, monitored).await?;
        series.monitored = monitored;
    }
    if let Some(mode) = update.monitor_new_seasons {
        series.monitor_new_seasons = mode;
    }
    if let Some(use_season_folder) = update.use_season_folder {
        series.use_season_folder = use_season_folder;
    }
    if let Some(profile_id) = update.quality_profile_id {
        state
            .shared
            .store
            .quality()
            .get_profile(&profile_id)
            .await?
            .ok_or_else(|| ApiError::validation("Unknown quality profile"))?;
        series.quality_profile_id = Some(profile_id);
    }

    state.shared.store.series().update(&series).await?;
    Ok(Json(ApiResponse::success(series)))
}

pub async fn delete_series(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    state
        .shared
        .library
        .delete_series(&id, query.delete_files, query.add_exclusion)
        .await?;

    Ok(Json(ApiResponse::success("Series deleted".to_string())))
}

pub async fn list_seasons(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Season>>>, ApiError> {
    let seasons = state.shared.store.series().seasons(&id).await?;
    Ok(Json(ApiResponse::success(seasons)))
}

#[derive(Debug, Deserialize)]
pub struct SeasonMonitorRequest {
    pub monitored: bool,
}

pub async fn set_season_monitored(
    State(state): State<Arc<AppState>>,
    Path((id, season_number)): Path<(String, i32)>,
    Json(request): Json<SeasonMonitorRequest>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    state
        .shared
        .library
        .set_season_monitored(&id, season_number, request.monitored)
        .await?;

    Ok(Json(ApiResponse::success("Season updated".to_string())))
}

pub async fn list_episodes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Episode>>>, ApiError> {
    let episodes = state.shared.store.series().episodes(&id).await?;
    Ok(Json(ApiResponse::success(episodes)))
}

pub async fn get_episode(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Episode>>, ApiError> {
    let episode = state
        .shared
        .store
        .series()
        .get_episode(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Episode", &id))?;

    Ok(Json(ApiResponse::success(episode)))
}

#[derive(Debug, Deserialize)]
pub struct EpisodeMonitorRequest {
    pub monitored: bool,
}

pub async fn update_episode(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<EpisodeMonitorRequest>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    state
        .shared
        .store
        .series()
        .set_episode_monitored(&id, request.monitored)
        .await?;

    Ok(Json(ApiResponse::success("Episode updated".to_string())))
}

/// Drop the episode's file from disk and the catalog.
pub async fn delete_episode_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let episode = state
        .shared
        .store
        .series()
        .get_episode(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Episode", &id))?;

    if let Some(path) = &episode.file_path
        && let Err(e) = tokio::fs::remove_file(path).await
    {
        tracing::warn!(path = %path, error = %e, "Failed to delete episode file");
    }

    state.shared.store.series().clear_episode_file(&id).await?;
    Ok(Json(ApiResponse::success("Episode file removed".to_string())))
}

pub async fn search_episode(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SearchOutcome>>, ApiError> {
    let outcome = state
        .shared
        .auto_search
        .search_and_download_episode(&id, false)
        .await?;

    Ok(Json(ApiResponse::success(outcome)))
}
