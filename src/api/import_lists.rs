use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, AppState, types::ApiResponse};
use crate::db::new_id;
use crate::entities::import_lists;
use crate::services::import_lists::ListSyncStats;

pub async fn list_lists(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<import_lists::Model>>>, ApiError> {
    let lists = state.shared.store.import_lists().list().await?;
    Ok(Json(ApiResponse::success(lists)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportListRequest {
    pub name: String,
    pub list_type: String,
    #[serde(default = "default_media_type")]
    pub media_type: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub list_id: Option<String>,
    pub quality_profile_id: Option<String>,
    pub root_folder: Option<String>,
    #[serde(default = "default_monitor")]
    pub monitor: String,
    pub minimum_availability: Option<String>,
    #[serde(default)]
    pub search_on_add: bool,
    #[serde(default = "default_refresh")]
    pub refresh_interval_minutes: i64,
}

fn default_media_type() -> String {
    "movie".to_string()
}

fn default_monitor() -> String {
    "all".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_refresh() -> i64 {
    720
}

fn validate(request: &ImportListRequest) -> Result<(), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::validation("Name must not be empty"));
    }
    if !matches!(
        request.list_type.as_str(),
        "tmdb_popular" | "tmdb_collection" | "tmdb_person" | "tmdb_list"
    ) {
        return Err(ApiError::validation("Unknown list type"));
    }
    if !matches!(request.media_type.as_str(), "movie" | "series") {
        return Err(ApiError::validation("Media type must be movie or series"));
    }
    if !matches!(
        request.monitor.as_str(),
        "all" | "firstSeason" | "latestSeason" | "none"
    ) {
        return Err(ApiError::validation("Unknown monitor mode"));
    }
    if request.list_type != "tmdb_popular" && request.list_id.is_none() {
        return Err(ApiError::validation("This list type requires a listId"));
    }
    Ok(())
}

fn to_model(id: String, request: ImportListRequest) -> import_lists::Model {
    import_lists::Model {
        id,
        name: request.name,
        list_type: request.list_type,
        media_type: request.media_type,
        enabled: request.enabled,
        list_id: request.list_id,
        quality_profile_id: request.quality_profile_id,
        root_folder: request.root_folder,
        monitor: request.monitor,
        minimum_availability: request.minimum_availability,
        search_on_add: request.search_on_add,
        refresh_interval_minutes: request.refresh_interval_minutes.max(5),
        last_sync: None,
    }
}

pub async fn create_list(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ImportListRequest>,
) -> Result<Json<ApiResponse<import_lists::Model>>, ApiError> {
    validate(&request)?;

    let model = to_model(new_id(), request);
    state.shared.store.import_lists().upsert(&model).await?;
    Ok(Json(ApiResponse::success(model)))
}

pub async fn update_list(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ImportListRequest>,
) -> Result<Json<ApiResponse<import_lists::Model>>, ApiError> {
    validate(&request)?;

    let existing = state
        .shared
        .store
        .import_lists()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Import list", &id))?;

    let mut model = to_model(id, request);
    model.last_sync = existing.last_sync;
    state.shared.store.import_lists().upsert(&model).await?;
    Ok(Json(ApiResponse::success(model)))
}

pub async fn delete_list(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    state.shared.store.import_lists().delete(&id).await?;
    Ok(Json(ApiResponse::success("Import list deleted".to_string())))
}

/// Run one list now, regardless of its schedule.
pub async fn sync_list_now(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ListSyncStats>>, ApiError> {
    let list = state
        .shared
        .store
        .import_lists()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Import list", &id))?;

    let stats = state.shared.import_lists.sync_list(&list).await?;
    state.shared.store.import_lists().set_last_sync(&id).await?;

    Ok(Json(ApiResponse::success(stats)))
}
