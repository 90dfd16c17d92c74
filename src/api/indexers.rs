use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, AppState, types::ApiResponse};
use crate::clients::{IndexerTest, build_indexer};
use crate::db::new_id;
use crate::entities::indexers;

pub async fn list_indexers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<indexers::Model>>>, ApiError> {
    let indexers = state.shared.store.indexers().list().await?;
    Ok(Json(ApiResponse::success(indexers)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerRequest {
    pub name: String,
    pub base_url: String,
    pub api_key: Option<String>,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    pub categories: Option<Vec<i32>>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub supports_rss: bool,
    #[serde(default = "default_rss_interval")]
    pub rss_interval_minutes: i64,
    #[serde(default)]
    pub priority: i32,
}

fn default_protocol() -> String {
    "torrent".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_rss_interval() -> i64 {
    15
}

fn to_model(id: String, request: IndexerRequest) -> Result<indexers::Model, ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::validation("Name must not be empty"));
    }
    url::Url::parse(&request.base_url)
        .map_err(|_| ApiError::validation("Base URL is not a valid URL"))?;
    if !matches!(request.protocol.as_str(), "torrent" | "usenet") {
        return Err(ApiError::validation("Protocol must be torrent or usenet"));
    }

    Ok(indexers::Model {
        id,
        name: request.name,
        base_url: request.base_url,
        api_key: request.api_key,
        protocol: request.protocol,
        categories: request
            .categories
            .and_then(|c| serde_json::to_string(&c).ok()),
        enabled: request.enabled,
        supports_rss: request.supports_rss,
        rss_interval_minutes: request.rss_interval_minutes.max(5),
        priority: request.priority,
    })
}

pub async fn create_indexer(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IndexerRequest>,
) -> Result<Json<ApiResponse<indexers::Model>>, ApiError> {
    let model = to_model(new_id(), request)?;
    state.shared.store.indexers().upsert(&model).await?;
    Ok(Json(ApiResponse::success(model)))
}

pub async fn update_indexer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<IndexerRequest>,
) -> Result<Json<ApiResponse<indexers::Model>>, ApiError> {
    state
        .shared
        .store
        .indexers()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Indexer", &id))?;

    let model = to_model(id, request)?;
    state.shared.store.indexers().upsert(&model).await?;
    Ok(Json(ApiResponse::success(model)))
}

pub async fn delete_indexer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    state.shared.store.indexers().delete(&id).await?;
    Ok(Json(ApiResponse::success("Indexer deleted".to_string())))
}

pub async fn test_indexer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<IndexerTest>>, ApiError> {
    let row = state
        .shared
        .store
        .indexers()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Indexer", &id))?;

    let result = build_indexer(&row).test().await;
    Ok(Json(ApiResponse::success(result)))
}
