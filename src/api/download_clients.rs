use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, AppState, types::ApiResponse};
use crate::clients::build_download_client;
use crate::db::new_id;
use crate::entities::download_clients;

pub async fn list_clients(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<download_clients::Model>>>, ApiError> {
    let clients = state.shared.store.download_clients().list().await?;
    Ok(Json(ApiResponse::success(clients)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadClientRequest {
    pub name: String,
    pub kind: String,
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    pub category: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub remove_completed: bool,
    #[serde(default)]
    pub keep_source: bool,
}

const fn default_true() -> bool {
    true
}

fn to_model(id: String, request: DownloadClientRequest) -> Result<download_clients::Model, ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::validation("Name must not be empty"));
    }
    if !matches!(request.kind.as_str(), "qbittorrent" | "sabnzbd") {
        return Err(ApiError::validation("Kind must be qbittorrent or sabnzbd"));
    }
    url::Url::parse(&request.base_url)
        .map_err(|_| ApiError::validation("Base URL is not a valid URL"))?;
    if request.kind == "sabnzbd" && request.api_key.is_none() {
        return Err(ApiError::validation("SABnzbd requires an apiKey"));
    }

    Ok(download_clients::Model {
        id,
        name: request.name,
        kind: request.kind,
        base_url: request.base_url,
        username: request.username,
        password: request.password,
        api_key: request.api_key,
        category: request.category,
        enabled: request.enabled,
        remove_completed: request.remove_completed,
        keep_source: request.keep_source,
    })
}

pub async fn create_client(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DownloadClientRequest>,
) -> Result<Json<ApiResponse<download_clients::Model>>, ApiError> {
    let model = to_model(new_id(), request)?;
    state.shared.store.download_clients().upsert(&model).await?;
    Ok(Json(ApiResponse::success(model)))
}

pub async fn update_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<DownloadClientRequest>,
) -> Result<Json<ApiResponse<download_clients::Model>>, ApiError> {
    state
        .shared
        .store
        .download_clients()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Download client", &id))?;

    let model = to_model(id, request)?;
    state.shared.store.download_clients().upsert(&model).await?;
    Ok(Json(ApiResponse::success(model)))
}

pub async fn delete_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    state.shared.store.download_clients().delete(&id).await?;
    Ok(Json(ApiResponse::success("Download client deleted".to_string())))
}

pub async fn test_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let row = state
        .shared
        .store
        .download_clients()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Download client", &id))?;

    let client = build_download_client(&row, std::time::Duration::from_secs(10));
    match client.test().await {
        Ok(version) => Ok(Json(ApiResponse::success(
            serde_json::json!({ "ok": true, "version": version }),
        ))),
        Err(e) => Ok(Json(ApiResponse::success(
            serde_json::json!({ "ok": false, "message": e.to_string() }),
        ))),
    }
}
