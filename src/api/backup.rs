use axum::{Json, extract::State};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, AppState, types::ApiResponse};

pub async fn export_backup(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let backup = state.shared.backup.export().await?;
    Ok(Json(backup))
}

pub async fn preview_backup(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let preview = state.shared.backup.preview().await?;
    Ok(Json(ApiResponse::success(preview)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreRequest {
    pub backup: serde_json::Value,
    pub selected_tables: Option<Vec<String>>,
}

pub async fn restore_backup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RestoreRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if !request.backup.is_object() {
        return Err(ApiError::validation("Backup must be a JSON object"));
    }

    let restored = state
        .shared
        .backup
        .restore(&request.backup, request.selected_tables.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(
        serde_json::json!({ "restoredRows": restored }),
    )))
}
