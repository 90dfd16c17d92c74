use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, AppState, types::ApiResponse};
use crate::clients::build_download_client;
use crate::models::download::{Download, DownloadState};

#[derive(Debug, Deserialize)]
pub struct DownloadListQuery {
    pub status: Option<String>,
    pub limit: Option<u64>,
}

pub async fn list_downloads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DownloadListQuery>,
) -> Result<Json<ApiResponse<Vec<Download>>>, ApiError> {
    let status = query.status.as_deref().map(DownloadState::parse);
    let downloads = state
        .shared
        .store
        .downloads()
        .list(status, query.limit.unwrap_or(100))
        .await?;

    Ok(Json(ApiResponse::success(downloads)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelQuery {
    #[serde(default)]
    pub delete_files: bool,
}

/// Cancel an in-flight download: remove the client job, then mark the
/// row cancelled. Terminal downloads stay as they are.
pub async fn cancel_download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<CancelQuery>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let download = state
        .shared
        .store
        .downloads()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Download", &id))?;

    if download.status.is_terminal() {
        return Err(ApiError::Conflict(format!(
            "Download is already {}",
            download.status
        )));
    }

    if let (Some(client_id), Some(job_id)) =
        (&download.download_client_id, &download.client_job_id)
        && let Some(row) = state.shared.store.download_clients().get(client_id).await?
    {
        let timeout = std::time::Duration::from_secs(30);
        let client = build_download_client(&row, timeout);
        if let Err(e) = client.remove(job_id, query.delete_files).await {
            tracing::warn!(error = %e, "Failed to remove job from download client");
        }
    }

    state
        .shared
        .store
        .downloads()
        .set_status(&id, DownloadState::Cancelled, None)
        .await?;

    Ok(Json(ApiResponse::success("Download cancelled".to_string())))
}
