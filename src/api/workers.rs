use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, AppState, types::ApiResponse};
use crate::workers::WorkerInfo;

pub async fn list_workers(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<Vec<WorkerInfo>>> {
    Json(ApiResponse::success(state.shared.workers.list().await))
}

pub async fn get_worker(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<WorkerInfo>>, ApiError> {
    let info = state
        .shared
        .workers
        .get(&id)
        .await
        .ok_or_else(|| ApiError::not_found("Worker", &id))?;

    Ok(Json(ApiResponse::success(info)))
}

pub async fn start_worker(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    state.shared.workers.start(&id, true).await?;
    Ok(Json(ApiResponse::success(format!("Worker {id} started"))))
}

pub async fn stop_worker(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    state.shared.workers.stop(&id).await?;
    Ok(Json(ApiResponse::success(format!("Worker {id} stopped"))))
}

pub async fn restart_worker(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    state.shared.workers.restart(&id).await?;
    Ok(Json(ApiResponse::success(format!("Worker {id} restarted"))))
}

pub async fn run_worker_now(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    state.shared.workers.run_now(&id).await?;
    Ok(Json(ApiResponse::success(format!("Worker {id} triggered"))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalRequest {
    pub interval_ms: u64,
}

pub async fn set_worker_interval(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<IntervalRequest>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    state
        .shared
        .workers
        .set_interval(&id, request.interval_ms)
        .await?;

    Ok(Json(ApiResponse::success(format!("Worker {id} interval updated"))))
}
