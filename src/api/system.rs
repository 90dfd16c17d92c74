use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiError, AppState, types::ApiResponse};
use crate::db::MovieCounts;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub movies: MovieCounts,
    pub series_count: u64,
    pub active_downloads: usize,
}

pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<SystemStatus>>, ApiError> {
    let movies = state.shared.store.movies().count_by_state().await?;
    let series_count = state.shared.store.series().count().await?;
    let active_downloads = state.shared.store.downloads().active().await?.len();

    Ok(Json(ApiResponse::success(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        movies,
        series_count,
        active_downloads,
    })))
}
