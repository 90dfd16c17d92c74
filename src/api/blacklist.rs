use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, AppState, types::ApiResponse};
use crate::entities::release_blacklist;

pub async fn list_blacklist(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<release_blacklist::Model>>>, ApiError> {
    let entries = state.shared.store.blacklist().list().await?;
    Ok(Json(ApiResponse::success(entries)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistRequest {
    pub release_title: String,
    pub movie_id: Option<String>,
    pub series_id: Option<String>,
    pub season_number: Option<i32>,
    pub episode_number: Option<i32>,
    pub reason: Option<String>,
}

pub async fn add_to_blacklist(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BlacklistRequest>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    if request.release_title.trim().is_empty() {
        return Err(ApiError::validation("Release title must not be empty"));
    }
    if request.movie_id.is_none() && request.series_id.is_none() {
        return Err(ApiError::validation(
            "A blacklist entry must reference a movie or a series",
        ));
    }

    state
        .shared
        .store
        .blacklist()
        .add(
            &request.release_title,
            request.movie_id.as_deref(),
            request.series_id.as_deref(),
            request.season_number,
            request.episode_number,
            request.reason.as_deref(),
        )
        .await?;

    Ok(Json(ApiResponse::success("Release blacklisted".to_string())))
}

pub async fn remove_from_blacklist(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    state.shared.store.blacklist().remove(&id).await?;
    Ok(Json(ApiResponse::success("Blacklist entry removed".to_string())))
}
