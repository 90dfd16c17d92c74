use axum::{Json, extract::State};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, AppState, types::ApiResponse};
use crate::services::auto_search::SearchOutcome;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub movie_id: Option<String>,
    pub episode_id: Option<String>,
    #[serde(default)]
    pub force_upgrade: bool,
}

/// Search-and-grab for a single movie or episode.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<ApiResponse<SearchOutcome>>, ApiError> {
    let outcome = match (&request.movie_id, &request.episode_id) {
        (Some(movie_id), None) => {
            state
                .shared
                .auto_search
                .search_and_download_movie(movie_id, request.force_upgrade)
                .await?
        }
        (None, Some(episode_id)) => {
            state
                .shared
                .auto_search
                .search_and_download_episode(episode_id, request.force_upgrade)
                .await?
        }
        _ => {
            return Err(ApiError::validation(
                "Exactly one of movieId or episodeId is required",
            ));
        }
    };

    Ok(Json(ApiResponse::success(outcome)))
}
