use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, AppState, types::ApiResponse};
use crate::constants::limits;
use crate::db::MovieFilter;
use crate::models::movie::{MinimumAvailability, Movie};
use crate::services::auto_search::SearchOutcome;
use crate::services::library::NewMovie;
use crate::services::naming::{FileNamer, NamingContext};

#[derive(Debug, Deserialize)]
pub struct MovieListQuery {
    pub monitored: Option<bool>,
    pub missing: Option<bool>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Movie plus the state of any download currently in flight for it.
#[derive(Debug, Serialize)]
pub struct MovieWithDownload {
    #[serde(flatten)]
    pub movie: Movie,
    pub download_status: Option<String>,
    pub download_progress: Option<f64>,
}

pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MovieListQuery>,
) -> Result<Json<ApiResponse<Vec<MovieWithDownload>>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(limits::DEFAULT_PAGE_SIZE)
        .min(limits::MAX_PAGE_SIZE);

    let movies = state
        .shared
        .library
        .list_movies(&MovieFilter {
            monitored: query.monitored,
            missing: query.missing,
            limit: Some(limit),
            offset: query.offset,
        })
        .await?;

    let active = state.shared.store.downloads().active().await?;

    let items = movies
        .into_iter()
        .map(|movie| {
            let download = active
                .iter()
                .find(|d| d.movie_id.as_deref() == Some(movie.id.as_str()));
            MovieWithDownload {
                download_status: download.map(|d| d.status.as_str().to_string()),
                download_progress: download.map(|d| d.progress),
                movie,
            }
        })
        .collect();

    Ok(Json(ApiResponse::success(items)))
}

pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Movie>>, ApiError> {
    let movie = state
        .shared
        .store
        .movies()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Movie", &id))?;

    Ok(Json(ApiResponse::success(movie)))
}

pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewMovie>,
) -> Result<Json<ApiResponse<Movie>>, ApiError> {
    if new.title.trim().is_empty() {
        return Err(ApiError::validation("Title must not be empty"));
    }

    let namer = FileNamer::new(state.shared.store.naming().get().await?);
    let movie = state.shared.library.create_movie(new, &namer).await?;

    // Metadata lands asynchronously; the placeholder responds now.
    if movie.tmdb_id.is_some() {
        let metadata = state.shared.metadata.clone();
        let movie_id = movie.id.clone();
        tokio::spawn(async move {
            if let Err(e) = metadata.enrich_movie(&movie_id).await {
                tracing::warn!(movie_id = %movie_id, error = %e, "Movie enrichment failed");
            }
        });
    }

    Ok(Json(ApiResponse::success(movie)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMovie {
    pub monitored: Option<bool>,
    pub minimum_availability: Option<MinimumAvailability>,
    pub quality_profile_id: Option<String>,
    pub root_folder: Option<String>,
}

pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<UpdateMovie>,
) -> Result<Json<ApiResponse<Movie>>, ApiError> {
    let mut movie = state
        .shared
        .store
        .movies()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Movie", &id))?;

    if let Some(monitored) = update.monitored
        && monitored != movie.monitored
    {
        state.shared.library.set_movie_monitored(&id, monitored).await?;
        movie.monitored = monitored;
    }
    if let Some(availability) = update.minimum_availability {
        movie.minimum_availability = availability;
    }
    if let Some(profile_id) = update.quality_profile_id {
        state
            .shared
            .store
            .quality()
            .get_profile(&profile_id)
            .await?
            .ok_or_else(|| ApiError::validation("Unknown quality profile"))?;
        movie.quality_profile_id = Some(profile_id);
    }
    if let Some(root) = update.root_folder {
        movie.root_folder = Some(root);
    }

    state.shared.store.movies().update(&movie).await?;
    Ok(Json(ApiResponse::success(movie)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteQuery {
    #[serde(default)]
    pub delete_files: bool,
    #[serde(default)]
    pub add_exclusion: bool,
}

pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    state
        .shared
        .library
        .delete_movie(&id, query.delete_files, query.add_exclusion)
        .await?;

    Ok(Json(ApiResponse::success("Movie deleted".to_string())))
}

pub async fn search_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SearchOutcome>>, ApiError> {
    let outcome = state
        .shared
        .auto_search
        .search_and_download_movie(&id, false)
        .await?;

    Ok(Json(ApiResponse::success(outcome)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSearchRequest {
    pub ids: Vec<String>,
}

/// Kick off searches for a set of movies in the background.
pub async fn bulk_search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BulkSearchRequest>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    if request.ids.is_empty() {
        return Err(ApiError::validation("No movie ids supplied"));
    }

    let auto_search = state.shared.auto_search.clone();
    let count = request.ids.len();
    tokio::spawn(async move {
        for id in request.ids {
            if let Err(e) = auto_search.search_and_download_movie(&id, false).await {
                tracing::warn!(movie_id = %id, error = %e, "Bulk search item failed");
            }
            tokio::time::sleep(crate::constants::search::SIBLING_PAUSE).await;
        }
    });

    Ok(Json(ApiResponse::success(format!(
        "Search started for {count} movies"
    ))))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenamePreview {
    pub current_path: Option<String>,
    pub proposed_path: Option<String>,
    pub changed: bool,
}

fn proposed_movie_path(movie: &Movie, namer: &FileNamer) -> Option<String> {
    let folder = movie.folder_path.as_deref()?;
    let current = movie.file_path.as_deref()?;
    let extension = std::path::Path::new(current)
        .extension()
        .map_or("mkv", |e| e.to_str().unwrap_or("mkv"));

    let context = NamingContext {
        quality: movie.quality.clone(),
        is_proper: movie.is_proper,
        is_repack: movie.is_repack,
        media_info: None,
        release_group: movie.release_group.clone(),
    };

    Some(format!(
        "{folder}/{}.{extension}",
        namer.movie_file_name(movie, &context)
    ))
}

pub async fn rename_preview(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<RenamePreview>>, ApiError> {
    let movie = state
        .shared
        .store
        .movies()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Movie", &id))?;

    let namer = FileNamer::new(state.shared.store.naming().get().await?);
    let proposed = proposed_movie_path(&movie, &namer);
    let changed = proposed.is_some() && proposed.as_deref() != movie.file_path.as_deref();

    Ok(Json(ApiResponse::success(RenamePreview {
        current_path: movie.file_path,
        proposed_path: proposed,
        changed,
    })))
}

pub async fn rename_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<RenamePreview>>, ApiError> {
    let movie = state
        .shared
        .store
        .movies()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Movie", &id))?;

    let namer = FileNamer::new(state.shared.store.naming().get().await?);
    let Some(proposed) = proposed_movie_path(&movie, &namer) else {
        return Err(ApiError::validation("Movie has no file to rename"));
    };
    let current = movie.file_path.clone().unwrap_or_default();

    if proposed != current {
        tokio::fs::rename(&current, &proposed)
            .await
            .map_err(|e| ApiError::Internal(format!("Rename failed: {e}")))?;

        state
            .shared
            .store
            .movies()
            .update_file(
                &id,
                &proposed,
                movie.file_size,
                movie.quality.as_deref().unwrap_or("Unknown"),
                None,
                movie.release_group.as_deref(),
                movie.is_proper,
                movie.is_repack,
            )
            .await?;
    }

    Ok(Json(ApiResponse::success(RenamePreview {
        changed: proposed != current,
        current_path: Some(current),
        proposed_path: Some(proposed),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualImportRequest {
    pub source_path: String,
    #[serde(default)]
    pub delete_source: bool,
}

pub async fn manual_import(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ManualImportRequest>,
) -> Result<Json<ApiResponse<crate::services::importer::ImportOutcome>>, ApiError> {
    let source = std::path::Path::new(&request.source_path);
    if !source.exists() {
        return Err(ApiError::validation("Source path does not exist"));
    }

    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    // The importer's empty-directory cleanup is bounded by the source
    // root; a bare file path would bound it to itself and never fire.
    let source_root = if source.is_file() {
        source.parent().unwrap_or(source)
    } else {
        source
    };

    let outcome = state
        .shared
        .importer
        .import_movie(&id, source_root, &file_name, !request.delete_source)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(ApiResponse::success(outcome)))
}

pub async fn related_movies(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<crate::services::library::RelatedMovie>>>, ApiError> {
    let related = state.shared.library.related_movies(&id, 10).await?;
    Ok(Json(ApiResponse::success(related)))
}
