use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

mod activity;
mod backup;
mod blacklist;
mod download_clients;
mod downloads;
mod error;
mod import_lists;
mod indexers;
mod movies;
mod observability;
mod search;
mod series;
mod system;
mod types;
mod workers;

pub use error::ApiError;
pub use types::{ApiResponse, Page};

/// API-facing state: the shared core plus HTTP-only extras.
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn new(shared: Arc<SharedState>, prometheus: Option<PrometheusHandle>) -> Arc<Self> {
        Arc::new(Self {
            shared,
            start_time: std::time::Instant::now(),
            prometheus,
        })
    }
}

pub async fn router(state: Arc<AppState>) -> Router {
    let cors_origins = {
        let config = state.shared.config.read().await;
        config.server.cors_allowed_origins.clone()
    };

    let library = Router::new()
        .route("/movies", get(movies::list_movies))
        .route("/movies", post(movies::create_movie))
        .route("/movies/bulk/search", post(movies::bulk_search))
        .route("/movies/{id}", get(movies::get_movie))
        .route("/movies/{id}", put(movies::update_movie))
        .route("/movies/{id}", delete(movies::delete_movie))
        .route("/movies/{id}/search", post(movies::search_movie))
        .route("/movies/{id}/rename", get(movies::rename_preview))
        .route("/movies/{id}/rename", post(movies::rename_movie))
        .route("/movies/{id}/manual-import", post(movies::manual_import))
        .route("/movies/{id}/related", get(movies::related_movies))
        .route("/series", get(series::list_series))
        .route("/series", post(series::create_series))
        .route("/series/{id}", get(series::get_series))
        .route("/series/{id}", put(series::update_series))
        .route("/series/{id}", delete(series::delete_series))
        .route("/series/{id}/seasons", get(series::list_seasons))
        .route(
            "/series/{id}/seasons/{season}/monitor",
            put(series::set_season_monitored),
        )
        .route("/series/{id}/episodes", get(series::list_episodes))
        .route("/episodes/{id}", get(series::get_episode))
        .route("/episodes/{id}", put(series::update_episode))
        .route("/episodes/{id}/file", delete(series::delete_episode_file))
        .route("/episodes/{id}/search", post(series::search_episode))
        .route("/activity", get(activity::list_activity))
        .route("/activity/stream", get(activity::stream_activity));

    let system = Router::new()
        .route("/status", get(system::status))
        .route("/workers", get(workers::list_workers))
        .route("/workers/{id}", get(workers::get_worker))
        .route("/workers/{id}/start", post(workers::start_worker))
        .route("/workers/{id}/stop", post(workers::stop_worker))
        .route("/workers/{id}/restart", post(workers::restart_worker))
        .route("/workers/{id}/run-now", post(workers::run_worker_now))
        .route("/workers/{id}/interval", put(workers::set_worker_interval))
        .route("/backup", get(backup::export_backup))
        .route("/backup/preview", get(backup::preview_backup))
        .route("/backup/restore", post(backup::restore_backup));

    let automation = Router::new()
        .route("/search", post(search::search))
        .route("/downloads", get(downloads::list_downloads))
        .route("/downloads/{id}", delete(downloads::cancel_download))
        .route("/blacklist", get(blacklist::list_blacklist))
        .route("/blacklist", post(blacklist::add_to_blacklist))
        .route("/blacklist/{id}", delete(blacklist::remove_from_blacklist))
        .route("/import-lists", get(import_lists::list_lists))
        .route("/import-lists", post(import_lists::create_list))
        .route("/import-lists/{id}", put(import_lists::update_list))
        .route("/import-lists/{id}", delete(import_lists::delete_list))
        .route("/import-lists/{id}/sync", post(import_lists::sync_list_now))
        .route("/indexers", get(indexers::list_indexers))
        .route("/indexers", post(indexers::create_indexer))
        .route("/indexers/{id}", put(indexers::update_indexer))
        .route("/indexers/{id}", delete(indexers::delete_indexer))
        .route("/indexers/{id}/test", post(indexers::test_indexer))
        .route("/download-clients", get(download_clients::list_clients))
        .route("/download-clients", post(download_clients::create_client))
        .route("/download-clients/{id}", put(download_clients::update_client))
        .route(
            "/download-clients/{id}",
            delete(download_clients::delete_client),
        )
        .route(
            "/download-clients/{id}/test",
            post(download_clients::test_client),
        );

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/library", library)
        .nest("/system", system)
        .nest("/automation", automation)
        .route("/metrics", get(observability::metrics_handler))
        .with_state(state)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::track_metrics))
}
