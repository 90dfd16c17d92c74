use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;

use super::AppState;

/// Request counter and latency histogram per method/path/status.
pub async fn track_metrics(request: Request<Body>, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    let labels = [
        ("method", method),
        ("path", path),
        ("status", status),
    ];

    metrics::counter!("mediastack_http_requests_total", &labels).increment(1);
    metrics::histogram!("mediastack_http_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());

    response
}

/// Rendered Prometheus registry, when metrics are enabled.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match &state.prometheus {
        Some(handle) => handle.render().into_response(),
        None => (
            axum::http::StatusCode::NOT_FOUND,
            "Metrics are disabled".to_string(),
        )
            .into_response(),
    }
}
