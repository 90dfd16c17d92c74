//! HTTP surface tests against the full router over an in-memory store.

mod support;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use mediastack::api::{AppState, router};

use support::test_state;

async fn test_app() -> axum::Router {
    let shared = test_state().await;
    shared.register_default_workers().await;
    router(AppState::new(shared, None)).await
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn movie_crud_roundtrip() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/library/movies",
            json!({
                "tmdb_id": 603,
                "title": "The Matrix",
                "year": 1999,
                "root_folder": "/library/movies"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["monitored"], json!(true));

    let response = app
        .clone()
        .oneshot(get_request(&format!("/library/movies/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request("/library/movies?monitored=true"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/library/movies/{id}"),
            json!({ "monitored": false }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/library/movies/{id}?addExclusion=true"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request(&format!("/library/movies/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_movie_is_rejected() {
    let app = test_app().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/library/movies",
            json!({ "title": "  " }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn duplicate_movie_conflicts() {
    let app = test_app().await;

    let payload = json!({ "tmdb_id": 42, "title": "Dup", "year": 2020 });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/library/movies", payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(json_request("POST", "/library/movies", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn workers_are_listed_and_controllable() {
    let app = test_app().await;

    let response = app.clone().oneshot(get_request("/system/workers")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let workers = body["data"].as_array().unwrap();
    assert_eq!(workers.len(), 9);

    let ids: Vec<&str> = workers.iter().map(|w| w["id"].as_str().unwrap()).collect();
    for expected in [
        "download-sync",
        "import-list-sync",
        "library-refresh",
        "metadata-refresh",
        "missing-search",
        "cutoff-search",
        "rss-sync",
        "activity-cleanup",
        "database-backup",
    ] {
        assert!(ids.contains(&expected), "missing worker {expected}");
    }
    assert!(workers.iter().all(|w| w["status"] == json!("stopped")));

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/system/workers/activity-cleanup/start",
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request("/system/workers/activity-cleanup"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], json!("running"));

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/system/workers/activity-cleanup/interval",
            json!({ "intervalMs": 50 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The floor is 1000 ms.
    let response = app
        .clone()
        .oneshot(get_request("/system/workers/activity-cleanup"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["intervalMs"], json!(1000));

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/system/workers/activity-cleanup/stop",
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request("/system/workers/unknown-worker"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn backup_roundtrip_is_stable() {
    let app = test_app().await;

    // Seed something user-visible.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/library/movies",
            json!({ "tmdb_id": 777, "title": "Backup Me", "year": 2021 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Let the spawned metadata enrichment settle so both exports see the
    // same movie row.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let response = app.clone().oneshot(get_request("/system/backup")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let first = body_json(response).await;
    assert!(first["_meta"][0]["version"].is_number());
    assert_eq!(first["movies"].as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/system/backup/restore",
            json!({ "backup": first.clone() }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get_request("/system/backup")).await.unwrap();
    let mut second = body_json(response).await;

    // The _meta stamp differs between exports; the table payloads must
    // not.
    let mut first = first;
    first.as_object_mut().unwrap().remove("_meta");
    second.as_object_mut().unwrap().remove("_meta");
    assert_eq!(first, second);

    let response = app.oneshot(get_request("/system/backup/preview")).await.unwrap();
    let preview = body_json(response).await;
    assert_eq!(preview["data"]["movies"], json!(1));
}

#[tokio::test]
async fn blacklist_endpoints() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/library/movies",
            json!({ "tmdb_id": 900, "title": "Blacklist Target", "year": 2020 }),
        ))
        .await
        .unwrap();
    let movie_id = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/automation/blacklist",
            json!({
                "releaseTitle": "Blacklist.Target.2020.1080p.WEB-DL-BAD",
                "movieId": movie_id,
                "reason": "fake release"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request("/automation/blacklist"))
        .await
        .unwrap();
    let body = body_json(response).await;
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    let entry_id = entries[0]["id"].as_str().unwrap().to_string();

    // An unscoped entry is rejected.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/automation/blacklist",
            json!({ "releaseTitle": "Orphan.Release" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/automation/blacklist/{entry_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn activity_is_recorded_for_library_changes() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/library/movies",
            json!({ "tmdb_id": 1000, "title": "Activity Movie", "year": 2020 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request("/library/activity?entityType=movie"))
        .await
        .unwrap();
    let body = body_json(response).await;
    let entries = body["data"].as_array().unwrap();
    assert!(!entries.is_empty());
    assert_eq!(entries[0]["event_type"], json!("added"));
}

#[tokio::test]
async fn automation_search_validates_input() {
    let app = test_app().await;

    let response = app
        .oneshot(json_request("POST", "/automation/search", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn indexer_crud() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/automation/indexers",
            json!({
                "name": "Test Indexer",
                "baseUrl": "https://indexer.example",
                "apiKey": "secret",
                "categories": [2000, 5000]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let id = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/automation/indexers",
            json!({ "name": "Bad", "baseUrl": "not a url" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/automation/indexers/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
