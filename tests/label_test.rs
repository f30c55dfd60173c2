//! Integration tests for label management
//!
//! Covers creation defaults, case-insensitive per-user uniqueness, renaming,
//! and the non-destructive delete (label deletion never touches bookmarks).

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tower::ServiceExt;

use async_trait::async_trait;
use threadmark::database::{init_db, AppState};
use threadmark::preview::{Preview, PreviewError, PreviewFetcher};
use threadmark::route::create_app;

struct StubPreview;

#[async_trait]
impl PreviewFetcher for StubPreview {
    async fn fetch(&self, _canonical_url: &str) -> Result<Option<Preview>, PreviewError> {
        Ok(Some(Preview::default()))
    }
}

fn setup_test_app() -> (axum::Router, NamedTempFile) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = temp_db.path().to_str().unwrap();

    let db = init_db(db_path).expect("Failed to initialize test database");
    let state = AppState {
        db: Arc::new(db),
        preview: Arc::new(StubPreview),
    };

    (create_app(state), temp_db)
}

fn authed_request(method: &str, uri: &str, subject: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-auth-subject", subject)
        .header("content-type", "application/json");

    match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

async fn create_label(app: &axum::Router, subject: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(authed_request("POST", "/api/labels", subject, Some(body)))
        .await
        .unwrap();
    let status = response.status();
    (status, response_json(response.into_body()).await)
}

#[tokio::test]
async fn test_create_label_defaults_color() {
    let (app, _temp) = setup_test_app();

    let (status, body) = create_label(&app, "user_a", json!({ "name": "Tech" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["name"], "Tech");
    assert_eq!(body["data"]["color"], "#8B5CF6");

    let (status, body) =
        create_label(&app, "user_a", json!({ "name": "Cooking", "color": "#FF0000" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["color"], "#FF0000");
}

#[tokio::test]
async fn test_label_name_trimmed_and_required() {
    let (app, _temp) = setup_test_app();

    let (status, body) = create_label(&app, "user_a", json!({ "name": "  Reading  " })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["name"], "Reading");

    let (status, _) = create_label(&app, "user_a", json!({ "name": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_label_uniqueness_is_case_insensitive_per_user() {
    let (app, _temp) = setup_test_app();

    let (status, _) = create_label(&app, "user_a", json!({ "name": "Work" })).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = create_label(&app, "user_a", json!({ "name": "work" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "duplicate");

    // A different user is free to use the same name
    let (status, _) = create_label(&app, "user_b", json!({ "name": "work" })).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_rename_label() {
    let (app, _temp) = setup_test_app();

    // End-to-end scenario: "Tech" renamed to "tech" succeeds, then "TECH"
    // collides
    let (_, body) = create_label(&app, "user_a", json!({ "name": "Tech" })).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(authed_request(
            "PATCH",
            &format!("/api/labels/{id}"),
            "user_a",
            Some(json!({ "name": "tech" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["data"]["name"], "tech");

    let (status, _) = create_label(&app, "user_a", json!({ "name": "TECH" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Renaming onto another label's name collides too
    let (_, body) = create_label(&app, "user_a", json!({ "name": "News" })).await;
    let other_id = body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(authed_request(
            "PATCH",
            &format!("/api/labels/{other_id}"),
            "user_a",
            Some(json!({ "name": "Tech" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(authed_request(
            "PATCH",
            "/api/labels/no-such-label",
            "user_a",
            Some(json!({ "name": "x" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_labels_sorted_by_name() {
    let (app, _temp) = setup_test_app();

    for name in ["zebra", "Apple", "mango"] {
        create_label(&app, "user_a", json!({ "name": name })).await;
    }

    let response = app
        .oneshot(authed_request("GET", "/api/labels", "user_a", None))
        .await
        .unwrap();
    let body = response_json(response.into_body()).await;

    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|label| label["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Apple", "mango", "zebra"]);
}

#[tokio::test]
async fn test_delete_label_never_deletes_bookmarks() {
    let (app, _temp) = setup_test_app();

    let (_, body) = create_label(&app, "user_a", json!({ "name": "Tech" })).await;
    let label_id = body["data"]["id"].as_str().unwrap().to_string();

    // Save a bookmark carrying the label
    let response = app
        .clone()
        .oneshot(authed_request(
            "POST",
            "/api/bookmarks",
            "user_a",
            Some(json!({
                "url": "https://www.threads.net/@alice/post/1",
                "label_ids": [label_id]
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["data"]["labels"][0]["name"], "Tech");

    // Delete the label
    let response = app
        .clone()
        .oneshot(authed_request(
            "DELETE",
            &format!("/api/labels/{label_id}"),
            "user_a",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The bookmark survives, merely unlabeled
    let response = app
        .clone()
        .oneshot(authed_request("GET", "/api/bookmarks", "user_a", None))
        .await
        .unwrap();
    let body = response_json(response.into_body()).await;
    assert_eq!(body["total"], 1);
    assert!(body["data"][0]["labels"].as_array().unwrap().is_empty());

    // And the name becomes available again
    let (status, _) = create_label(&app, "user_a", json!({ "name": "tech" })).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_cannot_attach_another_users_label() {
    let (app, _temp) = setup_test_app();

    let (_, body) = create_label(&app, "user_b", json!({ "name": "Theirs" })).await;
    let foreign_label = body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(authed_request(
            "POST",
            "/api/bookmarks",
            "user_a",
            Some(json!({
                "url": "https://www.threads.net/@alice/post/1",
                "label_ids": [foreign_label]
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["code"], "invalid_reference");
}
