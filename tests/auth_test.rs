//! Integration tests for the identity middleware and the admin surface
//!
//! The admin middleware reads the ADMIN_TOKEN environment variable, so all
//! admin assertions live in a single test to keep the process environment
//! consistent under the parallel test runner.

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

async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

#[tokio::test]
async fn test_requests_without_identity_are_unauthorized() {
    let (app, _temp) = setup_test_app();

    for (method, uri) in [
        ("GET", "/api/bookmarks"),
        ("POST", "/api/bookmarks"),
        ("PATCH", "/api/bookmarks/some-id"),
        ("DELETE", "/api/bookmarks/some-id"),
        ("GET", "/api/labels"),
        ("POST", "/api/labels"),
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{method} {uri} must be rejected without an identity"
        );
    }
}

#[tokio::test]
async fn test_blank_subject_is_unauthorized() {
    let (app, _temp) = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/bookmarks")
                .header("x-auth-subject", "   ")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_account_created_on_first_login() {
    let (app, _temp) = setup_test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/bookmarks")
                .header("x-auth-subject", "subject-1")
                .header("x-auth-email", "subject-1@example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    // The account picked up the fallback default quota
    assert_eq!(body["quota"], 1000);
}

#[tokio::test]
async fn test_admin_surface() {
    // All admin assertions share one env value; see module docs.
    std::env::set_var("ADMIN_TOKEN", "test-admin-secret");

    let (app, _temp) = setup_test_app();

    // Wrong or missing credential is rejected
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/admin/users")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/admin/users")
                .header("Authorization", "wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A normal user identity does not open the admin surface either
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/admin/users")
                .header("x-auth-subject", "subject-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let admin = |method: &str, uri: &str, body: Option<Value>| {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", "test-admin-secret")
            .header("content-type", "application/json");
        match body {
            Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    };

    // The setting starts at the fallback
    let response = app
        .clone()
        .oneshot(admin("GET", "/api/admin/settings/default-quota", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["default_quota"], 1000);

    // Lower the default, then create an account: it inherits the new value
    let response = app
        .clone()
        .oneshot(admin(
            "PUT",
            "/api/admin/settings/default-quota",
            Some(json!({ "default_quota": 200 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/bookmarks")
                .header("x-auth-subject", "late-user")
                .header("x-auth-email", "late-user@example.com")
                .header("x-auth-name", "Late User")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = response_json(response.into_body()).await;
    assert_eq!(body["quota"], 200);

    // The user listing shows the account with its bookmark count
    let response = app
        .clone()
        .oneshot(admin("GET", "/api/admin/users?search=late-user", None))
        .await
        .unwrap();
    let body = response_json(response.into_body()).await;
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["quota"], 200);
    assert_eq!(body["data"][0]["bookmark_count"], 0);
    let user_id = body["data"][0]["id"].as_str().unwrap().to_string();

    // Patch the individual quota
    let response = app
        .clone()
        .oneshot(admin(
            "PATCH",
            &format!("/api/admin/users/{user_id}"),
            Some(json!({ "quota": 5 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["data"]["quota"], 5);

    // Patching a nonexistent user is a 404
    let response = app
        .oneshot(admin(
            "PATCH",
            "/api/admin/users/no-such-user",
            Some(json!({ "quota": 5 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
