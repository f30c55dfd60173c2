//! Route definitions for the bookmarking API
//!
//! This module configures all HTTP routes and maps them to their respective
//! handlers. It creates the Axum router with the application state.

use axum::routing::{get, patch};
use axum::{middleware, Router};

use crate::database::AppState;
use crate::handler::{
    admin_list_users, admin_update_quota, create_bookmark, create_label, delete_bookmark,
    delete_label, get_default_quota, list_bookmarks, list_labels, put_default_quota, rename_label,
    update_note,
};
use crate::middleware::{admin_middleware, identity_middleware};

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// User surface (requires an authenticated identity):
/// - `GET    /api/bookmarks` - List bookmarks with search/filter/sort/pagination
/// - `POST   /api/bookmarks` - Save a bookmark
/// - `PATCH  /api/bookmarks/{id}` - Edit the note
/// - `DELETE /api/bookmarks/{id}` - Delete a bookmark
/// - `GET    /api/labels` - List labels
/// - `POST   /api/labels` - Create a label
/// - `PATCH  /api/labels/{id}` - Rename a label
/// - `DELETE /api/labels/{id}` - Delete a label
///
/// Admin surface (requires the separate admin token):
/// - `GET/PUT /api/admin/settings/default-quota` - Default quota setting
/// - `GET     /api/admin/users` - Paginated, searchable user listing
/// - `PATCH   /api/admin/users/{id}` - Patch one user's quota
///
/// # Arguments
///
/// * `state` - Application state containing the database and preview fetcher
pub fn create_app(state: AppState) -> Router {
    // User-facing routes behind the identity middleware
    let user_routes = Router::new()
        .route("/bookmarks", get(list_bookmarks).post(create_bookmark))
        .route(
            "/bookmarks/{id}",
            patch(update_note).delete(delete_bookmark),
        )
        .route("/labels", get(list_labels).post(create_label))
        .route("/labels/{id}", patch(rename_label).delete(delete_label))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identity_middleware,
        ));

    // Admin routes behind the separate admin credential
    let admin_routes = Router::new()
        .route(
            "/settings/default-quota",
            get(get_default_quota).put(put_default_quota),
        )
        .route("/users", get(admin_list_users))
        .route("/users/{id}", patch(admin_update_quota))
        .layer(middleware::from_fn(admin_middleware));

    let api_routes = Router::new()
        .merge(user_routes)
        .nest("/admin", admin_routes);

    Router::new()
        // Mount everything under /api
        .nest("/api", api_routes)
        // Inject the application state into all handlers
        .with_state(state)
}
