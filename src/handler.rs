//! HTTP request handlers for the bookmarking API
//!
//! This module implements the request-shaping layer for:
//! - Saving bookmarks with preview enrichment and quota enforcement
//! - Listing bookmarks with search, label filter, sort, and pagination
//! - Editing notes and deleting bookmarks, scoped to the owner
//! - Label management (create, list, rename, delete)
//! - The admin surface (default quota setting, user listing, quota patches)
//!
//! Domain rules live in [`crate::store`]; handlers validate and translate.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::database::AppState;
use crate::error::ApiError;
use crate::link;
use crate::model::{
    AdminUserListParams, CreateBookmarkRequest, CreateLabelRequest, ListParams,
    RenameLabelRequest, UpdateDefaultQuotaRequest, UpdateNoteRequest, UpdateQuotaRequest, User,
};
use crate::query::ListQuery;
use crate::store;

/// Saves a bookmark for the authenticated user
///
/// This handler:
/// 1. Validates the URL against the supported-host allowlist
/// 2. Canonicalizes it for deduplication
/// 3. Screens for duplicates and quota exhaustion
/// 4. Resolves the preview through the oEmbed collaborator
/// 5. Persists the bookmark with its label associations
///
/// # Request Body
///
/// ```json
/// {
///   "url": "https://www.threads.net/@alice/post/xyz",
///   "note": "optional note",
///   "label_ids": []
/// }
/// ```
///
/// # Response
///
/// - **201 Created** - Bookmark saved
/// - **400 Bad Request** - URL not on the allowlist, unreachable link, bad
///   label ids, or an over-long note
/// - **409 Conflict** - Same canonical URL already saved; body carries the
///   existing bookmark's id
/// - **429 Too Many Requests** - The owner's storage quota is full
pub async fn create_bookmark(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateBookmarkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !link::is_valid_post_url(&payload.url) {
        return Err(ApiError::Validation("Invalid Threads URL".to_string()));
    }
    let canonical_url = link::canonicalize_url(&payload.url);

    // Duplicate and quota answers must not depend on whether the post is
    // still resolvable, so screen before going outbound.
    store::check_save_allowed(&state.db, &user, &canonical_url)?;

    // The save path requires a resolvable preview: a link the embed endpoint
    // cannot answer for is almost always deleted, private, or mistyped.
    let preview = match state.preview.fetch(&canonical_url).await {
        Ok(Some(preview)) => preview,
        Ok(None) => return Err(ApiError::InvalidLink),
        Err(err) => {
            tracing::warn!(url = %canonical_url, error = %err, "preview fetch failed");
            return Err(ApiError::InvalidLink);
        }
    };

    let saved = store::create_bookmark(
        &state.db,
        &user,
        &canonical_url,
        payload.note.filter(|note| !note.is_empty()),
        &payload.label_ids,
        preview,
    )?;

    tracing::info!(user_id = %user.id, bookmark_id = %saved.bookmark.id, "bookmark saved");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": saved })),
    ))
}

/// Lists the authenticated user's bookmarks
///
/// # Query Parameters
///
/// - `search` (optional) - Case-insensitive substring matched against note,
///   author name, author handle, and label names
/// - `label_id` (optional) - Restrict to bookmarks carrying this label
/// - `sort_order` (optional) - `newest` (default) or `oldest`
/// - `limit` (optional) - Page size, defaults to 10, at most 100
/// - `offset` (optional) - Items to skip, clamped to non-negative
///
/// # Response
///
/// ```json
/// {
///   "data": [...],
///   "total": 42,
///   "has_more": true,
///   "quota": 1000
/// }
/// ```
pub async fn list_bookmarks(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = ListQuery::from(params);
    let response = store::list_bookmarks(&state.db, &user, &query)?;
    Ok(Json(response))
}

/// Edits the note on an owned bookmark
///
/// # Response
///
/// - **200 OK** - Note updated
/// - **400 Bad Request** - Note exceeds 1000 characters (stored note untouched)
/// - **403 Forbidden** - Bookmark belongs to another user
/// - **404 Not Found** - No such bookmark
pub async fn update_note(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = store::update_note(&state.db, &user.id, &id, payload.note)?;
    Ok(Json(json!({ "success": true, "data": updated })))
}

/// Deletes an owned bookmark
///
/// Removes the bookmark and its label associations. Labels themselves are
/// untouched.
pub async fn delete_bookmark(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    store::delete_bookmark(&state.db, &user.id, &id)?;
    Ok(Json(json!({ "success": true, "deleted_id": id })))
}

/// Creates a label for the authenticated user
///
/// # Response
///
/// - **201 Created** - Label created; color defaulted when omitted
/// - **400 Bad Request** - Empty name
/// - **409 Conflict** - A label with this name (any casing) already exists
pub async fn create_label(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateLabelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let label = store::create_label(&state.db, &user.id, &payload.name, payload.color)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": label })),
    ))
}

/// Lists the authenticated user's labels, sorted by name
pub async fn list_labels(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, ApiError> {
    let labels = store::list_labels(&state.db, &user.id)?;
    Ok(Json(json!({ "data": labels })))
}

/// Renames an owned label
///
/// Renaming to a different casing of the same name is allowed; colliding with
/// another label's name is a 409.
pub async fn rename_label(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    Json(payload): Json<RenameLabelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let label = store::rename_label(&state.db, &user.id, &id, &payload.name)?;
    Ok(Json(json!({ "success": true, "data": label })))
}

/// Deletes an owned label and detaches it from every bookmark
///
/// Never deletes bookmarks.
pub async fn delete_label(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    store::delete_label(&state.db, &user.id, &id)?;
    Ok(Json(json!({ "success": true, "deleted_id": id })))
}

/// Reads the default storage quota for newly created users (admin)
pub async fn get_default_quota(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let quota = store::default_quota(&state.db)?;
    Ok(Json(json!({ "default_quota": quota })))
}

/// Writes the default storage quota for newly created users (admin)
///
/// Takes effect for accounts created after the write; existing accounts keep
/// their quota until patched individually.
pub async fn put_default_quota(
    State(state): State<AppState>,
    Json(payload): Json<UpdateDefaultQuotaRequest>,
) -> Result<impl IntoResponse, ApiError> {
    store::set_default_quota(&state.db, payload.default_quota)?;
    Ok(Json(json!({
        "success": true,
        "default_quota": payload.default_quota
    })))
}

/// Lists all accounts with bookmark counts (admin)
///
/// # Query Parameters
///
/// - `page` (optional) - Page number, starts from 1 (default: 1)
/// - `limit` (optional) - Items per page, max 100 (default: 10)
/// - `search` (optional) - Case-insensitive substring on name and email
pub async fn admin_list_users(
    State(state): State<AppState>,
    Query(params): Query<AdminUserListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = params.page.unwrap_or(1).max(1) as usize;
    let limit = params.limit.unwrap_or(10).clamp(1, 100) as usize;
    let search = params.search.as_deref().filter(|search| !search.is_empty());

    let (rows, total) = store::list_users(&state.db, page, limit, search)?;
    let total_pages = total.div_ceil(limit as u64);

    Ok(Json(json!({
        "data": rows,
        "meta": {
            "total": total,
            "page": page,
            "limit": limit,
            "total_pages": total_pages
        }
    })))
}

/// Patches one user's storage quota (admin)
pub async fn admin_update_quota(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateQuotaRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = store::set_user_quota(&state.db, &id, payload.quota)?;
    Ok(Json(json!({ "success": true, "data": user })))
}
