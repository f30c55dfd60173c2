//! Data models for the bookmarking service
//!
//! This module defines all the data structures used throughout the application,
//! including database record structures and request/response models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user account, created on first successful login
///
/// The identity provider hands us a stable external subject; everything else
/// here is owned by this service, including the per-user storage quota.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    /// Internal user id (UUID), used in every composite index key
    pub id: String,

    /// Stable subject issued by the identity provider
    pub subject: String,

    /// Email address, if the provider shared one
    pub email: Option<String>,

    /// Display name, if the provider shared one
    pub display_name: Option<String>,

    /// Avatar URL, if the provider shared one
    pub avatar_url: Option<String>,

    /// Maximum number of bookmarks this user may hold simultaneously
    pub quota: u64,

    /// Timestamp when this account was created
    pub created_at: DateTime<Utc>,
}

/// A saved reference to an external post
///
/// The URL is always stored in canonical form; (user_id, url) is unique and
/// re-saving the same canonical URL is rejected as a duplicate.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Bookmark {
    /// Unique bookmark id (UUID)
    pub id: String,

    /// Internal id of the owning user
    pub user_id: String,

    /// Canonical source URL of the saved post
    pub url: String,

    /// Plain-text snippet extracted from the oEmbed HTML fragment
    pub snippet: Option<String>,

    /// Thumbnail URL reported by the oEmbed endpoint
    pub thumbnail_url: Option<String>,

    /// Author display name
    pub author_name: Option<String>,

    /// Author handle without the leading '@'
    pub author_handle: Option<String>,

    /// Free-text note written by the owner, at most 1000 characters
    pub note: Option<String>,

    /// Timestamp when this bookmark was created
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last note edit
    pub updated_at: DateTime<Utc>,
}

/// A named, colored, per-user categorical tag
///
/// Names are unique per user, compared case-insensitively.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Label {
    /// Unique label id (UUID)
    pub id: String,

    /// Internal id of the owning user
    pub user_id: String,

    /// Label name as the user typed it (trimmed)
    pub name: String,

    /// Display color, defaulted when not supplied at creation
    pub color: String,

    /// Timestamp when this label was created
    pub created_at: DateTime<Utc>,
}

/// A bookmark together with its associated labels
///
/// The listing handlers always return this explicit projection; raw join
/// rows never leave the store layer.
#[derive(Serialize, Debug, Clone)]
pub struct BookmarkWithLabels {
    #[serde(flatten)]
    pub bookmark: Bookmark,

    /// Labels associated with this bookmark, owned by the same user
    pub labels: Vec<Label>,
}

/// Request payload for saving a bookmark
///
/// # Example
/// ```json
/// {
///   "url": "https://www.threads.net/@alice/post/xyz",
///   "note": "good thread on borrow checking",
///   "label_ids": ["..."]
/// }
/// ```
#[derive(Deserialize)]
pub struct CreateBookmarkRequest {
    /// The post URL to save; canonicalized and validated against the
    /// supported-host allowlist before anything is persisted
    pub url: String,

    /// Optional free-text note, at most 1000 characters
    pub note: Option<String>,

    /// Optional label ids to attach at save time; every id must reference a
    /// label owned by the requesting user
    #[serde(default)]
    pub label_ids: Vec<String>,
}

/// Request payload for editing a bookmark's note
#[derive(Deserialize)]
pub struct UpdateNoteRequest {
    /// New note text; null or absent clears the note
    pub note: Option<String>,
}

/// Sort order for bookmark listings, by creation time
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

/// Query parameters for listing bookmarks
///
/// # Example
/// Query string: `?search=rust&label_id=...&sort_order=oldest&limit=20&offset=40`
#[derive(Deserialize, Default)]
pub struct ListParams {
    /// Case-insensitive substring matched against note, author name, author
    /// handle, and associated label names
    pub search: Option<String>,

    /// Restrict results to bookmarks carrying this one label
    pub label_id: Option<String>,

    /// Newest first (default) or oldest first
    pub sort_order: Option<SortOrder>,

    /// Page size; defaults to 10, clamped to at most 100
    pub limit: Option<i64>,

    /// Number of items to skip; negative values are treated as 0
    pub offset: Option<i64>,
}

/// Response envelope for bookmark listings
#[derive(Serialize)]
pub struct ListBookmarksResponse {
    pub data: Vec<BookmarkWithLabels>,

    /// Count of bookmarks matching the filter, ignoring pagination
    pub total: u64,

    /// Whether another page exists beyond offset + limit
    pub has_more: bool,

    /// The owner's storage quota, for display next to the total
    pub quota: u64,
}

/// Request payload for creating a label
#[derive(Deserialize)]
pub struct CreateLabelRequest {
    /// Label name; trimmed, required non-empty
    pub name: String,

    /// Optional display color; defaulted when omitted
    pub color: Option<String>,
}

/// Request payload for renaming a label
#[derive(Deserialize)]
pub struct RenameLabelRequest {
    /// New name; same uniqueness rule as creation, excluding the label itself
    pub name: String,
}

/// Query parameters for the admin user listing
#[derive(Deserialize, Default)]
pub struct AdminUserListParams {
    /// Page number, starts from 1
    pub page: Option<i64>,

    /// Items per page; defaults to 10, clamped to at most 100
    pub limit: Option<i64>,

    /// Case-insensitive substring matched against display name and email
    pub search: Option<String>,
}

/// One row of the admin user listing
#[derive(Serialize)]
pub struct AdminUserRow {
    #[serde(flatten)]
    pub user: User,

    /// Current number of bookmarks held by this user
    pub bookmark_count: u64,
}

/// Request payload for patching a user's quota on the admin surface
#[derive(Deserialize)]
pub struct UpdateQuotaRequest {
    pub quota: u64,
}

/// Request payload for writing the default-quota system setting
#[derive(Deserialize)]
pub struct UpdateDefaultQuotaRequest {
    pub default_quota: u64,
}
