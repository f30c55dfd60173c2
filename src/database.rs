//! Database initialization and table definitions
//!
//! This module handles the setup and configuration of the embedded redb database.
//! It defines every table used by the bookmarking service and provides the
//! initialization function plus the shared application state.

use redb::{Database, TableDefinition};
use std::sync::Arc;

use crate::preview::PreviewFetcher;

/// Main table for user accounts
///
/// Key: internal user id (UUID string)
/// Value: JSON-serialized User
pub const TABLE_USERS: TableDefinition<&str, &str> = TableDefinition::new("users_v1");

/// Index mapping the identity provider's stable subject to the internal user id
///
/// Enables the post-signup hook to find (or create exactly once) the account
/// behind an authenticated request.
///
/// Key: external subject string
/// Value: internal user id
pub const TABLE_USER_SUBJECTS: TableDefinition<&str, &str> =
    TableDefinition::new("user_subjects_v1");

/// Main table for saved bookmarks
///
/// Key: bookmark id (UUID string)
/// Value: JSON-serialized Bookmark
pub const TABLE_BOOKMARKS: TableDefinition<&str, &str> = TableDefinition::new("bookmarks_v1");

/// Uniqueness index on (owner, canonical URL)
///
/// Key: composite key in format "{user_id}:{canonical_url}"
/// Value: bookmark id
///
/// Checked and written inside the same write transaction as the bookmark row,
/// so a concurrent duplicate save cannot slip between check and insert.
pub const TABLE_BOOKMARK_URLS: TableDefinition<&str, &str> =
    TableDefinition::new("bookmark_urls_v1");

/// Chronological per-user index for listing and quota counting
///
/// Key: composite key in format "{user_id}:{created_micros:020}:{bookmark_id}"
/// Value: bookmark id
///
/// The zero-padded timestamp keeps lexicographic order equal to chronological
/// order, and the trailing id breaks ties so pagination is deterministic.
/// User ids are UUIDs, so the ':' separator never appears inside the prefix.
pub const TABLE_USER_BOOKMARKS: TableDefinition<&str, &str> =
    TableDefinition::new("user_bookmarks_v1");

/// Main table for labels
///
/// Key: composite key in format "{user_id}:{label_id}"
/// Value: JSON-serialized Label
///
/// Keying by owner first lets a single range scan list one user's labels.
pub const TABLE_LABELS: TableDefinition<&str, &str> = TableDefinition::new("labels_v1");

/// Case-insensitive uniqueness index on (owner, label name)
///
/// Key: composite key in format "{user_id}:{name lowercased}"
/// Value: label id
pub const TABLE_LABEL_NAMES: TableDefinition<&str, &str> = TableDefinition::new("label_names_v1");

/// Join table between bookmarks and labels (many-to-many)
///
/// Key: composite key in format "{bookmark_id}:{label_id}"
/// Value: label id
pub const TABLE_BOOKMARK_LABELS: TableDefinition<&str, &str> =
    TableDefinition::new("bookmark_labels_v1");

/// Administratively-configurable key/value settings
///
/// Only one key is used today: the default storage quota for new users.
pub const TABLE_SETTINGS: TableDefinition<&str, &str> = TableDefinition::new("settings_v1");

/// Application state shared across all request handlers
///
/// Wraps the database and the outbound preview collaborator in Arcs for
/// thread-safe sharing across async handlers in the Axum web framework.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe reference to the embedded database
    pub db: Arc<Database>,
    /// Outbound oEmbed collaborator used at save time
    pub preview: Arc<dyn PreviewFetcher>,
}

/// Initializes the embedded database and creates required tables
///
/// Creates or opens the database file at the specified path, opens every
/// table so the schema exists before the first request, and commits.
///
/// # Arguments
///
/// * `db_path` - File path where the database should be stored (e.g., "data.db")
///
/// # Example
///
/// ```no_run
/// # use threadmark::database::init_db;
/// let db = init_db("data.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_USERS)?;
        write_txn.open_table(TABLE_USER_SUBJECTS)?;
        write_txn.open_table(TABLE_BOOKMARKS)?;
        write_txn.open_table(TABLE_BOOKMARK_URLS)?;
        write_txn.open_table(TABLE_USER_BOOKMARKS)?;
        write_txn.open_table(TABLE_LABELS)?;
        write_txn.open_table(TABLE_LABEL_NAMES)?;
        write_txn.open_table(TABLE_BOOKMARK_LABELS)?;
        write_txn.open_table(TABLE_SETTINGS)?;
    }
    write_txn.commit()?;

    Ok(db)
}
