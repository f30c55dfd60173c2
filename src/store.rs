//! Storage operations for bookmarks, labels, users, and settings
//!
//! Every operation here is one redb transaction. redb serializes write
//! transactions, so the duplicate-URL and label-name uniqueness checks run
//! inside the same exclusive transaction as the insert — a concurrent
//! duplicate save cannot race between check and insert. A returned error
//! drops the transaction uncommitted, leaving the store untouched.

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable};
use uuid::Uuid;

use crate::database::{
    TABLE_BOOKMARKS, TABLE_BOOKMARK_LABELS, TABLE_BOOKMARK_URLS, TABLE_LABELS, TABLE_LABEL_NAMES,
    TABLE_SETTINGS, TABLE_USERS, TABLE_USER_BOOKMARKS, TABLE_USER_SUBJECTS,
};
use crate::error::ApiError;
use crate::identity::UserIdentity;
use crate::model::{
    AdminUserRow, Bookmark, BookmarkWithLabels, Label, ListBookmarksResponse, SortOrder, User,
};
use crate::query::ListQuery;

/// Settings key holding the storage quota assigned to new users
pub const SETTING_DEFAULT_QUOTA: &str = "default_quota";

/// Quota used when the setting has never been written
pub const FALLBACK_DEFAULT_QUOTA: u64 = 1000;

/// Color assigned to labels created without one
pub const DEFAULT_LABEL_COLOR: &str = "#8B5CF6";

/// Upper bound on note length, in characters
pub const NOTE_MAX_CHARS: usize = 1000;

// ---------------------------------------------------------------------------
// Composite keys
// ---------------------------------------------------------------------------

/// Key into the chronological per-user bookmark index
///
/// The zero-padded micros timestamp makes lexicographic order chronological;
/// the trailing id keeps same-instant saves in a stable order.
fn user_bookmark_key(user_id: &str, created_at: DateTime<Utc>, bookmark_id: &str) -> String {
    format!(
        "{user_id}:{:020}:{bookmark_id}",
        created_at.timestamp_micros()
    )
}

/// Exclusive range covering every index key with the given owner prefix
///
/// ';' is the successor of ':' in ASCII, so "{prefix};" bounds every
/// "{prefix}:..." key from above. Owner ids are UUIDs and never contain ':'.
fn prefix_range(prefix: &str) -> (String, String) {
    (format!("{prefix}:"), format!("{prefix};"))
}

/// Collects every value stored under an owner prefix, in key order
fn scan_prefix(
    table: &impl ReadableTable<&'static str, &'static str>,
    prefix: &str,
) -> Result<Vec<String>, ApiError> {
    let (start, end) = prefix_range(prefix);
    let mut values = Vec::new();
    for entry in table.range(start.as_str()..end.as_str())? {
        let (_, value) = entry?;
        values.push(value.value().to_string());
    }
    Ok(values)
}

// ---------------------------------------------------------------------------
// Users and settings
// ---------------------------------------------------------------------------

/// Post-signup hook: resolves an authenticated identity to its account,
/// creating the account on first sight
///
/// New accounts get the administratively-configured default quota, read
/// inside the same write transaction that creates the user.
pub fn ensure_user(db: &Database, identity: &UserIdentity) -> Result<User, ApiError> {
    // Fast path: the account already exists.
    {
        let read_txn = db.begin_read()?;
        let subjects = read_txn.open_table(TABLE_USER_SUBJECTS)?;
        if let Some(id_guard) = subjects.get(identity.subject.as_str())? {
            let user_id = id_guard.value().to_string();
            drop(id_guard);
            let users = read_txn.open_table(TABLE_USERS)?;
            if let Some(user_guard) = users.get(user_id.as_str())? {
                return Ok(serde_json::from_str(user_guard.value())?);
            }
        }
    }

    let write_txn = db.begin_write()?;
    let user = {
        let mut subjects = write_txn.open_table(TABLE_USER_SUBJECTS)?;
        let mut users = write_txn.open_table(TABLE_USERS)?;

        // Re-check under the exclusive transaction; a concurrent first
        // request for the same subject may have won.
        let existing_id = subjects
            .get(identity.subject.as_str())?
            .map(|guard| guard.value().to_string());
        let existing = match existing_id {
            Some(user_id) => match users.get(user_id.as_str())? {
                Some(guard) => Some(serde_json::from_str::<User>(guard.value())?),
                None => None,
            },
            None => None,
        };

        match existing {
            Some(user) => user,
            None => {
                let settings = write_txn.open_table(TABLE_SETTINGS)?;
                let quota = settings
                    .get(SETTING_DEFAULT_QUOTA)?
                    .and_then(|guard| guard.value().parse().ok())
                    .unwrap_or(FALLBACK_DEFAULT_QUOTA);

                let user = User {
                    id: Uuid::new_v4().to_string(),
                    subject: identity.subject.clone(),
                    email: identity.email.clone(),
                    display_name: identity.display_name.clone(),
                    avatar_url: identity.avatar_url.clone(),
                    quota,
                    created_at: Utc::now(),
                };

                let user_json = serde_json::to_string(&user)?;
                users.insert(user.id.as_str(), user_json.as_str())?;
                subjects.insert(identity.subject.as_str(), user.id.as_str())?;

                tracing::info!(user_id = %user.id, "created account on first login");
                user
            }
        }
    };
    write_txn.commit()?;

    Ok(user)
}

/// Reads the default quota assigned to new users
pub fn default_quota(db: &Database) -> Result<u64, ApiError> {
    let read_txn = db.begin_read()?;
    let settings = read_txn.open_table(TABLE_SETTINGS)?;
    Ok(settings
        .get(SETTING_DEFAULT_QUOTA)?
        .and_then(|guard| guard.value().parse().ok())
        .unwrap_or(FALLBACK_DEFAULT_QUOTA))
}

/// Writes the default quota assigned to new users
pub fn set_default_quota(db: &Database, quota: u64) -> Result<(), ApiError> {
    let write_txn = db.begin_write()?;
    {
        let mut settings = write_txn.open_table(TABLE_SETTINGS)?;
        let value = quota.to_string();
        settings.insert(SETTING_DEFAULT_QUOTA, value.as_str())?;
    }
    write_txn.commit()?;
    Ok(())
}

/// Admin listing of all accounts, newest first, with bookmark counts
///
/// `search` is a case-insensitive substring match on display name and email.
/// Returns the page plus the total count matching the search.
pub fn list_users(
    db: &Database,
    page: usize,
    limit: usize,
    search: Option<&str>,
) -> Result<(Vec<AdminUserRow>, u64), ApiError> {
    let read_txn = db.begin_read()?;
    let users_table = read_txn.open_table(TABLE_USERS)?;
    let index = read_txn.open_table(TABLE_USER_BOOKMARKS)?;

    let needle = search.map(str::to_lowercase);

    let mut users: Vec<User> = Vec::new();
    for entry in users_table.iter()? {
        let (_, value) = entry?;
        let user: User = serde_json::from_str(value.value())?;
        let keep = match &needle {
            None => true,
            Some(needle) => {
                let name_hit = user
                    .display_name
                    .as_deref()
                    .map(|name| name.to_lowercase().contains(needle))
                    .unwrap_or(false);
                let email_hit = user
                    .email
                    .as_deref()
                    .map(|email| email.to_lowercase().contains(needle))
                    .unwrap_or(false);
                name_hit || email_hit
            }
        };
        if keep {
            users.push(user);
        }
    }

    users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    let total = users.len() as u64;

    let mut rows = Vec::new();
    for user in users.into_iter().skip((page - 1) * limit).take(limit) {
        let bookmark_count = scan_prefix(&index, &user.id)?.len() as u64;
        rows.push(AdminUserRow {
            user,
            bookmark_count,
        });
    }

    Ok((rows, total))
}

/// Admin patch of one user's quota
pub fn set_user_quota(db: &Database, user_id: &str, quota: u64) -> Result<User, ApiError> {
    let write_txn = db.begin_write()?;
    let user = {
        let mut users = write_txn.open_table(TABLE_USERS)?;
        let mut user: User = match users.get(user_id)? {
            Some(guard) => serde_json::from_str(guard.value())?,
            None => return Err(ApiError::NotFound),
        };
        user.quota = quota;
        let user_json = serde_json::to_string(&user)?;
        users.insert(user_id, user_json.as_str())?;
        user
    };
    write_txn.commit()?;
    Ok(user)
}

// ---------------------------------------------------------------------------
// Bookmarks
// ---------------------------------------------------------------------------

/// Rejects notes longer than the bound, before any store access
fn validate_note(note: &Option<String>) -> Result<(), ApiError> {
    if let Some(note) = note {
        if note.chars().count() > NOTE_MAX_CHARS {
            return Err(ApiError::Validation(format!(
                "Note exceeds {NOTE_MAX_CHARS} characters limit"
            )));
        }
    }
    Ok(())
}

/// Screens a save for duplicates and quota exhaustion
///
/// Runs before the preview fetch so a re-save or an over-quota save is
/// answered without an outbound call, and so those answers do not depend on
/// whether the post is still resolvable. Advisory only: [`create_bookmark`]
/// repeats both checks inside its write transaction, which is what actually
/// enforces them.
pub fn check_save_allowed(db: &Database, user: &User, url: &str) -> Result<(), ApiError> {
    let read_txn = db.begin_read()?;

    let urls = read_txn.open_table(TABLE_BOOKMARK_URLS)?;
    let url_key = format!("{}:{url}", user.id);
    if let Some(existing) = urls.get(url_key.as_str())? {
        return Err(ApiError::Duplicate {
            existing_id: existing.value().to_string(),
        });
    }

    let index = read_txn.open_table(TABLE_USER_BOOKMARKS)?;
    let count = scan_prefix(&index, &user.id)?.len() as u64;
    if count >= user.quota {
        return Err(ApiError::QuotaExceeded { limit: user.quota });
    }

    Ok(())
}

/// Persists a new bookmark with its label associations
///
/// The caller has already canonicalized and allowlist-validated the URL and
/// resolved the preview; nothing here touches the network. Inside one write
/// transaction: duplicate check on (owner, URL), quota check, label ownership
/// check, then the row plus its index and join entries.
pub fn create_bookmark(
    db: &Database,
    user: &User,
    url: &str,
    note: Option<String>,
    label_ids: &[String],
    preview: crate::preview::Preview,
) -> Result<BookmarkWithLabels, ApiError> {
    validate_note(&note)?;

    let write_txn = db.begin_write()?;
    let saved = {
        let mut bookmarks = write_txn.open_table(TABLE_BOOKMARKS)?;
        let mut urls = write_txn.open_table(TABLE_BOOKMARK_URLS)?;
        let mut index = write_txn.open_table(TABLE_USER_BOOKMARKS)?;
        let mut joins = write_txn.open_table(TABLE_BOOKMARK_LABELS)?;
        let labels_table = write_txn.open_table(TABLE_LABELS)?;

        let url_key = format!("{}:{url}", user.id);
        if let Some(existing) = urls.get(url_key.as_str())? {
            return Err(ApiError::Duplicate {
                existing_id: existing.value().to_string(),
            });
        }

        let count = scan_prefix(&index, &user.id)?.len() as u64;
        if count >= user.quota {
            return Err(ApiError::QuotaExceeded { limit: user.quota });
        }

        // Every supplied label id must reference a label owned by this user.
        let mut labels = Vec::with_capacity(label_ids.len());
        for label_id in label_ids {
            let label_key = format!("{}:{label_id}", user.id);
            match labels_table.get(label_key.as_str())? {
                Some(guard) => labels.push(serde_json::from_str::<Label>(guard.value())?),
                None => return Err(ApiError::InvalidReference),
            }
        }

        let now = Utc::now();
        let bookmark = Bookmark {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            url: url.to_string(),
            snippet: preview.snippet,
            thumbnail_url: preview.thumbnail_url,
            author_name: preview.author_name,
            author_handle: preview.author_handle,
            note,
            created_at: now,
            updated_at: now,
        };

        let bookmark_json = serde_json::to_string(&bookmark)?;
        bookmarks.insert(bookmark.id.as_str(), bookmark_json.as_str())?;
        urls.insert(url_key.as_str(), bookmark.id.as_str())?;
        let index_key = user_bookmark_key(&user.id, now, &bookmark.id);
        index.insert(index_key.as_str(), bookmark.id.as_str())?;
        for label in &labels {
            let join_key = format!("{}:{}", bookmark.id, label.id);
            joins.insert(join_key.as_str(), label.id.as_str())?;
        }

        labels.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        BookmarkWithLabels { bookmark, labels }
    };
    write_txn.commit()?;

    Ok(saved)
}

/// Attaches the labels associated with one bookmark, sorted by name
fn labels_for_bookmark(
    labels_table: &impl ReadableTable<&'static str, &'static str>,
    joins: &impl ReadableTable<&'static str, &'static str>,
    user_id: &str,
    bookmark_id: &str,
) -> Result<Vec<Label>, ApiError> {
    let mut labels = Vec::new();
    for label_id in scan_prefix(joins, bookmark_id)? {
        let label_key = format!("{user_id}:{label_id}");
        if let Some(guard) = labels_table.get(label_key.as_str())? {
            labels.push(serde_json::from_str::<Label>(guard.value())?);
        }
    }
    labels.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(labels)
}

/// Lists one user's bookmarks with search, label filter, sort, and pagination
///
/// `total` counts everything matching the filter, ignoring pagination, and
/// `has_more` says whether a page exists past offset + limit. The per-user
/// index is scanned in (creation time, id) order, so ties are stable across
/// repeated calls.
pub fn list_bookmarks(
    db: &Database,
    user: &User,
    query: &ListQuery,
) -> Result<ListBookmarksResponse, ApiError> {
    let read_txn = db.begin_read()?;
    let bookmarks_table = read_txn.open_table(TABLE_BOOKMARKS)?;
    let index = read_txn.open_table(TABLE_USER_BOOKMARKS)?;
    let labels_table = read_txn.open_table(TABLE_LABELS)?;
    let joins = read_txn.open_table(TABLE_BOOKMARK_LABELS)?;

    // Index order is oldest first.
    let mut matched: Vec<BookmarkWithLabels> = Vec::new();
    for bookmark_id in scan_prefix(&index, &user.id)? {
        let bookmark: Bookmark = match bookmarks_table.get(bookmark_id.as_str())? {
            Some(guard) => serde_json::from_str(guard.value())?,
            None => continue,
        };
        let labels = labels_for_bookmark(&labels_table, &joins, &user.id, &bookmark_id)?;
        if query.matches(&bookmark, &labels) {
            matched.push(BookmarkWithLabels { bookmark, labels });
        }
    }

    if query.sort_order == SortOrder::Newest {
        matched.reverse();
    }

    let total = matched.len() as u64;
    let has_more = query.offset + query.limit < matched.len();
    let data: Vec<BookmarkWithLabels> = matched
        .into_iter()
        .skip(query.offset)
        .take(query.limit)
        .collect();

    Ok(ListBookmarksResponse {
        data,
        total,
        has_more,
        quota: user.quota,
    })
}

/// Updates the free-text note on an owned bookmark
///
/// Existence and ownership stay distinct outcomes (NotFound vs Forbidden).
/// An over-long note is rejected before the store is touched, leaving the
/// stored note unchanged.
pub fn update_note(
    db: &Database,
    user_id: &str,
    bookmark_id: &str,
    note: Option<String>,
) -> Result<Bookmark, ApiError> {
    validate_note(&note)?;

    let write_txn = db.begin_write()?;
    let updated = {
        let mut bookmarks = write_txn.open_table(TABLE_BOOKMARKS)?;
        let mut bookmark: Bookmark = match bookmarks.get(bookmark_id)? {
            Some(guard) => serde_json::from_str(guard.value())?,
            None => return Err(ApiError::NotFound),
        };
        if bookmark.user_id != user_id {
            return Err(ApiError::Forbidden);
        }

        bookmark.note = note.filter(|note| !note.is_empty());
        bookmark.updated_at = Utc::now();
        let bookmark_json = serde_json::to_string(&bookmark)?;
        bookmarks.insert(bookmark_id, bookmark_json.as_str())?;
        bookmark
    };
    write_txn.commit()?;

    Ok(updated)
}

/// Deletes an owned bookmark together with its index and join entries
pub fn delete_bookmark(db: &Database, user_id: &str, bookmark_id: &str) -> Result<(), ApiError> {
    let write_txn = db.begin_write()?;
    {
        let mut bookmarks = write_txn.open_table(TABLE_BOOKMARKS)?;
        let bookmark: Bookmark = match bookmarks.get(bookmark_id)? {
            Some(guard) => serde_json::from_str(guard.value())?,
            None => return Err(ApiError::NotFound),
        };
        if bookmark.user_id != user_id {
            return Err(ApiError::Forbidden);
        }

        bookmarks.remove(bookmark_id)?;

        let mut urls = write_txn.open_table(TABLE_BOOKMARK_URLS)?;
        let url_key = format!("{user_id}:{}", bookmark.url);
        urls.remove(url_key.as_str())?;

        let mut index = write_txn.open_table(TABLE_USER_BOOKMARKS)?;
        let index_key = user_bookmark_key(user_id, bookmark.created_at, bookmark_id);
        index.remove(index_key.as_str())?;

        let mut joins = write_txn.open_table(TABLE_BOOKMARK_LABELS)?;
        let label_ids = scan_prefix(&joins, bookmark_id)?;
        for label_id in label_ids {
            let join_key = format!("{bookmark_id}:{label_id}");
            joins.remove(join_key.as_str())?;
        }
    }
    write_txn.commit()?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

fn validate_label_name(name: &str) -> Result<String, ApiError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation("Label name required".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Creates a label; names are unique per user, compared case-insensitively
pub fn create_label(
    db: &Database,
    user_id: &str,
    name: &str,
    color: Option<String>,
) -> Result<Label, ApiError> {
    let name = validate_label_name(name)?;

    let write_txn = db.begin_write()?;
    let label = {
        let mut labels = write_txn.open_table(TABLE_LABELS)?;
        let mut names = write_txn.open_table(TABLE_LABEL_NAMES)?;

        let name_key = format!("{user_id}:{}", name.to_lowercase());
        if let Some(existing) = names.get(name_key.as_str())? {
            return Err(ApiError::Duplicate {
                existing_id: existing.value().to_string(),
            });
        }

        let label = Label {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name,
            color: color
                .filter(|color| !color.is_empty())
                .unwrap_or_else(|| DEFAULT_LABEL_COLOR.to_string()),
            created_at: Utc::now(),
        };

        let label_json = serde_json::to_string(&label)?;
        let label_key = format!("{user_id}:{}", label.id);
        labels.insert(label_key.as_str(), label_json.as_str())?;
        names.insert(name_key.as_str(), label.id.as_str())?;
        label
    };
    write_txn.commit()?;

    Ok(label)
}

/// Lists one user's labels sorted by name ascending
pub fn list_labels(db: &Database, user_id: &str) -> Result<Vec<Label>, ApiError> {
    let read_txn = db.begin_read()?;
    let labels_table = read_txn.open_table(TABLE_LABELS)?;

    let mut labels = Vec::new();
    for value in scan_prefix(&labels_table, user_id)? {
        labels.push(serde_json::from_str::<Label>(&value)?);
    }
    labels.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(labels)
}

/// Renames an owned label
///
/// The uniqueness rule excludes the label's own current name, so changing
/// only the casing of a name is allowed.
pub fn rename_label(
    db: &Database,
    user_id: &str,
    label_id: &str,
    new_name: &str,
) -> Result<Label, ApiError> {
    let new_name = validate_label_name(new_name)?;

    let write_txn = db.begin_write()?;
    let label = {
        let mut labels = write_txn.open_table(TABLE_LABELS)?;
        let mut names = write_txn.open_table(TABLE_LABEL_NAMES)?;

        let label_key = format!("{user_id}:{label_id}");
        let mut label: Label = match labels.get(label_key.as_str())? {
            Some(guard) => serde_json::from_str(guard.value())?,
            None => return Err(ApiError::NotFound),
        };

        let old_name_key = format!("{user_id}:{}", label.name.to_lowercase());
        let new_name_key = format!("{user_id}:{}", new_name.to_lowercase());

        if new_name_key != old_name_key {
            if let Some(existing) = names.get(new_name_key.as_str())? {
                return Err(ApiError::Duplicate {
                    existing_id: existing.value().to_string(),
                });
            }
            names.remove(old_name_key.as_str())?;
        }

        label.name = new_name;
        let label_json = serde_json::to_string(&label)?;
        labels.insert(label_key.as_str(), label_json.as_str())?;
        names.insert(new_name_key.as_str(), label.id.as_str())?;
        label
    };
    write_txn.commit()?;

    Ok(label)
}

/// Deletes an owned label and all its bookmark associations
///
/// Bookmark rows are never touched; only the join entries go.
pub fn delete_label(db: &Database, user_id: &str, label_id: &str) -> Result<(), ApiError> {
    let write_txn = db.begin_write()?;
    {
        let mut labels = write_txn.open_table(TABLE_LABELS)?;
        let mut names = write_txn.open_table(TABLE_LABEL_NAMES)?;
        let mut joins = write_txn.open_table(TABLE_BOOKMARK_LABELS)?;
        let index = write_txn.open_table(TABLE_USER_BOOKMARKS)?;

        let label_key = format!("{user_id}:{label_id}");
        let label: Label = match labels.get(label_key.as_str())? {
            Some(guard) => serde_json::from_str(guard.value())?,
            None => return Err(ApiError::NotFound),
        };

        labels.remove(label_key.as_str())?;
        let name_key = format!("{user_id}:{}", label.name.to_lowercase());
        names.remove(name_key.as_str())?;

        // Join keys lead with the bookmark id, so walk the owner's bookmarks
        // rather than the whole join table.
        for bookmark_id in scan_prefix(&index, user_id)? {
            let join_key = format!("{bookmark_id}:{label_id}");
            joins.remove(join_key.as_str())?;
        }
    }
    write_txn.commit()?;

    Ok(())
}
