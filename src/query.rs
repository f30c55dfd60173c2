//! Query composition for bookmark listings
//!
//! Owns the "what counts as a match" semantics and the clamping of caller
//! supplied pagination values. Matching is a literal case-insensitive
//! substring check, OR'd across note, author name, author handle, and
//! associated label names; there is no stemming or fuzzy matching.

use crate::model::{Bookmark, Label, ListParams, SortOrder};

/// Default page size when the caller supplies none
pub const DEFAULT_LIMIT: usize = 10;

/// Upper bound on page size regardless of what the caller asks for
pub const MAX_LIMIT: usize = 100;

/// A fully resolved listing request
///
/// Built from raw [`ListParams`]; every field is already validated and
/// clamped so the store can use it without further checks.
#[derive(Debug, Clone)]
pub struct ListQuery {
    /// Search needle, lowercased once up front; None when blank
    pub search: Option<String>,
    pub label_id: Option<String>,
    pub sort_order: SortOrder,
    pub limit: usize,
    pub offset: usize,
}

impl From<ListParams> for ListQuery {
    fn from(params: ListParams) -> Self {
        let search = params
            .search
            .map(|needle| needle.trim().to_lowercase())
            .filter(|needle| !needle.is_empty());

        let label_id = params.label_id.filter(|id| !id.is_empty());

        let limit = params
            .limit
            .unwrap_or(DEFAULT_LIMIT as i64)
            .clamp(1, MAX_LIMIT as i64) as usize;

        let offset = params.offset.unwrap_or(0).max(0) as usize;

        ListQuery {
            search,
            label_id,
            sort_order: params.sort_order.unwrap_or_default(),
            limit,
            offset,
        }
    }
}

impl ListQuery {
    /// Whether a bookmark (with its labels already attached) satisfies the
    /// search and label filters
    pub fn matches(&self, bookmark: &Bookmark, labels: &[Label]) -> bool {
        if let Some(label_id) = &self.label_id {
            if !labels.iter().any(|label| &label.id == label_id) {
                return false;
            }
        }

        match &self.search {
            None => true,
            Some(needle) => {
                contains_insensitive(bookmark.note.as_deref(), needle)
                    || contains_insensitive(bookmark.author_name.as_deref(), needle)
                    || contains_insensitive(bookmark.author_handle.as_deref(), needle)
                    || labels
                        .iter()
                        .any(|label| label.name.to_lowercase().contains(needle))
            }
        }
    }
}

/// Case-insensitive substring check against an optional field
///
/// The needle is expected to be lowercased already.
fn contains_insensitive(field: Option<&str>, needle: &str) -> bool {
    field
        .map(|value| value.to_lowercase().contains(needle))
        .unwrap_or(false)
}
