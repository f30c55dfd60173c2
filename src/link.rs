//! Link normalization and validation for Threads post URLs
//!
//! Threads serves the same post under threads.net and threads.com, with or
//! without a www prefix and with or without a trailing slash. Everything in
//! this service keys off one canonical form so that deduplication works.
//! All functions here are pure string transformations.

use url::Url;

/// Hostnames accepted as the supported platform
const ALLOWED_HOSTS: [&str; 4] = [
    "threads.net",
    "www.threads.net",
    "threads.com",
    "www.threads.com",
];

/// Host used in the canonical form of every stored URL
const CANONICAL_ORIGIN: &str = "https://www.threads.net";

/// Canonicalizes a submitted URL
///
/// Parses the input, strips a trailing slash from the path, and rewrites the
/// scheme and host to the canonical origin. Query strings and fragments are
/// dropped; they never identify a post. Input that fails to parse is returned
/// unchanged — strict callers apply [`is_valid_post_url`] separately.
pub fn canonicalize_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(parsed) => {
            let path = parsed.path().trim_end_matches('/');
            format!("{CANONICAL_ORIGIN}{path}")
        }
        Err(_) => raw.to_string(),
    }
}

/// Returns true when the URL parses and its host is on the allowlist
pub fn is_valid_post_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(parsed) => parsed
            .host_str()
            .map(|host| ALLOWED_HOSTS.contains(&host))
            .unwrap_or(false),
        Err(_) => false,
    }
}

/// Extracts the author handle from a Threads URL
///
/// Post URLs look like `https://www.threads.net/@alice/post/xyz`; the handle
/// is the first path segment starting with '@', returned without it.
pub fn handle_from_url(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    parsed
        .path_segments()?
        .find(|segment| segment.starts_with('@'))
        .map(|segment| segment.trim_start_matches('@').to_string())
        .filter(|handle| !handle.is_empty())
}
