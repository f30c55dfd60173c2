//! Preview fetching via the Threads oEmbed endpoint
//!
//! At save time the service asks the oEmbed API for best-effort metadata:
//! author name and handle, a thumbnail, and a plain-text snippet derived from
//! the embed HTML. The fetcher sits behind a trait so tests can substitute a
//! stub without any network.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::link;

/// Bounded timeout for the single outbound call on the save path
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Identifying client header sent to the oEmbed endpoint
const USER_AGENT: &str = "threadmark/0.1";

/// oEmbed API base; the endpoint only answers for threads.com URLs
const OEMBED_ENDPOINT: &str = "https://www.threads.com/api/oembed";

/// Maximum snippet length in characters
const SNIPPET_MAX_CHARS: usize = 300;

/// Best-effort metadata for a saved post; every field is optional
#[derive(Debug, Clone, Default)]
pub struct Preview {
    pub author_name: Option<String>,
    pub author_handle: Option<String>,
    pub snippet: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// Failure to reach or decode the embed endpoint
///
/// Distinct from an `Ok(None)` answer: the endpoint responding with a
/// non-success status means "no preview for this URL", while a transport or
/// decode failure means the link could not be resolved at all.
#[derive(Debug, thiserror::Error)]
#[error("preview fetch failed: {0}")]
pub struct PreviewError(pub String);

/// Outbound preview collaborator
///
/// `Ok(None)` is a definitive "no preview" answer from the endpoint; `Err` is
/// a network or decode failure. The save path treats both as an invalid
/// link, while best-effort callers treat both as absent preview data.
#[async_trait]
pub trait PreviewFetcher: Send + Sync {
    async fn fetch(&self, canonical_url: &str) -> Result<Option<Preview>, PreviewError>;
}

/// JSON body returned by the oEmbed endpoint; all fields optional
#[derive(Deserialize)]
struct OEmbedResponse {
    author_name: Option<String>,
    author_url: Option<String>,
    html: Option<String>,
    thumbnail_url: Option<String>,
}

/// Reqwest-backed fetcher against the real Threads oEmbed API
pub struct OEmbedFetcher {
    client: reqwest::Client,
}

impl OEmbedFetcher {
    /// Builds the fetcher with a bounded request timeout
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PreviewFetcher for OEmbedFetcher {
    async fn fetch(&self, canonical_url: &str) -> Result<Option<Preview>, PreviewError> {
        // The oEmbed API only resolves threads.com URLs even though posts are
        // canonically stored under threads.net.
        let lookup_url = embed_lookup_url(canonical_url);

        let response = self
            .client
            .get(OEMBED_ENDPOINT)
            .query(&[("url", lookup_url.as_str())])
            .send()
            .await
            .map_err(|err| PreviewError(err.to_string()))?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), url = canonical_url, "oembed returned non-success");
            return Ok(None);
        }

        let body: OEmbedResponse = response
            .json()
            .await
            .map_err(|err| PreviewError(err.to_string()))?;

        Ok(Some(preview_from_oembed(body, canonical_url)))
    }
}

/// Rewrites a threads.net host to threads.com for the oEmbed lookup
///
/// Only the host changes; a path or handle that happens to contain
/// "threads.net" passes through untouched. Anything that does not parse or
/// is not on a threads.net host is returned as-is.
pub fn embed_lookup_url(canonical_url: &str) -> String {
    let Ok(mut url) = Url::parse(canonical_url) else {
        return canonical_url.to_string();
    };
    match url.host_str() {
        Some("www.threads.net") | Some("threads.net") => {
            if url.set_host(Some("www.threads.com")).is_err() {
                return canonical_url.to_string();
            }
            url.to_string()
        }
        _ => canonical_url.to_string(),
    }
}

/// Assembles a [`Preview`] from an oEmbed body, falling back to the handle
/// embedded in the canonical URL when the endpoint omits author data
fn preview_from_oembed(body: OEmbedResponse, canonical_url: &str) -> Preview {
    let url_handle = link::handle_from_url(canonical_url);

    let author_handle = body
        .author_url
        .as_deref()
        .and_then(handle_from_author_url)
        .or_else(|| url_handle.clone());

    let author_name = body
        .author_name
        .filter(|name| !name.is_empty())
        .or_else(|| url_handle.map(|handle| format!("@{handle}")));

    Preview {
        author_name,
        author_handle,
        snippet: body.html.as_deref().map(snippet_from_html),
        thumbnail_url: body.thumbnail_url,
    }
}

/// Derives a handle from an author profile URL by taking the last path
/// segment and stripping a leading '@'
fn handle_from_author_url(author_url: &str) -> Option<String> {
    let parsed = Url::parse(author_url).ok()?;
    let last = parsed.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    let handle = last.trim_start_matches('@');
    if handle.is_empty() {
        return None;
    }
    Some(handle.to_string())
}

/// Converts an embed HTML fragment into a bounded plain-text snippet
///
/// Line breaks become newlines, all other markup is stripped, a fixed set of
/// HTML entities is decoded, and the result is trimmed and truncated to 300
/// characters on a character boundary.
pub fn snippet_from_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut tag = String::new();
    let mut in_tag = false;

    for ch in html.chars() {
        if in_tag {
            if ch == '>' {
                if is_line_break_tag(&tag) {
                    text.push('\n');
                }
                tag.clear();
                in_tag = false;
            } else {
                tag.push(ch);
            }
        } else if ch == '<' {
            in_tag = true;
        } else {
            text.push(ch);
        }
    }

    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"");

    decoded.trim().chars().take(SNIPPET_MAX_CHARS).collect()
}

/// True for `br`, `br/` and `br /`, compared without the angle brackets
fn is_line_break_tag(tag: &str) -> bool {
    tag.trim_end_matches('/').trim().eq_ignore_ascii_case("br")
}
