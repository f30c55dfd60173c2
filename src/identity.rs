//! Identity provider adapter
//!
//! The OAuth dance itself happens upstream; by the time a request reaches
//! this service the front proxy has already exchanged a third-party login for
//! a verified identity and attached it as headers. This module is the single
//! capability interface the rest of the code consumes: resolve a request to a
//! [`UserIdentity`], or to nothing.

use axum::http::HeaderMap;

/// A verified identity as handed over by the authentication front-end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    /// Stable subject unique to the person across logins
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Resolves a request to the identity behind it
///
/// Exactly one concrete implementation is wired in at startup; handlers and
/// middleware only ever see this interface.
pub trait IdentityProvider: Send + Sync {
    fn identify(&self, headers: &HeaderMap) -> Option<UserIdentity>;
}

/// Header names written by the authenticating proxy
const SUBJECT_HEADER: &str = "x-auth-subject";
const EMAIL_HEADER: &str = "x-auth-email";
const NAME_HEADER: &str = "x-auth-name";
const AVATAR_HEADER: &str = "x-auth-avatar";

/// Identity provider trusting the auth proxy's forwarded headers
///
/// The subject header is required; profile headers are optional and only
/// consulted when the account is first created.
pub struct ProxyHeaderIdentity;

impl IdentityProvider for ProxyHeaderIdentity {
    fn identify(&self, headers: &HeaderMap) -> Option<UserIdentity> {
        let subject = header_value(headers, SUBJECT_HEADER)?;
        if subject.is_empty() {
            return None;
        }

        Some(UserIdentity {
            subject,
            email: header_value(headers, EMAIL_HEADER),
            display_name: header_value(headers, NAME_HEADER),
            avatar_url: header_value(headers, AVATAR_HEADER),
        })
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
