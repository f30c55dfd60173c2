use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::env;
use tracing::Instrument;

use crate::database::AppState;
use crate::error::ApiError;
use crate::identity::{IdentityProvider, ProxyHeaderIdentity};
use crate::store;

/// Middleware resolving the authenticated user behind a request
///
/// The identity provider adapter reads the verified identity the auth proxy
/// attached to the request. No identity means every operation short-circuits
/// with 401. On the first request for a new subject the post-signup hook
/// creates the account with the configured default quota. The resolved
/// `User` is inserted as a request extension for handlers to extract.
///
/// The rest of the request runs inside a span carrying the user id and the
/// operation, so failures logged further down identify both.
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = ProxyHeaderIdentity
        .identify(request.headers())
        .ok_or(ApiError::Unauthorized)?;

    let user = store::ensure_user(&state.db, &identity)?;
    let span = tracing::info_span!(
        "request",
        user_id = %user.id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    request.extensions_mut().insert(user);

    Ok(next.run(request).instrument(span).await)
}

/// Middleware gating the admin surface behind a separate credential
///
/// Admin requests must carry an `Authorization` header matching the
/// `ADMIN_TOKEN` environment variable. When the variable is unset or empty
/// the admin surface is disabled and every request is rejected.
pub async fn admin_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let admin_token = env::var("ADMIN_TOKEN").unwrap_or_default();
    if admin_token.is_empty() {
        return Err(ApiError::Unauthorized);
    }

    match headers.get("Authorization") {
        Some(header_value) => match header_value.to_str() {
            Ok(header_str) if header_str == admin_token => {
                let span = tracing::info_span!(
                    "admin_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                );
                Ok(next.run(request).instrument(span).await)
            }
            _ => Err(ApiError::Unauthorized),
        },
        None => Err(ApiError::Unauthorized),
    }
}
