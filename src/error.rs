//! Error taxonomy and HTTP status mapping
//!
//! Every handler returns `Result<_, ApiError>`; this module owns the
//! translation into JSON error responses. Backend failures (redb, serde) are
//! logged with their underlying message and surfaced as a generic 500 so
//! storage internals never reach a client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Domain and transport errors raised by the bookmarking service
#[derive(Debug, Error)]
pub enum ApiError {
    /// No identity, or an identity the provider would not vouch for
    #[error("unauthorized")]
    Unauthorized,

    /// Malformed input rejected before any store access
    #[error("{0}")]
    Validation(String),

    /// Unique-constraint violation; carries the existing record's id so the
    /// caller can offer "view existing" instead of merely failing
    #[error("already saved")]
    Duplicate { existing_id: String },

    /// The owner's bookmark count has reached their quota; carries the limit
    /// so the UI can display it
    #[error("storage quota reached ({limit})")]
    QuotaExceeded { limit: u64 },

    /// The URL was well-formed but the embed endpoint could not resolve it,
    /// which usually means a deleted or private post
    #[error("link is invalid or inaccessible")]
    InvalidLink,

    /// A supplied label id does not reference a label owned by the caller
    #[error("invalid label ids")]
    InvalidReference,

    /// The referenced record does not exist
    #[error("not found")]
    NotFound,

    /// The referenced record exists but belongs to another user
    #[error("forbidden")]
    Forbidden,

    /// Backend failure; the message is logged, never returned
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Duplicate { .. } => StatusCode::CONFLICT,
            ApiError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InvalidLink => StatusCode::BAD_REQUEST,
            ApiError::InvalidReference => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::Validation(_) => "validation",
            ApiError::Duplicate { .. } => "duplicate",
            ApiError::QuotaExceeded { .. } => "quota_exceeded",
            ApiError::InvalidLink => "invalid_link",
            ApiError::InvalidReference => "invalid_reference",
            ApiError::NotFound => "not_found",
            ApiError::Forbidden => "forbidden",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            ApiError::Duplicate { existing_id } => json!({
                "error": "Already saved",
                "code": self.code(),
                "id": existing_id,
            }),
            ApiError::QuotaExceeded { limit } => json!({
                "error": format!("Storage limit reached ({limit} bookmarks)"),
                "code": self.code(),
                "limit": limit,
            }),
            ApiError::Internal(detail) => {
                // The enclosing request span supplies user id and operation.
                tracing::error!(%detail, "request failed");
                json!({
                    "error": "Internal server error",
                    "code": self.code(),
                })
            }
            other => json!({
                "error": other.to_string(),
                "code": other.code(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<redb::Error> for ApiError {
    fn from(err: redb::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<redb::TransactionError> for ApiError {
    fn from(err: redb::TransactionError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<redb::TableError> for ApiError {
    fn from(err: redb::TableError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<redb::StorageError> for ApiError {
    fn from(err: redb::StorageError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<redb::CommitError> for ApiError {
    fn from(err: redb::CommitError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}
