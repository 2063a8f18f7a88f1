//! API error taxonomy (spec §7) and its HTTP surface.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    BadInput(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    QuotaExceeded { current: i64, limit: i64 },
    Transient(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadInput(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::QuotaExceeded { current, limit } => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "QuotaExceeded", "current": current, "limit": limit })),
            )
                .into_response(),
            ApiError::Transient(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": msg }))).into_response()
            }
        }
    }
}

impl From<wasmforge_core::Error> for ApiError {
    fn from(err: wasmforge_core::Error) -> Self {
        use wasmforge_core::Error::*;
        match err {
            NotFound(msg) => ApiError::NotFound(msg),
            InvalidInput(msg) => ApiError::BadInput(msg),
            Unauthorized(msg) => ApiError::Unauthorized(msg),
            Forbidden(msg) => ApiError::Forbidden(msg),
            QuotaExceeded { current, limit } => ApiError::QuotaExceeded { current, limit },
            Conflict(msg) => ApiError::BadInput(msg),
            Transient(msg) => ApiError::Transient(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<wasmforge_db::DbError> for ApiError {
    fn from(err: wasmforge_db::DbError) -> Self {
        match err {
            wasmforge_db::DbError::NotFound(msg) => ApiError::NotFound(msg),
            wasmforge_db::DbError::Duplicate(msg) => ApiError::BadInput(msg),
            other => ApiError::Transient(other.to_string()),
        }
    }
}

impl From<wasmforge_queue::QueueError> for ApiError {
    fn from(err: wasmforge_queue::QueueError) -> Self {
        match err {
            wasmforge_queue::QueueError::Duplicate(msg) => ApiError::BadInput(msg),
            other => ApiError::Transient(other.to_string()),
        }
    }
}
