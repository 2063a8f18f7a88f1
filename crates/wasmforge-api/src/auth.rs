//! Caller identity extraction. Authentication itself (issuing/verifying
//! credentials) is out of scope for this service; an upstream gateway is
//! expected to authenticate the caller and forward their resolved user id.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use wasmforge_core::ResourceId;

use crate::error::ApiError;

const USER_ID_HEADER: &str = "x-user-id";

/// The caller's resolved identity, extracted from a trusted upstream header.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub ResourceId);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("missing X-User-Id".to_string()))?
            .to_str()
            .map_err(|_| ApiError::Unauthorized("malformed X-User-Id".to_string()))?;

        raw.parse::<ResourceId>()
            .map(AuthUser)
            .map_err(|_| ApiError::Unauthorized("malformed X-User-Id".to_string()))
    }
}
