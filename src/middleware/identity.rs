//! Caller identity extraction
//!
//! The upstream auth proxy authenticates the session and forwards the user
//! id in a trusted header. Requests without it never reach the gateway.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::debug;

/// Name of the header carrying the user id
#[derive(Debug, Clone)]
pub struct IdentityHeader(HeaderName);

impl IdentityHeader {
    /// Parse a header name, falling back to `x-user-id` when invalid
    pub fn new(name: &str) -> Self {
        let header = HeaderName::from_bytes(name.trim().to_ascii_lowercase().as_bytes())
            .unwrap_or_else(|_| HeaderName::from_static(DEFAULT_IDENTITY_HEADER));
        Self(header)
    }

    pub fn name(&self) -> &HeaderName {
        &self.0
    }
}

impl Default for IdentityHeader {
    fn default() -> Self {
        Self(HeaderName::from_static(DEFAULT_IDENTITY_HEADER))
    }
}

const DEFAULT_IDENTITY_HEADER: &str = "x-user-id";

#[derive(Debug, Serialize)]
struct IdentityErrorResponse {
    success: bool,
    error: String,
    code: &'static str,
}

/// Rejection for requests without a usable identity
pub struct IdentityRejection;

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(IdentityErrorResponse {
                success: false,
                error: "Missing user identity".to_string(),
                code: "UNAUTHORIZED",
            }),
        )
            .into_response()
    }
}

/// Extractor requiring an authenticated user id
pub struct RequireUser(pub String);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let header = parts
            .extensions
            .get::<IdentityHeader>()
            .cloned()
            .unwrap_or_default();

        let user_id = parts
            .headers
            .get(header.name())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                debug!(header = %header.name(), "Request without user identity");
                IdentityRejection
            })?;

        Ok(RequireUser(user_id.to_string()))
    }
}
