//! Web API module for Tasklane
//!
//! Provides REST API endpoints for:
//! - AI status (quota and availability)
//! - Project summaries and questions
//! - Project content updates (cache invalidation hook)
//! - Health checks

pub mod ai;
pub mod health;
pub mod projects;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;
use tasklane_core::GatewayError;

pub use ai::ai_routes;
pub use health::health_routes;
pub use projects::projects_routes;

/// Create the API router with all endpoints
pub fn api_router() -> Router {
    Router::new().merge(ai_routes()).merge(projects_routes())
}

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

/// Gateway failure rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            GatewayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GatewayError::RateLimited { .. } | GatewayError::QuotaExceeded { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            GatewayError::ProviderUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::ProviderError(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.0.to_body();
        match body.retry_after_secs {
            Some(secs) => (
                status,
                [(header::RETRY_AFTER, secs.to_string())],
                Json(body),
            )
                .into_response(),
            None => (status, Json(body)).into_response(),
        }
    }
}

/// Plain error body for failures outside the gateway taxonomy
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
}

pub fn not_found(message: impl Into<String>) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            success: false,
            error: message.into(),
            code: "NOT_FOUND",
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests;
