//! AI status endpoint
//!
//! GET /api/v1/ai/status — quota remaining, limit and availability for the
//! calling user. Clients use it to disable AI actions ahead of time.

use super::ApiResponse;
use crate::middleware::identity::RequireUser;
use axum::{routing::get, Extension, Json, Router};
use std::sync::Arc;
use tasklane_core::{AiGateway, StatusSnapshot};

/// GET /api/v1/ai/status handler.
async fn get_status(
    RequireUser(user_id): RequireUser,
    Extension(gateway): Extension<Arc<AiGateway>>,
) -> Json<ApiResponse<StatusSnapshot>> {
    ApiResponse::ok(gateway.status(&user_id))
}

/// Create the AI status routes.
pub fn ai_routes() -> Router {
    Router::new().route("/api/v1/ai/status", get(get_status))
}
