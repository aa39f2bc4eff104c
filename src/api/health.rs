//! Health check endpoints
//!
//! - `/health` — simple "healthy" + version (for load balancers)
//! - `/health/detailed` — provider availability and cache counters

use axum::extract::Extension;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use tasklane_core::AiGateway;

/// Simple health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed health response
#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider_available: bool,
    pub cache_entries: usize,
    pub fills_in_flight: usize,
    pub tracked_users: usize,
    pub event_subscribers: usize,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn health_detailed(
    Extension(gateway): Extension<Arc<AiGateway>>,
) -> Json<DetailedHealthResponse> {
    let available = gateway.provider_available();
    Json(DetailedHealthResponse {
        status: if available { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        provider_available: available,
        cache_entries: gateway.cache().len(),
        fills_in_flight: gateway.cache().in_flight(),
        tracked_users: gateway.ledger().tracked_users(),
        event_subscribers: gateway.events().subscriber_count(),
    })
}

/// Create the health routes.
pub fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/detailed", get(health_detailed))
}
