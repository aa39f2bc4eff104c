//! Server initialization and main run loop

use super::config::AppConfig;
use super::loader::load_config;
use super::providers::resolve_provider;
use anyhow::{Context, Result};
use axum::{routing::get, Extension, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tasklane_core::{AiGateway, EventBus, InMemorySubjectStore, SubjectSource};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

use crate::middleware::identity::IdentityHeader;

/// Shared application state handed to the router
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<AiGateway>,
    pub subjects: Arc<InMemorySubjectStore>,
    pub identity: IdentityHeader,
}

/// Build the gateway and its collaborators from configuration
pub fn build_state(config: &AppConfig) -> Result<AppState> {
    let gateway_config = config.ai.gateway.clone();
    let provider = resolve_provider(&config.ai.provider, &gateway_config.generation.model)?;
    let subjects = Arc::new(InMemorySubjectStore::new());

    let gateway = AiGateway::new(
        gateway_config,
        provider,
        Arc::clone(&subjects) as Arc<dyn SubjectSource>,
    )
    .context("Failed to build AI gateway")?
    .with_event_bus(EventBus::default());

    Ok(AppState {
        gateway: Arc::new(gateway),
        subjects,
        identity: IdentityHeader::new(&config.server.identity_header),
    })
}

/// Assemble the HTTP router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(crate::api::health_routes())
        .merge(crate::api::api_router())
        .route("/", get(|| async { "Tasklane AI gateway" }))
        .layer(Extension(state.gateway))
        .layer(Extension(state.subjects))
        .layer(Extension(state.identity))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Periodically reclaim expired gateway state
fn start_sweep_task(gateway: Arc<AiGateway>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let stats = gateway.sweep();
            debug!(
                quota_windows = stats.quota_windows,
                rate_buckets = stats.rate_buckets,
                cache_entries = stats.cache_entries,
                "Maintenance sweep"
            );
        }
    })
}

/// Run the server
pub async fn run() -> Result<()> {
    info!("Starting Tasklane AI gateway v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config().context("Failed to load configuration")?;
    info!("Configuration loaded");

    let state = build_state(&config)?;
    let gateway = Arc::clone(&state.gateway);
    info!(
        summaries = config.ai.gateway.summaries_enabled,
        questions = config.ai.gateway.questions_enabled,
        quota_limit = config.ai.gateway.quota.limit,
        cache_ttl_secs = config.ai.gateway.cache_ttl_secs,
        "AI gateway initialized"
    );

    let sweep_interval = Duration::from_secs(config.maintenance.sweep_interval_secs.max(1));
    let sweep_task = start_sweep_task(Arc::clone(&gateway), sweep_interval);

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    sweep_task.abort();
    info!("Tasklane shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
