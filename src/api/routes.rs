//! API route definitions

use crate::config::ManagerConfig;
use crate::diagnostics::GpuInfo;
use crate::models::cache::CacheLayout;
use crate::models::download::DownloadManager;
use crate::models::hub::HubClient;
use crate::models::verify::Verifier;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ManagerConfig>,
    pub layout: CacheLayout,
    pub hub: Arc<dyn HubClient>,
    pub downloads: Arc<DownloadManager>,
    pub verifier: Verifier,
    pub gpu: Arc<GpuInfo>,
    pub prometheus_handle: metrics_exporter_prometheus::PrometheusHandle,
}

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Status
        .route("/", get(handlers::root))
        .route("/diagnostics", get(handlers::get_diagnostics))
        .route("/metrics", get(handlers::metrics))
        // Local cache
        .route(
            "/models",
            get(handlers::list_models).delete(handlers::delete_model),
        )
        .route("/models/verify", post(handlers::verify_model))
        .route("/models/snippet", post(handlers::get_snippet))
        // Remote hub
        .route("/models/check-remote", post(handlers::check_remote))
        .route("/models/search", post(handlers::search_models))
        .route("/models/download", post(handlers::download_model))
        // Maintenance
        .route("/system/cleanup", post(handlers::cleanup))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}
