//! Route table and shared handler state.

use crate::domain::GatewayConfig;
use crate::handlers;
use crate::middleware::{create_cors_layer, request_context};
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use pv_01_storage::ProvenanceStore;
use pv_02_credentials::{CredentialService, SessionStore};
use pv_03_ledger_client::LedgerClient;
use pv_04_lifecycle::LifecycleCoordinator;
use provenance_telemetry::register_metrics;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tracing::warn;

/// Credential service over the runtime-selected store.
pub type Credentials = CredentialService<dyn ProvenanceStore>;

/// Coordinator over the runtime-selected store and ledger.
pub type Coordinator = LifecycleCoordinator<dyn ProvenanceStore, dyn LedgerClient>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub credentials: Arc<Credentials>,
    pub coordinator: Arc<Coordinator>,
    pub sessions: Arc<SessionStore>,
    pub store: Arc<dyn ProvenanceStore>,
    pub ledger: Arc<dyn LedgerClient>,
    pub config: Arc<GatewayConfig>,
}

/// Build the HTTP router with its middleware stack.
pub fn build_router(state: AppState) -> Router {
    if let Err(e) = register_metrics() {
        warn!(error = %e, "Metrics registration failed, /metrics will be incomplete");
    }

    let middleware = ServiceBuilder::new()
        .layer(from_fn(request_context))
        .layer(create_cors_layer(&state.config.cors))
        .layer(TimeoutLayer::new(state.config.http.request_timeout))
        .layer(DefaultBodyLimit::max(state.config.http.max_body_bytes));

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/logout", get(handlers::logout))
        .route("/upload", post(handlers::upload))
        .route("/revoke", post(handlers::revoke))
        .route("/verify_document", get(handlers::verify_document))
        .route("/notifications", get(handlers::notifications))
        .layer(middleware)
        .with_state(state)
}
