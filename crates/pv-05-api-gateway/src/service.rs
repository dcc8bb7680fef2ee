//! Gateway service: binds the listener and runs background session upkeep.

use crate::domain::{ConfigError, GatewayConfig};
use crate::router::{build_router, AppState};
use provenance_telemetry::ACTIVE_SESSIONS;
use pv_02_credentials::SessionStore;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Gateway startup and serving errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// HTTP gateway over a prepared [`AppState`].
pub struct ApiGatewayService {
    state: AppState,
}

impl ApiGatewayService {
    pub fn new(state: AppState) -> Result<Self, GatewayError> {
        state.config.validate()?;
        Ok(Self { state })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.state.config
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener, GatewayError> {
        let addr = self.state.config.http_addr();
        TcpListener::bind(addr)
            .await
            .map_err(|source| GatewayError::Bind { addr, source })
    }

    /// Serve until `shutdown` flips to `true`, then drain in-flight requests.
    ///
    /// Also runs the session purge task for the lifetime of the server.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), GatewayError> {
        let purge = spawn_session_purge(
            self.state.sessions.clone(),
            self.state.config.session.purge_interval,
            shutdown.clone(),
        );

        let addr = listener.local_addr().map_err(GatewayError::Serve)?;
        info!(addr = %addr, "HTTP server listening");

        let router = build_router(self.state);
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await
            .map_err(GatewayError::Serve);

        purge.abort();
        info!("HTTP server stopped");
        result
    }
}

/// Periodically evict idle sessions until shutdown.
pub fn spawn_session_purge(
    sessions: Arc<SessionStore>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = sessions.purge_expired();
                    ACTIVE_SESSIONS.set(sessions.len() as f64);
                    if removed > 0 {
                        debug!(removed, remaining = sessions.len(), "Purged idle sessions");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }
}
