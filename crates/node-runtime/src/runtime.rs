use crate::container::{AppContainer, LedgerBackend, NodeConfig};
use crate::tasks::spawn_reconciler;
use anyhow::{Context, Result};
use pv_05_api_gateway::ApiGatewayService;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// The provenance node: gateway plus reconciler over one container.
pub struct NodeRuntime {
    container: Arc<AppContainer>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl NodeRuntime {
    /// Build every service from `config`. Fails on invalid configuration
    /// or an unreachable database.
    pub async fn new(config: NodeConfig) -> Result<Self> {
        info!("Creating provenance node runtime");
        let container = Arc::new(AppContainer::build(config).await?);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            container,
            shutdown_tx,
            shutdown_rx,
            tasks: Vec::new(),
        })
    }

    /// Bind the HTTP listener and spawn the background tasks.
    ///
    /// Returns the bound address, which differs from the configured one
    /// when port 0 was requested.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        let config = &self.container.config;
        info!("===========================================");
        info!("  Document Provenance Node v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let gateway = ApiGatewayService::new(self.container.gateway_state())
            .context("Invalid gateway configuration")?;
        let listener = gateway.bind().await.context("Failed to bind HTTP listener")?;
        let addr = listener
            .local_addr()
            .context("Failed to read bound address")?;

        let shutdown = self.shutdown_rx.clone();
        self.tasks.push(tokio::spawn(async move {
            if let Err(e) = gateway.serve(listener, shutdown).await {
                error!(error = %e, "HTTP gateway stopped with error");
            }
        }));

        self.tasks.push(spawn_reconciler(
            self.container.reconciler(),
            config.reconciler.interval,
            self.shutdown_rx.clone(),
        ));

        let backend = match config.ledger.backend {
            LedgerBackend::JsonRpc => config.ledger.rpc_url.as_str(),
            LedgerBackend::Memory => "memory",
        };
        info!("HTTP: http://{}", addr);
        info!("Database: {}", config.storage.database_url);
        info!("Ledger: {}", backend);
        info!(
            "Reconciler: every {:?}, abandon after {:?}",
            config.reconciler.interval, config.reconciler.max_intent_age
        );

        Ok(addr)
    }

    /// Signal every task to stop and wait for them to drain.
    pub async fn shutdown(self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        for task in self.tasks {
            match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Task ended abnormally"),
                Err(_) => warn!("Task did not stop within {:?}", SHUTDOWN_GRACE),
            }
        }

        info!("Shutdown complete");
    }

    pub fn container(&self) -> Arc<AppContainer> {
        Arc::clone(&self.container)
    }
}
