//! # Provenance Node
//!
//! Entry point. See the `node_runtime` library for the startup sequence.

use anyhow::{Context, Result};
use node_runtime::{NodeConfig, NodeRuntime};
use provenance_telemetry::{init_telemetry, TelemetryConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry(&TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;

    let config = NodeConfig::from_env().context("Failed to load configuration")?;

    let mut runtime = NodeRuntime::new(config).await?;
    runtime.start().await?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    runtime.shutdown().await;
    Ok(())
}
