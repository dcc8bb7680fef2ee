//! # Provenance Node Runtime
//!
//! Composition root for the document provenance service. Reads
//! configuration from the environment, builds the services once and runs
//! the HTTP gateway next to the intent reconciler.
//!
//! ## Modules
//!
//! - `container/` - Configuration and service construction
//! - `tasks` - Reconciler loop
//! - `runtime` - Startup and graceful shutdown
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging and metrics
//! 2. Load and validate configuration
//! 3. Open the database and apply additive migrations
//! 4. Select the ledger backend
//! 5. Bind HTTP, start the reconciler
//! 6. Wait for Ctrl+C, then drain

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod container;
pub mod runtime;
pub mod tasks;

pub use container::{AppContainer, NodeConfig};
pub use runtime::NodeRuntime;
