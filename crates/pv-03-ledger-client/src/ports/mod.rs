//! # Ports Layer
//!
//! - `inbound.rs` - `LedgerClient`, the contract API consumed by the lifecycle
//!   coordinator.

pub mod inbound;
