//! # Ports Layer
//!
//! - `outbound.rs` - Driven ports: the repositories the lifecycle and credential
//!   services require from a host-provided store.

pub mod outbound;
