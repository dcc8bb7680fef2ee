//! # Adapters Module
//!
//! - `jsonrpc`: Ethereum JSON-RPC over HTTP
//! - `memory`: deterministic contract simulation with fault injection

pub mod jsonrpc;
pub mod memory;
