//! # Ledger Client (pv-03)
//!
//! Client for the document registry smart contract, the authoritative record
//! of which fingerprints exist.
//!
//! ## Contract
//!
//! | Function | Kind | Client method |
//! |----------|------|---------------|
//! | `verifyDocument(string) returns (bool)` | view | `exists` |
//! | `uploadDocument(string)` | transaction | `submit_register` |
//! | `revokeDocument(string)` | transaction | `submit_revoke` |
//!
//! Transactions are two-phase: `submit_*` returns a hash as soon as the node
//! accepts it, then `await_confirmation` polls for the receipt within a
//! `ConfirmationPolicy`.
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - ABI encoding, JSON-RPC wire types, confirmation wait, errors
//! - `ports/` - `LedgerClient` trait
//! - `adapters/` - `JsonRpcLedger` (reqwest) and `InMemoryLedger`

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::jsonrpc::{JsonRpcConfig, JsonRpcLedger};
pub use adapters::memory::InMemoryLedger;
pub use domain::rpc_types::Address;
pub use domain::{await_confirmation, ConfirmationPolicy, LedgerError, LedgerResult};
pub use ports::inbound::LedgerClient;
