//! Domain layer for the ledger client.

pub mod abi;
pub mod confirmation;
pub mod errors;
pub mod rpc_types;

pub use confirmation::{await_confirmation, ConfirmationPolicy};
pub use errors::{LedgerError, LedgerResult};
