//! Domain layer for the storage crate.

pub mod errors;

pub use errors::{StoreError, StoreResult};
