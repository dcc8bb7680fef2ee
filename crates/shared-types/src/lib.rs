//! # Shared Types Crate
//!
//! Domain entities used across the provenance workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: identities, fingerprints, document records and
//!   ledger receipts are defined once here and reused by storage, ledger and
//!   gateway crates.
//! - **Validated Newtypes**: a [`Fingerprint`] can only be built through
//!   [`Fingerprint::parse`], so downstream code never sees an empty hash.
//! - **Capabilities, not identities**: privileged access is a property of a
//!   [`Role`], checked through [`Role::grants`].

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
