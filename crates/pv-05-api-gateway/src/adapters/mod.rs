//! Conversions from the service crates' errors.

pub mod error_conversions;
