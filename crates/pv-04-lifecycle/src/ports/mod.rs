//! # Ports Layer
//!
//! - `outbound.rs` - `TimeSource`

pub mod outbound;
