//! # Adapters Module
//!
//! - `time`: system clock and a manual clock for tests

pub mod time;
