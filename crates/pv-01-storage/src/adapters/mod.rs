//! # Adapters Module
//!
//! - `sqlite`: production store on sqlx + SQLite
//! - `memory`: lock-guarded in-memory store for tests and development
//! - `migrations`: additive schema migration for the SQLite store

pub mod memory;
pub mod migrations;
pub mod sqlite;
