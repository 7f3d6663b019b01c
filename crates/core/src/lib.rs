//! Core types and shared functionality for the cache gatekeeper.
//!
//! This crate provides:
//! - Generation-scoped response cache with a SQLite backend
//! - The `CacheStore` capability the gatekeeper is built against
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheStore, Snapshot};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
