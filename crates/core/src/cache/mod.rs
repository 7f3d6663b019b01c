//! Generation-scoped response cache.
//!
//! A cache is split into named generations, one per deployed version. Each
//! generation maps a request identity to an immutable response snapshot.
//! The SQLite backend provides:
//!
//! - Content-addressed request keys using SHA-256 hashing
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Whole-generation eviction (entries cascade with their generation)

pub mod connection;
pub mod generations;
pub mod hash;
pub mod migrations;
pub mod snapshots;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use hash::compute_cache_key;
pub use snapshots::Snapshot;
pub use store::CacheStore;
