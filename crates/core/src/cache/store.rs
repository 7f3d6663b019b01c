//! The cache storage capability.

use super::snapshots::Snapshot;
use crate::Error;

/// Generation-scoped response storage.
///
/// The gatekeeper only talks to storage through this trait, so hosts can back
/// it with SQLite ([`super::CacheDb`]) or anything else that can keep named
/// maps of snapshots. Implementations must serialize conflicting writes.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the generation if it does not exist yet.
    async fn open(&self, generation: &str) -> Result<(), Error>;

    /// Look up a snapshot by request key within one generation.
    async fn lookup(&self, generation: &str, key: &str) -> Result<Option<Snapshot>, Error>;

    /// Store a snapshot, replacing any entry with the same key.
    /// The generation is created if missing.
    async fn put(&self, generation: &str, snapshot: &Snapshot) -> Result<(), Error>;

    /// Store several snapshots as one unit: all of them or none.
    ///
    /// The default stores them one by one; backends with transactions
    /// should override it.
    async fn put_all(&self, generation: &str, snapshots: &[Snapshot]) -> Result<(), Error> {
        for snapshot in snapshots {
            self.put(generation, snapshot).await?;
        }
        Ok(())
    }

    /// Delete a generation and all of its entries. Returns whether it existed.
    async fn delete(&self, generation: &str) -> Result<bool, Error>;

    /// Names of all existing generations, oldest first.
    async fn names(&self) -> Result<Vec<String>, Error>;
}
