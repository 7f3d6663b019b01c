//! The cache gatekeeper: a stale-while-revalidate request policy over one
//! versioned cache generation.
//!
//! ### Lifecycle
//! - **Install**: seed the current generation with [`SEED_FILES`], all or nothing,
//!   and ask the host to skip the waiting period.
//! - **Activate**: claim open clients and, concurrently, delete every
//!   generation other than the current one.
//!
//! ### Interception
//! - Non-GET requests are declined.
//! - GET requests race a cache lookup against a network fetch. A hit is served
//!   immediately; the fetch still completes and refreshes the cache in the
//!   background. A miss waits for the network.
//! - Every network response is written back unless the URL contains
//!   [`NO_STORE_SEGMENT`].
//! - Navigations and HTML requests that fail on both paths get the cached
//!   root document (offline shell).

mod intercept;
mod lifecycle;

#[cfg(test)]
mod testing;

pub use intercept::{GateResponse, Interception, ResponseSource};
pub use lifecycle::{ActivateReport, InstallReport};

use crate::fetch::{Fetcher, resolve};
use gatekeeper_core::{CacheStore, Error};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use url::Url;

/// Label of the cache generation this build owns.
/// Bump it on every deployment so activation prunes the previous one.
pub const CACHE_NAME: &str = "everything-v13";

/// Resources stored unconditionally at install time.
pub const SEED_FILES: &[&str] = &["/"];

/// URLs containing this substring are never written back to the cache.
pub const NO_STORE_SEGMENT: &str = "/file";

/// A named cache generation and the resources that seed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub name: String,
    pub seeds: Vec<String>,
}

impl Generation {
    pub fn new(name: impl Into<String>, seeds: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { name: name.into(), seeds: seeds.into_iter().map(Into::into).collect() }
    }
}

impl Default for Generation {
    fn default() -> Self {
        Self::new(CACHE_NAME, SEED_FILES.iter().copied())
    }
}

/// Lifecycle hooks provided by whatever runs the gatekeeper.
#[async_trait::async_trait]
pub trait WorkerHost: Send + Sync {
    /// Take over as soon as install finishes instead of waiting for existing clients to close.
    async fn skip_waiting(&self) -> Result<(), Error>;

    /// Start controlling every open client without a reload.
    async fn claim_clients(&self) -> Result<(), Error>;
}

/// Mediates requests between a cache store and the network.
///
/// Cheap to clone; clones share the store, fetcher, host and the set of
/// in-flight background refreshes.
#[derive(Clone)]
pub struct Gatekeeper {
    generation: Arc<Generation>,
    origin: Arc<Url>,
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    host: Arc<dyn WorkerHost>,
    refreshes: Arc<Mutex<JoinSet<()>>>,
}

impl Gatekeeper {
    /// Create a gatekeeper owning the compiled-in generation.
    pub fn new(
        origin: Url, store: Arc<dyn CacheStore>, fetcher: Arc<dyn Fetcher>, host: Arc<dyn WorkerHost>,
    ) -> Self {
        Self::with_generation(Generation::default(), origin, store, fetcher, host)
    }

    /// Create a gatekeeper owning an explicit generation.
    pub fn with_generation(
        generation: Generation, origin: Url, store: Arc<dyn CacheStore>, fetcher: Arc<dyn Fetcher>,
        host: Arc<dyn WorkerHost>,
    ) -> Self {
        Self {
            generation: Arc::new(generation),
            origin: Arc::new(origin),
            store,
            fetcher,
            host,
            refreshes: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Resolve a request target (absolute URL or origin-relative path).
    pub fn resolve(&self, target: &str) -> Result<Url, Error> {
        resolve(&self.origin, target).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    /// Wait for every background refresh started so far to finish.
    ///
    /// Refreshes spawned while draining are left for the next call.
    pub async fn settle(&self) {
        let mut pending = std::mem::take(&mut *self.refreshes.lock().await);
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                tracing::warn!("background refresh task failed: {}", e);
            }
        }
    }
}

/// Whether a response for `url` may be written back to the cache.
pub fn is_storable(url: &Url) -> bool {
    !url.as_str().contains(NO_STORE_SEGMENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_generation() {
        let generation = Generation::default();
        assert_eq!(generation.name, "everything-v13");
        assert_eq!(generation.seeds, vec!["/".to_string()]);
    }

    #[test]
    fn test_is_storable() {
        let url = |s: &str| Url::parse(s).unwrap();
        assert!(is_storable(&url("http://localhost:8888/")));
        assert!(is_storable(&url("http://localhost:8888/profile")));
        assert!(!is_storable(&url("http://localhost:8888/file/report.pdf")));
        assert!(!is_storable(&url("http://localhost:8888/api/files?id=1")));
    }
}
