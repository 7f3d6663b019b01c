//! Fetch interception: cache-first with background revalidation.

use super::{Gatekeeper, is_storable};
use crate::fetch::{FetchResponse, Request};
use bytes::Bytes;
use futures_util::future::BoxFuture;
use gatekeeper_core::cache::compute_cache_key;
use gatekeeper_core::{Error, Snapshot};
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tokio::sync::oneshot;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    OfflineShell,
}

/// A response handed back to the host.
#[derive(Debug, Clone)]
pub struct GateResponse {
    pub source: ResponseSource,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl GateResponse {
    fn from_snapshot(snapshot: Snapshot, source: ResponseSource) -> Self {
        Self {
            source,
            url: snapshot.url,
            status: snapshot.status_code,
            headers: snapshot.headers,
            body: Bytes::from(snapshot.body),
        }
    }

    fn from_network(response: FetchResponse) -> Self {
        Self {
            source: ResponseSource::Network,
            url: response.url.to_string(),
            status: response.status.as_u16(),
            headers: response.header_pairs(),
            body: response.bytes,
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.as_str())
    }
}

/// The gatekeeper's decision for one intercepted request.
pub enum Interception {
    /// Not handled; the host applies its default network behaviour.
    Declined,
    /// Handled; the host awaits the future for the response.
    Respond(BoxFuture<'static, Result<GateResponse, Error>>),
}

impl Interception {
    pub fn is_declined(&self) -> bool {
        matches!(self, Interception::Declined)
    }

    /// Await the response, or `None` if the request was declined.
    pub async fn into_response(self) -> Option<Result<GateResponse, Error>> {
        match self {
            Interception::Declined => None,
            Interception::Respond(fut) => Some(fut.await),
        }
    }
}

impl fmt::Debug for Interception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interception::Declined => f.write_str("Declined"),
            Interception::Respond(_) => f.write_str("Respond(..)"),
        }
    }
}

type NetworkResult = Result<FetchResponse, Error>;

impl Gatekeeper {
    /// Decide how to handle an intercepted request.
    ///
    /// Returns immediately; all I/O happens inside the returned future.
    pub fn intercept(&self, request: Request) -> Interception {
        if !request.is_get() {
            tracing::debug!("declining {} {}", request.method, request.url);
            return Interception::Declined;
        }

        let gate = self.clone();
        Interception::Respond(Box::pin(async move {
            let start = Instant::now();
            let wants_shell = request.is_navigation() || request.accepts_html();

            let result = match gate.cache_or_network(&request).await {
                Err(e) if wants_shell => {
                    tracing::debug!("{} failed ({}), serving offline shell", request.url, e);
                    gate.offline_shell().await
                }
                other => other,
            };

            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(response) => tracing::debug!(
                    method = %request.method,
                    path = request.url.path(),
                    source = ?response.source,
                    status = response.status,
                    elapsed_ms,
                    "request served"
                ),
                Err(e) => tracing::warn!(
                    method = %request.method,
                    path = request.url.path(),
                    elapsed_ms,
                    "request failed: {}", e
                ),
            }

            result
        }))
    }

    async fn cache_or_network(&self, request: &Request) -> Result<GateResponse, Error> {
        let name = &self.generation.name;
        self.store.open(name).await?;

        let network = self.spawn_network(request.clone()).await;

        match self.store.lookup(name, &request.cache_key()).await {
            Ok(Some(snapshot)) => {
                tracing::debug!("cache hit for {}", request.url);
                return Ok(GateResponse::from_snapshot(snapshot, ResponseSource::Cache));
            }
            Ok(None) => tracing::debug!("cache miss for {}", request.url),
            Err(e) => tracing::warn!("cache lookup for {} failed, using network: {}", request.url, e),
        }

        match network.await {
            Ok(result) => result.map(GateResponse::from_network),
            Err(_) => Err(Error::TaskFailed(format!("network fetch for {} was dropped", request.url))),
        }
    }

    /// Start the network fetch + write-back as a tracked background task.
    ///
    /// The receiver yields the fetch result after the write-back attempt; it
    /// may be dropped, in which case the task still runs to completion.
    async fn spawn_network(&self, request: Request) -> oneshot::Receiver<NetworkResult> {
        let (tx, rx) = oneshot::channel();
        let fetcher = self.fetcher.clone();
        let store = self.store.clone();
        let generation = self.generation.name.clone();

        let mut refreshes = self.refreshes.lock().await;
        while refreshes.try_join_next().is_some() {}

        refreshes.spawn(async move {
            let result = fetcher.fetch(&request).await;

            match &result {
                Ok(response) if is_storable(&request.url) => {
                    let snapshot = response.to_snapshot(&request);
                    match store.put(&generation, &snapshot).await {
                        Ok(()) => tracing::debug!("stored {} in {}", request.url, generation),
                        Err(e) => tracing::warn!("failed to store {}: {}", request.url, e),
                    }
                }
                Ok(_) => tracing::debug!("not storing {} (no-store path)", request.url),
                Err(e) => tracing::debug!("network fetch for {} failed: {}", request.url, e),
            }

            let _ = tx.send(result);
        });

        rx
    }

    /// The cached root document of the application origin.
    async fn offline_shell(&self) -> Result<GateResponse, Error> {
        let root = self.resolve("/")?;
        let key = compute_cache_key("GET", root.as_str());

        match self.store.lookup(&self.generation.name, &key).await? {
            Some(snapshot) => Ok(GateResponse::from_snapshot(snapshot, ResponseSource::OfflineShell)),
            None => Err(Error::CacheMiss(root.to_string())),
        }
    }
}
