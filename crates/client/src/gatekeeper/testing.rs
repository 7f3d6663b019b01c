//! In-process fakes for exercising the gatekeeper without a network.

use super::{Gatekeeper, Generation, WorkerHost};
use crate::fetch::{FetchResponse, Fetcher, Request};
use bytes::Bytes;
use gatekeeper_core::cache::compute_cache_key;
use gatekeeper_core::{CacheDb, CacheStore, Error, Snapshot};
use reqwest::{StatusCode, header};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use url::Url;

pub const ORIGIN: &str = "http://localhost:8888";

#[derive(Clone)]
enum Route {
    Respond { status: u16, body: String, release: Option<Arc<Notify>> },
    Fail,
}

/// Fetcher answering from a per-path script. Unscripted paths fail like a dropped connection.
#[derive(Default)]
pub struct ScriptedFetcher {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn route(&self, path: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), Route::Respond { status, body: body.to_string(), release: None });
    }

    /// Like `route`, but the response is held until the returned `Notify` fires.
    pub fn route_held(&self, path: &str, status: u16, body: &str) -> Arc<Notify> {
        let release = Arc::new(Notify::new());
        self.routes.lock().unwrap().insert(
            path.to_string(),
            Route::Respond { status, body: body.to_string(), release: Some(release.clone()) },
        );
        release
    }

    pub fn fail(&self, path: &str) {
        self.routes.lock().unwrap().insert(path.to_string(), Route::Fail);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request) -> Result<FetchResponse, Error> {
        let path = request.url.path().to_string();
        self.calls.lock().unwrap().push(path.clone());
        let route = self.routes.lock().unwrap().get(&path).cloned();

        match route {
            Some(Route::Respond { status, body, release }) => {
                if let Some(release) = release {
                    release.notified().await;
                }
                let mut headers = header::HeaderMap::new();
                headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/html"));
                Ok(FetchResponse {
                    url: request.url.clone(),
                    status: StatusCode::from_u16(status).unwrap(),
                    content_type: Some("text/html".to_string()),
                    bytes: Bytes::from(body),
                    headers,
                })
            }
            Some(Route::Fail) | None => Err(Error::HttpError(format!("network error: {path} unreachable"))),
        }
    }
}

/// CacheStore over an in-memory CacheDb with injectable failures.
pub struct FlakyStore {
    inner: CacheDb,
    failing_deletes: Mutex<HashSet<String>>,
    fail_names: AtomicBool,
    fail_lookup: AtomicBool,
}

impl FlakyStore {
    pub fn fail_delete(&self, generation: &str) {
        self.failing_deletes.lock().unwrap().insert(generation.to_string());
    }

    pub fn fail_names(&self) {
        self.fail_names.store(true, Ordering::SeqCst);
    }

    pub fn fail_lookup(&self) {
        self.fail_lookup.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl CacheStore for FlakyStore {
    async fn open(&self, generation: &str) -> Result<(), Error> {
        self.inner.open(generation).await
    }

    async fn lookup(&self, generation: &str, key: &str) -> Result<Option<Snapshot>, Error> {
        if self.fail_lookup.load(Ordering::SeqCst) {
            return Err(Error::CorruptSnapshot("lookup disabled".into()));
        }
        self.inner.lookup(generation, key).await
    }

    async fn put(&self, generation: &str, snapshot: &Snapshot) -> Result<(), Error> {
        self.inner.put(generation, snapshot).await
    }

    async fn put_all(&self, generation: &str, snapshots: &[Snapshot]) -> Result<(), Error> {
        self.inner.put_all(generation, snapshots).await
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        if self.failing_deletes.lock().unwrap().contains(generation) {
            return Err(Error::CorruptSnapshot(format!("cannot delete {generation}")));
        }
        self.inner.delete(generation).await
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        if self.fail_names.load(Ordering::SeqCst) {
            return Err(Error::CorruptSnapshot("names disabled".into()));
        }
        self.inner.names().await
    }
}

/// Host that records lifecycle calls.
#[derive(Default)]
pub struct RecordingHost {
    skipped: AtomicBool,
    claimed: AtomicBool,
    reject_skip: AtomicBool,
    reject_claim: AtomicBool,
}

impl RecordingHost {
    pub fn skipped(&self) -> bool {
        self.skipped.load(Ordering::SeqCst)
    }

    pub fn claimed(&self) -> bool {
        self.claimed.load(Ordering::SeqCst)
    }

    pub fn reject_skip_waiting(&self) {
        self.reject_skip.store(true, Ordering::SeqCst);
    }

    pub fn reject_claim(&self) {
        self.reject_claim.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl WorkerHost for RecordingHost {
    async fn skip_waiting(&self) -> Result<(), Error> {
        if self.reject_skip.load(Ordering::SeqCst) {
            return Err(Error::Host("skip_waiting rejected".into()));
        }
        self.skipped.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), Error> {
        if self.reject_claim.load(Ordering::SeqCst) {
            return Err(Error::Host("claim rejected".into()));
        }
        self.claimed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A gatekeeper wired to fakes, plus direct handles on each of them.
pub struct Fixture {
    pub gate: Gatekeeper,
    pub db: CacheDb,
    pub store: Arc<FlakyStore>,
    pub fetcher: Arc<ScriptedFetcher>,
    pub host: Arc<RecordingHost>,
}

impl Fixture {
    pub async fn new(generation: &str) -> Self {
        Self::with_seeds(generation, &["/"]).await
    }

    pub async fn with_seeds(generation: &str, seeds: &[&str]) -> Self {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = Arc::new(FlakyStore {
            inner: db.clone(),
            failing_deletes: Mutex::new(HashSet::new()),
            fail_names: AtomicBool::new(false),
            fail_lookup: AtomicBool::new(false),
        });
        let fetcher = Arc::new(ScriptedFetcher::default());
        let host = Arc::new(RecordingHost::default());
        let gate = Gatekeeper::with_generation(
            Generation::new(generation, seeds.iter().copied()),
            Url::parse(ORIGIN).unwrap(),
            store.clone(),
            fetcher.clone(),
            host.clone(),
        );

        Self { gate, db, store, fetcher, host }
    }

    pub fn url(path: &str) -> Url {
        Url::parse(ORIGIN).unwrap().join(path).unwrap()
    }

    /// Store `body` for a GET of `path` directly, bypassing the gatekeeper.
    pub async fn seed(&self, generation: &str, path: &str, body: &str) {
        let snapshot = Snapshot::new(
            "GET",
            Self::url(path).as_str(),
            200,
            vec![("content-type".into(), "text/html".into())],
            body,
        );
        self.db.upsert_entry(generation, &snapshot).await.unwrap();
    }

    pub async fn cached(&self, generation: &str, path: &str) -> Option<Snapshot> {
        let key = compute_cache_key("GET", Self::url(path).as_str());
        self.db.get_entry(generation, &key).await.unwrap()
    }
}
