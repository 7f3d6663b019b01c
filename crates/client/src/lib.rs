//! Client code for the cache gatekeeper.
//!
//! This crate provides the network fetch capability and the gatekeeper that
//! composes it with a cache store into one request-handling policy.

pub mod fetch;
pub mod gatekeeper;

pub use fetch::{FetchClient, FetchConfig, FetchResponse, Fetcher, Request, RequestMode};
pub use gatekeeper::{
    ActivateReport, CACHE_NAME, GateResponse, Gatekeeper, Generation, InstallReport, Interception, NO_STORE_SEGMENT,
    ResponseSource, SEED_FILES, WorkerHost,
};
