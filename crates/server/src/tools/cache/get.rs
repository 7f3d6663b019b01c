//! cache_get tool implementation.
//!
//! Retrieves the snapshot stored for a GET of a URL in the current generation.

use super::super::json_result;
use gatekeeper_client::Gatekeeper;
use gatekeeper_core::cache::compute_cache_key;
use gatekeeper_core::{CacheStore, Error, Snapshot};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL or origin-relative path (e.g. "/").
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    /// Generation the snapshot was read from.
    pub generation: String,
    /// The cached snapshot.
    pub snapshot: Snapshot,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(gate: &Gatekeeper, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let url = gate.resolve(&params.url)?;
    let generation = gate.generation().name.clone();
    let snapshot = gate
        .store()
        .lookup(&generation, &compute_cache_key("GET", url.as_str()))
        .await?
        .ok_or_else(|| Error::CacheMiss(url.to_string()))?;

    json_result(&CacheGetOutput { generation, snapshot })
}
