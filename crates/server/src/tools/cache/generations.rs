//! cache_generations tool implementation.
//!
//! Lists the cache generations currently in storage.

use super::super::json_result;
use crate::host::{HostState, ServerHost};
use gatekeeper_client::Gatekeeper;
use gatekeeper_core::CacheStore;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output from the cache_generations tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGenerationsOutput {
    /// Generation this build owns.
    pub current: String,
    /// All generations in storage, oldest first.
    pub generations: Vec<String>,
    /// Host lifecycle flags.
    pub host: HostState,
}

/// Implementation of the cache_generations tool.
pub async fn generations_impl(gate: &Gatekeeper, host: &ServerHost) -> Result<CallToolResult, McpError> {
    let generations = gate.store().names().await?;

    json_result(&CacheGenerationsOutput {
        current: gate.generation().name.clone(),
        generations,
        host: host.state().await,
    })
}
