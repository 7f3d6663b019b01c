//! MCP tool implementations.
//!
//! This module contains all tools exposed by the gatekeeper server.

pub mod cache;
pub mod gate_fetch;
pub mod lifecycle;

#[cfg(test)]
pub(crate) mod testing;

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, rmcp::ErrorData> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| gatekeeper_core::Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
