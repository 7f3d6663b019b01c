//! gate_install and gate_activate tool implementations.
//!
//! Run the gatekeeper's install and activate phases on demand, e.g. to
//! retry a failed install after the origin comes back.

use super::json_result;
use crate::host::{HostState, ServerHost};
use gatekeeper_client::Gatekeeper;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output from the gate_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallOutput {
    /// Generation that was seeded.
    pub generation: String,
    /// Seed URLs stored in the generation.
    pub seeded: Vec<String>,
}

/// Output from the gate_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivateOutput {
    /// Generation that is now current.
    pub generation: String,
    /// Stale generations that were deleted.
    pub deleted: Vec<String>,
    /// Stale generations whose deletion failed; retried on the next activation.
    pub failed: Vec<String>,
    /// Host lifecycle flags after activation.
    pub host: HostState,
}

/// Implementation of the gate_install tool.
pub async fn install_impl(gate: &Gatekeeper) -> Result<CallToolResult, McpError> {
    let report = gate.install().await?;
    json_result(&InstallOutput { generation: report.generation, seeded: report.seeded })
}

/// Implementation of the gate_activate tool.
pub async fn activate_impl(gate: &Gatekeeper, host: &ServerHost) -> Result<CallToolResult, McpError> {
    let report = gate.activate().await?;
    host.mark_activated(&report.generation).await;

    json_result(&ActivateOutput {
        generation: report.generation,
        deleted: report.deleted,
        failed: report.failed,
        host: host.state().await,
    })
}
