//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::host::ServerHost;
use crate::tools::cache::{CacheGetParams, generations_impl, get_impl};
use crate::tools::gate_fetch::{GateFetchParams, fetch_impl};
use crate::tools::lifecycle::{activate_impl, install_impl};
use gatekeeper_client::{Fetcher, Gatekeeper};
use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for the gatekeeper.
#[derive(Clone)]
pub struct GatekeeperServer {
    tool_router: ToolRouter<Self>,
    gate: Gatekeeper,
    host: Arc<ServerHost>,
    network: Arc<dyn Fetcher>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl GatekeeperServer {
    /// Create a new server handler.
    ///
    /// `network` serves requests the gatekeeper declines.
    pub fn new(gate: Gatekeeper, host: Arc<ServerHost>, network: Arc<dyn Fetcher>) -> Self {
        Self { tool_router: Self::tool_router(), gate, host, network }
    }

    /// Request a URL through the gatekeeper.
    #[tool(
        description = "Request a URL through the cache gatekeeper. GET requests are served cache-first with background revalidation; other methods pass through to the network."
    )]
    async fn gate_fetch(&self, params: Parameters<GateFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.gate, &self.host, self.network.as_ref(), params.0).await
    }

    /// Seed the current cache generation.
    #[tool(description = "Install the current cache generation by fetching and storing every seed resource.")]
    async fn gate_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.gate).await
    }

    /// Activate the current generation and prune older ones.
    #[tool(description = "Activate the current cache generation: claim clients and delete every other generation.")]
    async fn gate_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.gate, &self.host).await
    }

    /// List stored generations.
    #[tool(description = "List cache generations in storage and the gatekeeper's lifecycle state.")]
    async fn cache_generations(&self) -> Result<CallToolResult, McpError> {
        generations_impl(&self.gate, &self.host).await
    }

    /// Read a cached snapshot.
    #[tool(description = "Get the snapshot cached for a URL in the current generation.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.gate, params.0).await
    }
}

impl ServerHandler for GatekeeperServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "gatekeeper".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
