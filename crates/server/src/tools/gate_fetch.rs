//! gate_fetch tool implementation.
//!
//! Routes a request descriptor through the gatekeeper. Requests the
//! gatekeeper declines, or any request before a generation is active, go
//! straight to the network as they would without an interceptor.

use super::json_result;
use crate::host::ServerHost;
use gatekeeper_client::fetch::{Method, header};
use gatekeeper_client::{Fetcher, Gatekeeper, Interception, Request, RequestMode};
use gatekeeper_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input parameters for gate_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GateFetchParams {
    /// Absolute URL or origin-relative path to request.
    pub url: String,

    /// HTTP method (default: GET). Only GET is intercepted.
    #[serde(default = "default_method")]
    pub method: String,

    /// Treat the request as a top-level document navigation.
    #[serde(default)]
    pub navigate: bool,

    /// Optional Accept header.
    #[serde(default)]
    pub accept: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for gate_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GateFetchOutput {
    /// The resolved request URL.
    pub url: String,
    /// Whether the gatekeeper handled the request.
    pub handled: bool,
    /// "cache", "network", "offline_shell", or "passthrough" when declined.
    pub source: String,
    /// HTTP status code.
    pub status: u16,
    /// Content-Type header.
    pub content_type: Option<String>,
    /// Response body, lossily decoded as UTF-8.
    pub body: String,
    /// Body length in bytes.
    pub bytes: usize,
}

/// Implementation of the gate_fetch tool.
pub async fn fetch_impl(
    gate: &Gatekeeper, host: &ServerHost, network: &dyn Fetcher, params: GateFetchParams,
) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let method = reqwest_method(&params.method)?;
    let mut request = Request::get(gate.resolve(&params.url)?).with_method(method);
    if params.navigate {
        request.mode = RequestMode::Navigate;
    }
    if let Some(accept) = params.accept.as_deref() {
        request = request.with_header(header::ACCEPT, accept);
    }

    let interception =
        if host.is_controlling().await { gate.intercept(request.clone()) } else { Interception::Declined };

    let output = match interception.into_response().await {
        Some(result) => {
            let response = result?;
            let source = serde_json::to_value(response.source)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            GateFetchOutput {
                url: request.url.to_string(),
                handled: true,
                source,
                status: response.status,
                content_type: response.content_type().map(str::to_string),
                body: String::from_utf8_lossy(&response.body).into_owned(),
                bytes: response.body.len(),
            }
        }
        None => {
            tracing::debug!("passthrough {} {}", request.method, request.url);
            let response = network.fetch(&request).await?;
            GateFetchOutput {
                url: request.url.to_string(),
                handled: false,
                source: "passthrough".into(),
                status: response.status.as_u16(),
                content_type: response.content_type.clone(),
                body: String::from_utf8_lossy(&response.bytes).into_owned(),
                bytes: response.bytes.len(),
            }
        }
    };

    json_result(&output)
}

fn reqwest_method(method: &str) -> Result<Method, Error> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidInput(format!("invalid method: {method}")))
}
