//! Gatekeeper server entry point.
//!
//! Boots the cache gatekeeper (install, then activate) and serves it as an
//! MCP server on stdio transport. Logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use gatekeeper_client::{FetchClient, FetchConfig, Gatekeeper};
use gatekeeper_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod host;
mod tools;

use host::ServerHost;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let origin = config.origin_url()?;

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache at {}", config.db_path.display()))?;
    let network = Arc::new(FetchClient::new(FetchConfig::from_app(&config))?);
    let host = Arc::new(ServerHost::new());
    let gate = Gatekeeper::new(origin, Arc::new(db), network.clone(), host.clone());

    boot(&gate, &host).await;

    tracing::info!(generation = %gate.generation().name, "Starting gatekeeper server on stdio transport");

    let handler = handler::GatekeeperServer::new(gate.clone(), host, network);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    gate.settle().await;

    Ok(())
}

/// Install and activate the compiled-in generation.
///
/// A failed install leaves the gatekeeper inactive: every request passes
/// straight through to the network until `gate_install` and
/// `gate_activate` succeed.
async fn boot(gate: &Gatekeeper, host: &ServerHost) {
    match gate.install().await {
        Ok(report) => tracing::info!(generation = %report.generation, seeded = report.seeded.len(), "installed"),
        Err(e) => {
            tracing::error!("install failed, gatekeeper stays inactive: {}", e);
            return;
        }
    }

    match gate.activate().await {
        Ok(report) => host.mark_activated(&report.generation).await,
        Err(e) => tracing::error!("activation failed, gatekeeper stays inactive: {}", e),
    }
}
