//! Lifecycle state of the gatekeeper inside this server.
//!
//! The server plays the part a browser plays for a service worker: it
//! records skip-waiting and client claims, and only routes requests through
//! the gatekeeper once a generation has been activated.

use gatekeeper_client::WorkerHost;
use gatekeeper_core::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Snapshot of the host's lifecycle flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HostState {
    /// Install asked to take over without waiting for clients to close.
    pub skip_waiting: bool,
    /// The gatekeeper has claimed open clients.
    pub clients_claimed: bool,
    /// Generation that finished activating, if any.
    pub active_generation: Option<String>,
}

#[derive(Debug, Default)]
pub struct ServerHost {
    state: RwLock<HostState>,
}

impl ServerHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn state(&self) -> HostState {
        self.state.read().await.clone()
    }

    /// Whether requests should be routed through the gatekeeper.
    pub async fn is_controlling(&self) -> bool {
        let state = self.state.read().await;
        state.clients_claimed && state.active_generation.is_some()
    }

    pub async fn mark_activated(&self, generation: &str) {
        self.state.write().await.active_generation = Some(generation.to_string());
    }
}

#[async_trait::async_trait]
impl WorkerHost for ServerHost {
    async fn skip_waiting(&self) -> Result<(), Error> {
        self.state.write().await.skip_waiting = true;
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if !state.skip_waiting {
            tracing::debug!("claiming clients before skip_waiting was requested");
        }
        state.clients_claimed = true;
        Ok(())
    }
}
