//! Shared wiring for tool tests: in-memory cache, real HTTP client, mock origin.

use crate::host::ServerHost;
use gatekeeper_client::{FetchClient, FetchConfig, Gatekeeper, Generation};
use gatekeeper_core::CacheDb;
use rmcp::model::CallToolResult;
use std::sync::Arc;
use url::Url;
use wiremock::MockServer;

pub struct Harness {
    pub server: MockServer,
    pub db: CacheDb,
    pub gate: Gatekeeper,
    pub host: Arc<ServerHost>,
    pub network: Arc<FetchClient>,
}

impl Harness {
    pub async fn start(generation: &str) -> Self {
        let server = MockServer::start().await;
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = Arc::new(FetchClient::new(FetchConfig::default()).unwrap());
        let host = Arc::new(ServerHost::new());
        let gate = Gatekeeper::with_generation(
            Generation::new(generation, ["/"]),
            Url::parse(&server.uri()).unwrap(),
            Arc::new(db.clone()),
            network.clone(),
            host.clone(),
        );

        Self { server, db, gate, host, network }
    }
}

/// The JSON text payload of a successful tool result.
pub fn text_of(result: &CallToolResult) -> String {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    content
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content")
        .to_string()
}
