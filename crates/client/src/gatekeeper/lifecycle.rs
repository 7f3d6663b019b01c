//! Install and activate phases.

use super::Gatekeeper;
use crate::fetch::{FetchResponse, Request};
use futures_util::future::{join_all, try_join_all};
use gatekeeper_core::Error;
use serde::Serialize;

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub generation: String,
    pub seeded: Vec<String>,
}

/// Outcome of an activation.
///
/// `failed` lists stale generations whose deletion errored; they are left
/// for the next activation and never fail this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub generation: String,
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

impl Gatekeeper {
    /// Create and seed the current generation.
    ///
    /// Every seed is fetched before anything is stored; one failed fetch or
    /// non-2xx status fails the whole install and leaves the cache untouched.
    /// Re-running install overwrites the seeded entries.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let name = &self.generation.name;

        if let Err(e) = self.host.skip_waiting().await {
            tracing::warn!(generation = %name, "skip_waiting rejected: {}", e);
        }

        self.store.open(name).await?;

        let requests = self
            .generation
            .seeds
            .iter()
            .map(|seed| self.resolve(seed).map(Request::get))
            .collect::<Result<Vec<_>, _>>()?;

        let responses = try_join_all(requests.iter().map(|request| self.fetch_seed(request))).await?;

        let snapshots: Vec<_> = requests
            .iter()
            .zip(&responses)
            .map(|(request, response)| response.to_snapshot(request))
            .collect();
        self.store.put_all(name, &snapshots).await?;

        let seeded: Vec<String> = requests.iter().map(|r| r.url.to_string()).collect();
        tracing::info!(generation = %name, seeded = seeded.len(), "install complete");

        Ok(InstallReport { generation: name.clone(), seeded })
    }

    async fn fetch_seed(&self, request: &Request) -> Result<FetchResponse, Error> {
        let response = self
            .fetcher
            .fetch(request)
            .await
            .map_err(|e| Error::SeedFailed { url: request.url.to_string(), reason: e.to_string() })?;

        if !response.status.is_success() {
            return Err(Error::SeedFailed {
                url: request.url.to_string(),
                reason: format!("status {}", response.status.as_u16()),
            });
        }

        Ok(response)
    }

    /// Take control of open clients and prune every other generation.
    ///
    /// Claiming and pruning run concurrently; activation finishes when both
    /// do. A failed claim or a failed listing of generations fails the
    /// activation; a failed individual deletion does not.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let (claimed, pruned) = tokio::join!(self.host.claim_clients(), self.prune());
        claimed?;
        let report = pruned?;

        tracing::info!(
            generation = %report.generation,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "activation complete"
        );

        Ok(report)
    }

    async fn prune(&self) -> Result<ActivateReport, Error> {
        let current = &self.generation.name;
        let stale: Vec<String> = self
            .store
            .names()
            .await?
            .into_iter()
            .filter(|name| name != current)
            .collect();

        let results = join_all(stale.iter().map(|name| self.store.delete(name))).await;

        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        for (name, result) in stale.into_iter().zip(results) {
            match result {
                Ok(_) => {
                    tracing::debug!(generation = %name, "deleted stale generation");
                    deleted.push(name);
                }
                Err(e) => {
                    tracing::warn!(generation = %name, "failed to delete stale generation: {}", e);
                    failed.push(name);
                }
            }
        }

        Ok(ActivateReport { generation: current.clone(), deleted, failed })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;

    #[tokio::test]
    async fn test_install_seeds_current_generation() {
        let fixture = Fixture::new("everything-v13").await;
        fixture.fetcher.route("/", 200, "<html>shell</html>");

        let report = fixture.gate.install().await.unwrap();
        assert_eq!(report.generation, "everything-v13");
        assert_eq!(report.seeded, vec!["http://localhost:8888/".to_string()]);
        assert!(fixture.host.skipped());

        let shell = fixture.cached("everything-v13", "/").await.unwrap();
        assert_eq!(shell.body, b"<html>shell</html>");
    }

    #[tokio::test]
    async fn test_install_is_idempotent() {
        let fixture = Fixture::new("everything-v13").await;
        fixture.fetcher.route("/", 200, "<html>shell</html>");

        fixture.gate.install().await.unwrap();
        let first = fixture.cached("everything-v13", "/").await.unwrap();
        fixture.gate.install().await.unwrap();
        let second = fixture.cached("everything-v13", "/").await.unwrap();

        assert_eq!(first.body, second.body);
        assert_eq!(first.hash, second.hash);
        assert_eq!(fixture.db.entry_count("everything-v13").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_install_overwrites_existing_entry() {
        let fixture = Fixture::new("everything-v13").await;
        fixture.seed("everything-v13", "/", "<html>stale</html>").await;
        fixture.fetcher.route("/", 200, "<html>fresh</html>");

        fixture.gate.install().await.unwrap();

        let shell = fixture.cached("everything-v13", "/").await.unwrap();
        assert_eq!(shell.body, b"<html>fresh</html>");
    }

    #[tokio::test]
    async fn test_install_fails_on_network_error() {
        let fixture = Fixture::with_seeds("everything-v13", &["/", "/app.js"]).await;
        fixture.fetcher.route("/", 200, "<html>shell</html>");
        fixture.fetcher.fail("/app.js");

        let result = fixture.gate.install().await;
        assert!(matches!(result, Err(Error::SeedFailed { url, .. }) if url.ends_with("/app.js")));
        assert!(fixture.cached("everything-v13", "/").await.is_none());
    }

    #[tokio::test]
    async fn test_install_fails_on_error_status() {
        let fixture = Fixture::new("everything-v13").await;
        fixture.fetcher.route("/", 503, "unavailable");

        let result = fixture.gate.install().await;
        assert!(matches!(result, Err(Error::SeedFailed { reason, .. }) if reason == "status 503"));
        assert_eq!(fixture.db.entry_count("everything-v13").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_install_survives_skip_waiting_rejection() {
        let fixture = Fixture::new("everything-v13").await;
        fixture.host.reject_skip_waiting();
        fixture.fetcher.route("/", 200, "<html>shell</html>");

        assert!(fixture.gate.install().await.is_ok());
    }

    #[tokio::test]
    async fn test_activate_prunes_other_generations() {
        let fixture = Fixture::new("everything-v13").await;
        fixture.seed("everything-v11", "/", "v11").await;
        fixture.seed("everything-v12", "/", "v12").await;
        fixture.db.open_generation("everything-v13").await.unwrap();

        let report = fixture.gate.activate().await.unwrap();
        assert_eq!(report.deleted, vec!["everything-v11".to_string(), "everything-v12".to_string()]);
        assert!(report.failed.is_empty());
        assert!(fixture.host.claimed());
        assert_eq!(fixture.db.generation_names().await.unwrap(), vec!["everything-v13".to_string()]);
    }

    #[tokio::test]
    async fn test_activate_isolates_failed_deletion() {
        let fixture = Fixture::new("everything-v13").await;
        fixture.seed("everything-v11", "/", "v11").await;
        fixture.seed("everything-v12", "/", "v12").await;
        fixture.store.fail_delete("everything-v11");

        let report = fixture.gate.activate().await.unwrap();
        assert_eq!(report.deleted, vec!["everything-v12".to_string()]);
        assert_eq!(report.failed, vec!["everything-v11".to_string()]);
        assert_eq!(fixture.db.generation_names().await.unwrap(), vec!["everything-v11".to_string()]);
    }

    #[tokio::test]
    async fn test_activate_surfaces_enumeration_failure() {
        let fixture = Fixture::new("everything-v13").await;
        fixture.store.fail_names();

        assert!(fixture.gate.activate().await.is_err());
        assert!(fixture.host.claimed());
    }

    #[tokio::test]
    async fn test_activate_surfaces_claim_failure_after_pruning() {
        let fixture = Fixture::new("everything-v13").await;
        fixture.seed("everything-v12", "/", "v12").await;
        fixture.host.reject_claim();

        assert!(matches!(fixture.gate.activate().await, Err(Error::Host(_))));
        assert!(fixture.db.generation_names().await.unwrap().is_empty());
    }
}
