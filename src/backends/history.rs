//! history.nix-packages.com version history service

use serde::Deserialize;
use tracing::warn;

use crate::backends::{BackendError, VersionBackend};
use crate::version::Version;

const DEFAULT_BASE_URL: &str = "https://api.history.nix-packages.com";

pub const BACKEND_NAME: &str = "history.nix-packages.com";

#[derive(Debug, Deserialize)]
struct HistoryEntry {
    name: String,
    version: String,
    revision: String,
}

pub struct HistoryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HistoryClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("nix-versions")
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.to_string(),
        }
    }
}

impl Default for HistoryClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait::async_trait]
impl VersionBackend for HistoryClient {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn search(&self, query: &str) -> Result<Vec<Version>, BackendError> {
        let url = format!("{}/packages/{}", self.base_url, query);

        let response =
            self.client
                .get(&url)
                .send()
                .await
                .map_err(|source| BackendError::Fetch {
                    backend: BACKEND_NAME,
                    query: query.to_string(),
                    source,
                })?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NoVersions {
                backend: BACKEND_NAME,
                query: query.to_string(),
            });
        }

        if !status.is_success() {
            warn!("history service returned status {}: {}", status, url);
            return Err(BackendError::InvalidResponse {
                backend: BACKEND_NAME,
                query: query.to_string(),
                reason: format!("unexpected status: {}", status),
            });
        }

        let entries: Vec<HistoryEntry> =
            response
                .json()
                .await
                .map_err(|e| BackendError::InvalidResponse {
                    backend: BACKEND_NAME,
                    query: query.to_string(),
                    reason: e.to_string(),
                })?;

        let records = entries
            .into_iter()
            .map(|entry| Version {
                attribute: entry.name.clone(),
                name: entry.name,
                version: entry.version,
                flake: "nixpkgs".to_string(),
                revision: entry.revision,
            })
            .collect();

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn search_maps_entries_to_version_records() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/packages/ruby")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {"name": "ruby", "version": "3.2.0", "revision": "aaa111"},
                    {"name": "ruby", "version": "3.3.0", "revision": "bbb222"}
                ]"#,
            )
            .create_async()
            .await;

        let client = HistoryClient::new(&server.url());
        let records = client.search("ruby").await.unwrap();

        mock.assert_async().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "ruby");
        assert_eq!(records[0].attribute, "ruby");
        assert_eq!(records[0].version, "3.2.0");
        assert_eq!(records[0].revision, "aaa111");
        assert_eq!(records[0].flake, "nixpkgs");
    }

    #[tokio::test]
    async fn search_reports_unknown_packages() {
        let mut server = Server::new_async().await;

        server
            .mock("GET", "/packages/nope")
            .with_status(404)
            .create_async()
            .await;

        let client = HistoryClient::new(&server.url());
        let err = client.search("nope").await.unwrap_err();
        assert!(matches!(err, BackendError::NoVersions { .. }));
    }
}
