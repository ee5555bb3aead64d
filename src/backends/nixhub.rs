//! nixhub.io version index (served by search.devbox.sh)

use serde::Deserialize;
use tracing::warn;

use crate::backends::{BackendError, VersionBackend};
use crate::version::Version;

const DEFAULT_BASE_URL: &str = "https://search.devbox.sh";

pub const BACKEND_NAME: &str = "nixhub.io";

#[derive(Debug, Deserialize)]
struct Platform {
    attribute_path: String,
    commit_hash: String,
}

#[derive(Debug, Deserialize)]
struct Release {
    version: String,
    #[serde(default)]
    platforms: Vec<Platform>,
}

#[derive(Debug, Deserialize)]
struct PackageResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    releases: Vec<Release>,
}

pub struct NixHubClient {
    client: reqwest::Client,
    base_url: String,
}

impl NixHubClient {
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

impl Default for NixHubClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait::async_trait]
impl VersionBackend for NixHubClient {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn search(&self, query: &str) -> Result<Vec<Version>, BackendError> {
        let url = format!("{}/v2/pkg", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("name", query)])
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
            warn!("nixhub returned status {}: {}", status, url);
            return Err(BackendError::InvalidResponse {
                backend: BACKEND_NAME,
                query: query.to_string(),
                reason: format!("unexpected status: {}", status),
            });
        }

        let body: PackageResponse =
            response
                .json()
                .await
                .map_err(|e| BackendError::InvalidResponse {
                    backend: BACKEND_NAME,
                    query: query.to_string(),
                    reason: e.to_string(),
                })?;

        // one record per release; the last listed platform carries the
        // attribute path and nixpkgs commit for the preferred system
        let records = body
            .releases
            .into_iter()
            .filter_map(|release| {
                let platform = release.platforms.into_iter().last()?;
                Some(Version {
                    name: body.name.clone(),
                    attribute: platform.attribute_path,
                    version: release.version,
                    flake: "nixpkgs".to_string(),
                    revision: platform.commit_hash,
                })
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
    async fn search_maps_releases_to_version_records() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/v2/pkg?name=go")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "name": "go",
                    "releases": [
                        {
                            "version": "1.22.1",
                            "platforms": [
                                {"attribute_path": "go_1_22", "commit_hash": "aaa111"},
                                {"attribute_path": "go", "commit_hash": "bbb222"}
                            ]
                        },
                        {
                            "version": "1.21.0",
                            "platforms": [
                                {"attribute_path": "go_1_21", "commit_hash": "ccc333"}
                            ]
                        }
                    ]
                }"#,
            )
            .create_async()
            .await;

        let client = NixHubClient::new(&server.url());
        let records = client.search("go").await.unwrap();

        mock.assert_async().await;
        assert_eq!(records.len(), 2);
        // last platform wins
        assert_eq!(records[0].attribute, "go");
        assert_eq!(records[0].revision, "bbb222");
        assert_eq!(records[0].version, "1.22.1");
        assert_eq!(records[0].name, "go");
        assert_eq!(records[0].flake, "nixpkgs");
        assert_eq!(records[1].attribute, "go_1_21");
    }

    #[tokio::test]
    async fn search_skips_releases_without_platforms() {
        let mut server = Server::new_async().await;

        server
            .mock("GET", "/v2/pkg?name=odd")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"name": "odd", "releases": [{"version": "0.1.0", "platforms": []}]}"#,
            )
            .create_async()
            .await;

        let client = NixHubClient::new(&server.url());
        let records = client.search("odd").await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn search_reports_unknown_packages() {
        let mut server = Server::new_async().await;

        server
            .mock("GET", "/v2/pkg?name=nope")
            .with_status(404)
            .create_async()
            .await;

        let client = NixHubClient::new(&server.url());
        let err = client.search("nope").await.unwrap_err();
        assert!(matches!(err, BackendError::NoVersions { .. }));
        assert!(err.to_string().contains("`nope`"));
    }

    #[tokio::test]
    async fn search_reports_malformed_bodies() {
        let mut server = Server::new_async().await;

        server
            .mock("GET", "/v2/pkg?name=bad")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("not json")
            .create_async()
            .await;

        let client = NixHubClient::new(&server.url());
        let err = client.search("bad").await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidResponse { .. }));
    }
}
