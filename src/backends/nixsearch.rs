//! search.nixos.org package index (Elasticsearch)
//!
//! Used to answer "which packages install this program" and free-text
//! attribute searches. The index is read with the public credentials the
//! search.nixos.org frontend itself ships.

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::backends::{BackendError, ProgramIndex};

const DEFAULT_BASE_URL: &str = "https://search.nixos.org/backend";

/// Index alias tracking the unstable channel.
const INDEX: &str = "latest-43-nixos-unstable";

// public read-only credentials, same as the web frontend
const USERNAME: &str = "aWVSALXpZv";
const PASSWORD: &str = "X8gPHnzL52wFEekuxsfQ9cSh";

pub const BACKEND_NAME: &str = "search.nixos.org";

#[derive(Debug, Deserialize)]
struct EsResponse {
    hits: EsHits,
}

#[derive(Debug, Deserialize)]
struct EsHits {
    hits: Vec<EsHit>,
}

#[derive(Debug, Deserialize)]
struct EsHit {
    #[serde(rename = "_source")]
    source: EsPackage,
}

#[derive(Debug, Deserialize)]
struct EsPackage {
    package_attr_name: String,
    #[serde(default)]
    package_programs: Vec<String>,
}

pub struct NixSearchClient {
    client: reqwest::Client,
    base_url: String,
}

impl NixSearchClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("nix-versions")
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.to_string(),
        }
    }

    async fn run_query(
        &self,
        query: &str,
        body: serde_json::Value,
    ) -> Result<Vec<EsPackage>, BackendError> {
        let url = format!("{}/{}/_search", self.base_url, INDEX);

        let response = self
            .client
            .post(&url)
            .basic_auth(USERNAME, Some(PASSWORD))
            .json(&body)
            .send()
            .await
            .map_err(|source| BackendError::Fetch {
                backend: BACKEND_NAME,
                query: query.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::InvalidResponse {
                backend: BACKEND_NAME,
                query: query.to_string(),
                reason: format!("unexpected status: {}", status),
            });
        }

        let parsed: EsResponse =
            response
                .json()
                .await
                .map_err(|e| BackendError::InvalidResponse {
                    backend: BACKEND_NAME,
                    query: query.to_string(),
                    reason: e.to_string(),
                })?;

        debug!("{} returned {} hits for `{}`", BACKEND_NAME, parsed.hits.hits.len(), query);
        Ok(parsed.hits.hits.into_iter().map(|hit| hit.source).collect())
    }
}

impl Default for NixSearchClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait::async_trait]
impl ProgramIndex for NixSearchClient {
    async fn find_packages_providing_program(
        &self,
        program: &str,
        exact: bool,
        max_results: usize,
    ) -> Result<Vec<String>, BackendError> {
        let body = json!({
            "size": max_results,
            "query": {
                "bool": {
                    "filter": [{"term": {"type": {"value": "package"}}}],
                    "must": [{"match": {"package_programs": program}}]
                }
            }
        });

        let packages = self.run_query(program, body).await?;

        let names: Vec<String> = packages
            .into_iter()
            .filter(|pkg| !exact || pkg.package_programs.iter().any(|p| p == program))
            .map(|pkg| pkg.package_attr_name)
            .collect();

        if names.is_empty() {
            return Err(BackendError::NoProgramMatch {
                program: program.to_string(),
            });
        }
        Ok(names)
    }

    async fn find_packages_matching_query(
        &self,
        search: &str,
        max_results: usize,
    ) -> Result<Vec<String>, BackendError> {
        let body = json!({
            "size": max_results,
            "query": {
                "bool": {
                    "filter": [{"term": {"type": {"value": "package"}}}],
                    "must": [{
                        "query_string": {
                            "query": search,
                            "fields": ["package_attr_name^9", "package_pname^6", "package_description"]
                        }
                    }]
                }
            }
        });

        let packages = self.run_query(search, body).await?;

        let mut names: Vec<String> = Vec::new();
        for pkg in packages {
            if !names.contains(&pkg.package_attr_name) {
                names.push(pkg.package_attr_name);
            }
        }

        if names.is_empty() {
            return Err(BackendError::NoQueryMatch {
                search: search.to_string(),
            });
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn hits_body(sources: &[serde_json::Value]) -> String {
        serde_json::to_string(&serde_json::json!({"hits": {"hits": sources
            .iter()
            .map(|s| serde_json::json!({"_source": s}))
            .collect::<Vec<_>>()}}))
        .unwrap()
    }

    #[tokio::test]
    async fn program_lookup_returns_attribute_names_in_index_order() {
        let mut server = Server::new_async().await;

        let body = hits_body(&[
            serde_json::json!({"package_attr_name": "coreutils", "package_programs": ["pwd", "ls"]}),
            serde_json::json!({"package_attr_name": "busybox", "package_programs": ["pwd"]}),
        ]);
        let mock = server
            .mock("POST", format!("/{}/_search", INDEX).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let client = NixSearchClient::new(&server.url());
        let names = client
            .find_packages_providing_program("pwd", true, 10)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(names, vec!["coreutils", "busybox"]);
    }

    #[tokio::test]
    async fn exact_program_lookup_filters_partial_matches() {
        let mut server = Server::new_async().await;

        let body = hits_body(&[
            serde_json::json!({"package_attr_name": "gnupg", "package_programs": ["gpg", "gpgv"]}),
            serde_json::json!({"package_attr_name": "other", "package_programs": ["gpg-agent"]}),
        ]);
        server
            .mock("POST", format!("/{}/_search", INDEX).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let client = NixSearchClient::new(&server.url());
        let names = client
            .find_packages_providing_program("gpg", true, 10)
            .await
            .unwrap();
        assert_eq!(names, vec!["gnupg"]);
    }

    #[tokio::test]
    async fn program_lookup_with_no_matches_is_an_error() {
        let mut server = Server::new_async().await;

        server
            .mock("POST", format!("/{}/_search", INDEX).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(hits_body(&[]))
            .create_async()
            .await;

        let client = NixSearchClient::new(&server.url());
        let err = client
            .find_packages_providing_program("nope", true, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NoProgramMatch { .. }));
    }

    #[tokio::test]
    async fn free_text_lookup_deduplicates_attribute_names() {
        let mut server = Server::new_async().await;

        let body = hits_body(&[
            serde_json::json!({"package_attr_name": "emacs"}),
            serde_json::json!({"package_attr_name": "emacs"}),
            serde_json::json!({"package_attr_name": "emacs-nox"}),
        ]);
        server
            .mock("POST", format!("/{}/_search", INDEX).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let client = NixSearchClient::new(&server.url());
        let names = client
            .find_packages_matching_query("emacs", 10)
            .await
            .unwrap();
        assert_eq!(names, vec!["emacs", "emacs-nox"]);
    }
}
