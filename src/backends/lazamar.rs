//! lazamar.co.uk nix version search, scoped to a nixpkgs channel
//!
//! The service renders its results as an HTML table; each result row links
//! back to itself with the package, version, revision and attribute name
//! encoded in the link's query string, so the rows are recovered from those
//! links rather than from the table cells.

use scraper::{Html, Selector};
use url::Url;

use crate::backends::{BackendError, ChannelBackend};
use crate::version::Version;

const DEFAULT_BASE_URL: &str = "https://lazamar.co.uk";

pub const BACKEND_NAME: &str = "lazamar.co.uk";

pub struct LazamarClient {
    client: reqwest::Client,
    base_url: String,
}

impl LazamarClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("nix-versions")
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.to_string(),
        }
    }

    fn scrape(&self, body: &str) -> Result<Vec<Version>, String> {
        let base = Url::parse(&self.base_url).map_err(|e| e.to_string())?;
        let document = Html::parse_document(body);
        let rows = Selector::parse("section table tbody tr td a").expect("valid selector");

        let mut records = Vec::new();
        for link in document.select(&rows) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let Ok(link_url) = base.join(href) else {
                continue;
            };

            let mut record = Version {
                name: String::new(),
                attribute: String::new(),
                version: String::new(),
                flake: "nixpkgs".to_string(),
                revision: String::new(),
            };
            for (key, value) in link_url.query_pairs() {
                match key.as_ref() {
                    "package" => record.name = value.to_string(),
                    "keyName" => record.attribute = value.to_string(),
                    "version" => record.version = value.to_string(),
                    "revision" => record.revision = value.to_string(),
                    _ => {}
                }
            }
            if !record.attribute.is_empty() {
                records.push(record);
            }
        }
        Ok(records)
    }
}

impl Default for LazamarClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait::async_trait]
impl ChannelBackend for LazamarClient {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn search(&self, query: &str, channel: &str) -> Result<Vec<Version>, BackendError> {
        let url = format!("{}/nix-versions/", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("channel", channel), ("package", query)])
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

        let body = response
            .text()
            .await
            .map_err(|e| BackendError::InvalidResponse {
                backend: BACKEND_NAME,
                query: query.to_string(),
                reason: e.to_string(),
            })?;

        let records = self
            .scrape(&body)
            .map_err(|reason| BackendError::InvalidResponse {
                backend: BACKEND_NAME,
                query: query.to_string(),
                reason,
            })?;

        if records.is_empty() {
            return Err(BackendError::NoVersions {
                backend: BACKEND_NAME,
                query: query.to_string(),
            });
        }

        Ok(records)
    }
}
