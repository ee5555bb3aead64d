//! Token -> spec parsing
//!
//! The algorithm narrows one raw token in order: version constraint at the
//! last `@` (replaced by file contents when it names a readable file),
//! output selectors at the last `^`, then a scheme prefix fixing the
//! backend. A bare identifier, `bin/<program>` or `~<words>` query falls to
//! the caller-supplied default backend; anything else is a direct flake
//! installable reference.

use std::sync::LazyLock;

use futures::future::try_join_all;
use regex::Regex;

use crate::config::DEFAULT_LAZAMAR_CHANNEL;
use crate::spec::{PackageSearchSpec, SpecError, VersionsBackend};

static SIMPLE_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_\-\.]+$").expect("valid regex"));

/// Backend assigned to specs that carry no scheme of their own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DefaultBackend {
    #[default]
    NixHub,
    History,
    Lazamar {
        channel: String,
    },
}

impl DefaultBackend {
    fn to_backend(&self) -> VersionsBackend {
        match self {
            DefaultBackend::NixHub => VersionsBackend::NixHub,
            DefaultBackend::History => VersionsBackend::History,
            DefaultBackend::Lazamar { channel } => VersionsBackend::Lazamar {
                channel: channel.clone(),
            },
        }
    }

    fn lazamar_channel(&self) -> &str {
        match self {
            DefaultBackend::Lazamar { channel } => channel,
            _ => DEFAULT_LAZAMAR_CHANNEL,
        }
    }
}

/// Parse a batch of tokens, one concurrent task per token.
///
/// Any token failing to parse fails the whole batch with that token's
/// error; no partial results are returned.
pub async fn parse_search_specs(
    tokens: &[String],
    default: &DefaultBackend,
) -> Result<Vec<PackageSearchSpec>, SpecError> {
    try_join_all(tokens.iter().map(|token| parse_search_spec(token, default))).await
}

/// Parse one token into a spec.
pub async fn parse_search_spec(
    token: &str,
    default: &DefaultBackend,
) -> Result<PackageSearchSpec, SpecError> {
    let mut query = token.to_string();

    // version constraint after the last `@`
    let mut version_constraint = None;
    if let Some(idx) = query.rfind('@') {
        let raw = query[idx + 1..].to_string();
        query.truncate(idx);
        version_constraint = Some(read_constraint(token, raw).await?);
    }

    // output selectors after the last `^`
    let mut output_selectors = None;
    if let Some(idx) = query.rfind('^') {
        let selectors: Vec<String> = query[idx + 1..]
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        query.truncate(idx);
        if !selectors.is_empty() {
            output_selectors = Some(selectors);
        }
    }

    let (query, backend) = resolve_backend(query, default);

    Ok(PackageSearchSpec {
        spec: token.to_string(),
        query,
        version_constraint,
        output_selectors,
        backend,
    })
}

/// A constraint naming an existing readable file is replaced by the file's
/// trimmed contents, so version pins can live in `.node-version`-style
/// sidecar files.
async fn read_constraint(spec: &str, raw: String) -> Result<String, SpecError> {
    match tokio::fs::metadata(&raw).await {
        Ok(meta) if meta.is_file() => {
            let contents =
                tokio::fs::read_to_string(&raw)
                    .await
                    .map_err(|source| SpecError::ConstraintFile {
                        spec: spec.to_string(),
                        path: raw.clone(),
                        source,
                    })?;
            Ok(contents.trim().to_string())
        }
        _ => Ok(raw),
    }
}

fn resolve_backend(query: String, default: &DefaultBackend) -> (String, VersionsBackend) {
    if let Some(rest) = query.strip_prefix("system:") {
        return (rest.to_string(), VersionsBackend::CurrentSystem);
    }

    if let Some(rest) = query.strip_prefix("history:") {
        return (rest.to_string(), VersionsBackend::History);
    }

    if let Some(rest) = query.strip_prefix("nixhub:") {
        return (rest.to_string(), VersionsBackend::NixHub);
    }

    // lazamar:package or lazamar:channel:package
    if let Some(rest) = query.strip_prefix("lazamar:") {
        let (channel, query) = match rest.split_once(':') {
            Some((channel, query)) => (channel.to_string(), query.to_string()),
            None => (default.lazamar_channel().to_string(), rest.to_string()),
        };
        return (query, VersionsBackend::Lazamar { channel });
    }

    if SIMPLE_ATTR.is_match(&query) || query.starts_with("bin/") || query.starts_with('~') {
        let backend = default.to_backend();
        return (query, backend);
    }

    let reference = query.clone();
    (query, VersionsBackend::FlakeInstallable { reference })
}
