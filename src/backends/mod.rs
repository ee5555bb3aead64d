//! Backend adapters for the public version lookup services
//!
//! Every adapter satisfies one uniform capability: given a package
//! identifier, return a list of raw [`Version`] records, or fail with a
//! [`BackendError`] naming the backend and the query so users can tell
//! "wrong package name" apart from "service down".
//!
//! # Modules
//!
//! - [`nixhub`]: nixhub.io JSON version index
//! - [`history`]: history.nix-packages.com JSON service
//! - [`lazamar`]: lazamar.co.uk HTML version tables, channel scoped
//! - [`nixsearch`]: search.nixos.org program/attribute lookup
//! - [`nix`]: the locally installed nix binary

pub mod history;
pub mod lazamar;
pub mod nix;
pub mod nixhub;
pub mod nixsearch;

#[cfg(test)]
use mockall::automock;

use serde::Deserialize;
use thiserror::Error;

use crate::version::Version;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(
        "error fetching versions from {backend} for `{query}`: {source}\nPerhaps the package is not available under the `{query}` name.\nTry using `~{query}` as argument to search for the proper attribute name."
    )]
    Fetch {
        backend: &'static str,
        query: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(
        "no versions found on {backend} for `{query}`.\nPerhaps the package is not available on nixpkgs under the `{query}` name.\nTry using `~{query}` as argument to search for the proper attribute name."
    )]
    NoVersions {
        backend: &'static str,
        query: String,
    },

    #[error("invalid response from {backend} for `{query}`: {reason}")]
    InvalidResponse {
        backend: &'static str,
        query: String,
        reason: String,
    },

    #[error(
        "no packages found providing program `bin/{program}`.\nTry `bin/{program}*` to match on any part of the program name."
    )]
    NoProgramMatch { program: String },

    #[error("no packages found matching `{search}`")]
    NoQueryMatch { search: String },

    #[error("nix command failed for `{installable}`: {stderr}")]
    NixCommand {
        installable: String,
        stderr: String,
    },

    #[error("could not run nix for `{installable}`: {source}")]
    NixSpawn {
        installable: String,
        #[source]
        source: std::io::Error,
    },
}

/// Version search against a fixed service.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait VersionBackend: Send + Sync {
    /// Service name used in error messages.
    fn name(&self) -> &'static str;

    /// Fetch all known versions for a package attribute.
    async fn search(&self, query: &str) -> Result<Vec<Version>, BackendError>;
}

/// Version search against a channel-scoped service.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ChannelBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str, channel: &str) -> Result<Vec<Version>, BackendError>;
}

/// Program and free-text lookup of package attribute names.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ProgramIndex: Send + Sync {
    /// Attribute names of packages that install `program` into bin/.
    async fn find_packages_providing_program(
        &self,
        program: &str,
        exact: bool,
        max_results: usize,
    ) -> Result<Vec<String>, BackendError>;

    /// Attribute names of packages matching a free-text search.
    async fn find_packages_matching_query(
        &self,
        search: &str,
        max_results: usize,
    ) -> Result<Vec<String>, BackendError>;
}

/// Name and version of a package resolved through the local nix tool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResolvedPackage {
    pub name: String,
    pub version: String,
}

/// Resolution of a flake installable via the locally installed tool.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait InstallableResolver: Send + Sync {
    async fn resolve(&self, installable: &str) -> Result<ResolvedPackage, BackendError>;
}
