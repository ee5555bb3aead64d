//! Search-spec parsing
//!
//! Turns raw CLI tokens like `emacs@~25`, `bin/pwd`, `nixhub:firefox` or
//! `lazamar:nixpkgs-unstable:go@1.22` into structured
//! [`PackageSearchSpec`] values. Parsing a batch runs one task per token,
//! concurrently, with first-error-wins semantics.
//!
//! # Modules
//!
//! - [`parser`]: token -> spec algorithm and the concurrent batch parse
//! - [`installable`]: flake installable reference decomposition
//! - [`files`]: spec lines and version pins read from tool files

pub mod files;
pub mod installable;
pub mod parser;

pub use files::{FileFormat, FileReaders};
pub use parser::{DefaultBackend, parse_search_spec, parse_search_specs};

use serde::Serialize;
use thiserror::Error;

/// Which version source a spec resolves against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionsBackend {
    /// The locally installed nixpkgs, resolved through the nix tool.
    CurrentSystem,
    /// history.nix-packages.com
    History,
    /// nixhub.io
    NixHub,
    /// lazamar.co.uk, scoped to a nixpkgs channel.
    Lazamar { channel: String },
    /// A direct flake installable reference.
    FlakeInstallable { reference: String },
}

/// One parsed package search token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageSearchSpec {
    /// The raw token as given on the command line or in a file.
    pub spec: String,
    /// What remains of the token after schemes, constraint and output
    /// selectors were stripped.
    pub query: String,
    pub version_constraint: Option<String>,
    /// Build output names for the eventual installable (`pkg^out,lib`).
    pub output_selectors: Option<Vec<String>>,
    pub backend: VersionsBackend,
}

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("could not read constraint file `{path}` for `{spec}`: {source}")]
    ConstraintFile {
        spec: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read package specs from `{path}`: {source}")]
    SpecsFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid package spec: {line}")]
    InvalidLine { line: String },
}
