//! Result renderers
//!
//! Plain listings render whatever the search produced; the
//! installable/json/flake forms generate references meant to be consumed
//! by other tooling and therefore insist on exactly one selected version
//! per uniquely named package before producing anything.
//!
//! # Modules
//!
//! - [`text`]: colorized version table
//! - [`json`]: tool manifest as JSON
//! - [`installable`]: one installable reference per line
//! - [`flake`]: generated flake.nix pinning every selected version

pub mod flake;
pub mod installable;
pub mod json;
pub mod text;

pub use flake::flake;
pub use installable::installables;
pub use json::json;
pub use text::{ShowMode, text};

use serde::Serialize;

use crate::search::PackageSearchResult;

/// One selected package as it appears in generated manifests.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    pub name: String,
    pub attribute: String,
    pub version: String,
    /// Flake url with the revision pinned when one exists.
    pub flake: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<String>>,
}

impl Tool {
    /// Manifest entry for a result; `None` until a version is selected.
    pub fn from_result(result: &PackageSearchResult) -> Option<Self> {
        let selected = result.selected.as_ref()?;
        Some(Self {
            name: selected.name.clone(),
            attribute: selected.attribute.clone(),
            version: selected.version.clone(),
            flake: selected.flake_url(),
            outputs: result.spec.output_selectors.clone(),
        })
    }
}
