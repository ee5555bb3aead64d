//! Version records and the list primitives shared by every backend
//!
//! Backends produce immutable [`Version`] records; everything downstream only
//! filters and reorders them into new lists. The primitives here implement
//! the selection pipeline: [`sort_by_version`] -> [`constrain`] -> [`limit`].
//!
//! # Modules
//!
//! - [`constraint`]: version constraint grammar and matching
//! - [`error`]: constraint parse errors

pub mod constraint;
pub mod error;

pub use constraint::Constraint;
pub use error::ConstraintError;

use semver::Version as SemVersion;
use serde::{Deserialize, Serialize};

/// Revision values that mean "latest, no pin".
pub const UNPINNED_REVISIONS: [&str; 4] = ["", "HEAD", "master", "main"];

/// One package version as reported by a backend.
///
/// `attribute` is the nixpkgs attribute path used to re-query a backend.
/// `flake` and `revision` together identify a reproducible source location.
/// `version` is free-form; it is expected but not required to parse as
/// semver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "attr_path")]
    pub attribute: String,
    pub version: String,
    #[serde(default)]
    pub flake: String,
    #[serde(rename = "nixpkgs_rev")]
    pub revision: String,
}

impl Version {
    /// Flake url for this record, with the revision appended when pinned.
    pub fn flake_url(&self) -> String {
        if UNPINNED_REVISIONS.contains(&self.revision.as_str()) {
            self.flake.clone()
        } else {
            format!("{}/{}", self.flake, self.revision)
        }
    }

    /// Installable reference (`flake/rev#attribute`).
    pub fn installable(&self) -> String {
        format!("{}#{}", self.flake_url(), self.attribute)
    }
}

/// Parse a version string into semver, zero-padding partial versions.
///
/// "1" parses as 1.0.0 and "1.2" as 1.2.0, so the partial versions found in
/// pin files compare the way users expect.
pub fn parse_version(version: &str) -> Option<SemVersion> {
    let parts: Vec<&str> = version.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => version.to_string(),
    };
    SemVersion::parse(&normalized).ok()
}

/// Total order over records by version.
///
/// Records whose version string does not parse as semver sort below every
/// parseable record. Two unparseable versions fall back to byte order so
/// the comparator stays a total order.
pub fn compare_by_version(a: &Version, b: &Version) -> std::cmp::Ordering {
    match (parse_version(&a.version), parse_version(&b.version)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Greater,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (None, None) => a.version.cmp(&b.version),
    }
}

/// Sort records ascending by version. Stable.
pub fn sort_by_version(records: &mut [Version]) {
    records.sort_by(compare_by_version);
}

/// Keep only records matching `constraint`.
///
/// See [`Constraint::parse`] for the accepted syntax. Records that fail
/// semver parsing are silently excluded by range constraints but still
/// eligible for regex constraints.
pub fn constrain(records: Vec<Version>, constraint: &str) -> Result<Vec<Version>, ConstraintError> {
    let constraint = Constraint::parse(constraint)?;
    Ok(records
        .into_iter()
        .filter(|r| constraint.matches(&r.version))
        .collect())
}

/// Keep the last `n` records when `n > 0` (the highest, assuming the list is
/// sorted ascending) or the first `|n|` when `n < 0`. `n == 0` keeps
/// everything, as does any `|n|` larger than the list.
pub fn limit(mut records: Vec<Version>, n: i64) -> Vec<Version> {
    if n > 0 {
        let from = records.len().saturating_sub(n as usize);
        records.split_off(from)
    } else if n < 0 {
        records.truncate(n.unsigned_abs() as usize);
        records
    } else {
        records
    }
}

/// Keep only records whose attribute equals `attribute` (case-sensitive).
pub fn filter_exact(records: Vec<Version>, attribute: &str) -> Vec<Version> {
    records
        .into_iter()
        .filter(|r| r.attribute == attribute)
        .collect()
}
