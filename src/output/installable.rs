//! Installable reference rendering

use crate::search::{
    PackageSearchResult, SearchError, ensure_one_selected, ensure_unique_package_names,
};

/// Render one installable reference per result, newline separated.
///
/// Requires every result to have exactly one selected version under a
/// unique package name.
pub fn installables(results: &[PackageSearchResult]) -> Result<String, SearchError> {
    ensure_one_selected(results)?;
    ensure_unique_package_names(results)?;

    let lines: Vec<String> = results
        .iter()
        .filter_map(PackageSearchResult::installable)
        .collect();
    Ok(lines.join("\n"))
}
