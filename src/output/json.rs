//! Tool manifest rendered as JSON

use crate::output::Tool;
use crate::search::{
    PackageSearchResult, SearchError, ensure_one_selected, ensure_unique_package_names,
};

/// Render the selected versions as a JSON tool manifest.
///
/// Requires every result to have exactly one selected version under a
/// unique package name.
pub fn json(results: &[PackageSearchResult]) -> Result<String, SearchError> {
    ensure_one_selected(results)?;
    ensure_unique_package_names(results)?;

    let tools: Vec<Tool> = results.iter().filter_map(Tool::from_result).collect();
    Ok(serde_json::to_string_pretty(&tools)?)
}
