//! Generated flake source
//!
//! Produces a flake.nix that adds one input per selected package, pinned
//! to the revision its version was found at, and embeds the tool manifest
//! as JSON for the flake module to consume.

use std::fmt::Write;

use indexmap::IndexMap;

use crate::output::Tool;
use crate::search::{
    PackageSearchResult, SearchError, ensure_one_selected, ensure_unique_package_names,
};

/// Render a flake.nix pinning every selected version.
///
/// Requires every result to have exactly one selected version under a
/// unique package name.
pub fn flake(results: &[PackageSearchResult]) -> Result<String, SearchError> {
    ensure_one_selected(results)?;
    ensure_unique_package_names(results)?;

    let tools: Vec<Tool> = results.iter().filter_map(Tool::from_result).collect();

    let mut manifest: IndexMap<&str, &Tool> = IndexMap::new();
    for tool in &tools {
        manifest.insert(&tool.name, tool);
    }
    let manifest_json = serde_json::to_string_pretty(&manifest)?;

    let mut out = String::new();
    out.push_str("{\n");
    out.push_str("  inputs.nix-versions.url = \"github:vic/nix-versions\";\n");
    out.push_str("  inputs.nix-versions.inputs.nixpkgs.follows = \"nixpkgs\";\n");
    for tool in &tools {
        writeln!(out, "  inputs.\"{}\".url = \"{}\";", tool.name, tool.flake)
            .expect("write to string");
    }
    out.push_str("  outputs = inputs@{nixpkgs, self, ...}: inputs.nix-versions.lib.mkFlake {\n");
    out.push_str("    inherit inputs;\n");
    out.push_str("    flakeModule = ./flakeModule.nix;\n");
    writeln!(out, "    nix-versions = builtins.fromJSON ''{}'';", manifest_json)
        .expect("write to string");
    out.push_str("  };\n");
    out.push_str("}\n");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{PackageSearchSpec, VersionsBackend};
    use crate::version::Version;

    fn result(name: &str, version: &str, revision: &str) -> PackageSearchResult {
        let record = Version {
            name: name.to_string(),
            attribute: name.to_string(),
            version: version.to_string(),
            flake: "nixpkgs".to_string(),
            revision: revision.to_string(),
        };
        PackageSearchResult {
            spec: PackageSearchSpec {
                spec: name.to_string(),
                query: name.to_string(),
                version_constraint: None,
                output_selectors: None,
                backend: VersionsBackend::NixHub,
            },
            versions: vec![record.clone()],
            constrained: vec![record.clone()],
            selected: Some(record),
        }
    }

    #[test]
    fn pins_each_tool_as_a_flake_input() {
        let out = flake(&[result("go", "1.22.1", "abc123")]).unwrap();
        assert!(out.contains("inputs.\"go\".url = \"nixpkgs/abc123\";"));
        assert!(out.contains("builtins.fromJSON"));
        assert!(out.contains("\"version\": \"1.22.1\""));
    }

    #[test]
    fn unpinned_revisions_reference_the_bare_flake() {
        let out = flake(&[result("go", "1.22.1", "HEAD")]).unwrap();
        assert!(out.contains("inputs.\"go\".url = \"nixpkgs\";"));
    }

    #[test]
    fn refuses_duplicate_package_names() {
        let err = flake(&[
            result("go", "1.21.0", "aaa"),
            result("go", "1.22.1", "bbb"),
        ])
        .unwrap_err();
        assert!(matches!(err, SearchError::DuplicatePackageNames { .. }));
    }
}
