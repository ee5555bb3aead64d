//! Version table rendering

use comfy_table::{Cell, Color, Table, presets};

use crate::search::PackageSearchResult;

/// Which rows of each result the table shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShowMode {
    /// Every version the backend reported.
    All,
    /// Only versions surviving the constraint (everything when the
    /// constraint matched nothing).
    #[default]
    Constrained,
    /// Only the selected version.
    One,
}

/// Render results as a table, one row per version.
///
/// The selected version is highlighted green, other constrained versions
/// cyan. Row order follows result order; `reverse` flips the final row
/// list for newest-first reading.
pub fn text(results: &[PackageSearchResult], show: ShowMode, color: bool, reverse: bool) -> String {
    let mut rows = Vec::new();

    for result in results {
        for record in &result.versions {
            let is_selected = result.selected.as_ref() == Some(record);
            let is_constrained = result.constrained.contains(record);

            if show == ShowMode::One && !is_selected {
                continue;
            }
            if show == ShowMode::Constrained && !is_constrained && !result.constrained.is_empty() {
                continue;
            }

            let version_color = match (is_selected, is_constrained) {
                (true, _) => Some(Color::Green),
                (false, true) => Some(Color::Cyan),
                _ => None,
            };

            let version_cell = match (color, version_color) {
                (true, Some(c)) => Cell::new(&record.version).fg(c),
                _ => Cell::new(&record.version),
            };

            rows.push(vec![
                Cell::new(&record.name),
                Cell::new(&record.attribute),
                version_cell,
                Cell::new(&record.flake),
                Cell::new(&record.revision),
            ]);
        }
    }

    if reverse {
        rows.reverse();
    }

    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_header(["Name", "Attribute", "Version", "Flake", "Revision"]);
    for row in rows {
        table.add_row(row);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{PackageSearchSpec, VersionsBackend};
    use crate::version::Version;

    fn record(version: &str) -> Version {
        Version {
            name: "emacs".to_string(),
            attribute: "emacs".to_string(),
            version: version.to_string(),
            flake: "nixpkgs".to_string(),
            revision: "abc".to_string(),
        }
    }

    fn result() -> PackageSearchResult {
        let versions = vec![record("25.1"), record("25.3"), record("29.1")];
        let constrained = vec![record("25.1"), record("25.3")];
        PackageSearchResult {
            spec: PackageSearchSpec {
                spec: "emacs@~25".to_string(),
                query: "emacs".to_string(),
                version_constraint: Some("~25".to_string()),
                output_selectors: None,
                backend: VersionsBackend::NixHub,
            },
            selected: constrained.last().cloned(),
            versions,
            constrained,
        }
    }

    #[test]
    fn all_mode_lists_every_version() {
        let out = text(&[result()], ShowMode::All, false, false);
        assert!(out.contains("25.1"));
        assert!(out.contains("25.3"));
        assert!(out.contains("29.1"));
        assert!(out.contains("Revision"));
    }

    #[test]
    fn constrained_mode_hides_versions_outside_the_constraint() {
        let out = text(&[result()], ShowMode::Constrained, false, false);
        assert!(out.contains("25.3"));
        assert!(!out.contains("29.1"));
    }

    #[test]
    fn one_mode_keeps_only_the_selected_row() {
        let out = text(&[result()], ShowMode::One, false, false);
        assert!(out.contains("25.3"));
        assert!(!out.contains("25.1"));
        assert!(!out.contains("29.1"));
    }

    #[test]
    fn constrained_mode_falls_back_to_all_rows_when_nothing_matched() {
        let mut r = result();
        r.constrained.clear();
        r.selected = None;
        let out = text(&[r], ShowMode::Constrained, false, false);
        assert!(out.contains("29.1"));
    }

    #[test]
    fn reverse_flips_row_order() {
        let plain = text(&[result()], ShowMode::All, false, false);
        let reversed = text(&[result()], ShowMode::All, false, true);
        let first_plain = plain.find("25.1").unwrap();
        let first_rev = reversed.find("29.1").unwrap();
        assert!(plain.find("29.1").unwrap() > first_plain);
        assert!(reversed.find("25.1").unwrap() > first_rev);
    }
}
