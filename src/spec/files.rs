//! Spec lines and version pins read from tool files
//!
//! Two file shapes exist in the wild: pin files holding one trimmed
//! constraint (`.node-version`, `.java-version`, ...) and tools files
//! holding one spec per line with `#` comments (`.nix-tools`,
//! `.tool-versions`). Which base-name maps to which shape is explicit
//! configuration ([`FileReaders`]) so tests can substitute their own.

use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::spec::SpecError;

static SPEC_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^ ]+[^#]+)").expect("valid regex"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// One trimmed constraint, nothing else.
    Pin,
    /// One spec token per line; blank lines and `#` comments ignored.
    Tools,
}

/// File base-name to format mapping.
#[derive(Debug, Clone)]
pub struct FileReaders {
    formats: HashMap<String, FileFormat>,
}

impl Default for FileReaders {
    fn default() -> Self {
        let mut formats = HashMap::new();
        for name in [".node-version", ".java-version", ".ruby-version"] {
            formats.insert(name.to_string(), FileFormat::Pin);
        }
        for name in [".nix-tools", ".tool-versions"] {
            formats.insert(name.to_string(), FileFormat::Tools);
        }
        Self { formats }
    }
}

impl FileReaders {
    pub fn empty() -> Self {
        Self {
            formats: HashMap::new(),
        }
    }

    pub fn with_format(mut self, file_name: &str, format: FileFormat) -> Self {
        self.formats.insert(file_name.to_string(), format);
        self
    }

    pub fn format_of(&self, path: &str) -> Option<FileFormat> {
        let base = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())?;
        self.formats.get(&base).copied()
    }
}

/// Read spec tokens from a tools file; `-` reads stdin.
pub fn read_specs(path: &str) -> Result<Vec<String>, SpecError> {
    let wrap = |source| SpecError::SpecsFile {
        path: path.to_string(),
        source,
    };
    if path == "-" {
        return read_spec_lines(BufReader::new(std::io::stdin()), path);
    }
    let file = std::fs::File::open(path).map_err(wrap)?;
    read_spec_lines(BufReader::new(file), path)
}

fn read_spec_lines(reader: impl BufRead, path: &str) -> Result<Vec<String>, SpecError> {
    let mut specs = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|source| SpecError::SpecsFile {
            path: path.to_string(),
            source,
        })?;
        if let Some(spec) = spec_from_line(&line)? {
            specs.push(spec);
        }
    }
    Ok(specs)
}

/// Extract the spec token from one tools-file line.
///
/// Trailing comments are dropped and asdf-style `name<ws>constraint`
/// shorthand normalizes to `name@constraint` (the first whitespace run
/// becomes `@`). Returns `None` for blank and comment lines.
pub fn spec_from_line(line: &str) -> Result<Option<String>, SpecError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(found) = SPEC_LINE.find(line) else {
        return Err(SpecError::InvalidLine {
            line: line.to_string(),
        });
    };

    let mut spec = found.as_str().trim().to_string();
    if spec.starts_with('#') {
        return Ok(None);
    }

    if !spec.contains('@')
        && let Some(range) = WHITESPACE_RUN.find(&spec).map(|m| m.range())
    {
        spec.replace_range(range, "@");
    }

    Ok(Some(spec))
}

/// Expand one CLI token that points at a tools file (`@.nix-tools` style)
/// into the specs it contains; every other token passes through unchanged.
pub fn expand_token(token: &str, readers: &FileReaders) -> Result<Vec<String>, SpecError> {
    if let Some(path) = token.strip_prefix('@')
        && readers.format_of(path) == Some(FileFormat::Tools)
        && Path::new(path).is_file()
    {
        return read_specs(path);
    }
    Ok(vec![token.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn line(s: &str) -> Option<String> {
        spec_from_line(s).unwrap()
    }

    #[test]
    fn blank_and_comment_lines_yield_nothing() {
        assert_eq!(line(""), None);
        assert_eq!(line("   "), None);
        assert_eq!(line("# comment"), None);
    }

    #[test]
    fn simple_spec_drops_trailing_comment() {
        assert_eq!(line("foo # comment").as_deref(), Some("foo"));
    }

    #[test]
    fn constraint_spaces_survive_when_at_sign_present() {
        assert_eq!(
            line("  emacs@ >27 || <29 # comment").as_deref(),
            Some("emacs@ >27 || <29")
        );
    }

    #[test]
    fn asdf_shorthand_replaces_first_whitespace_run_with_at() {
        assert_eq!(line("emacs 27 || 29").as_deref(), Some("emacs@27 || 29"));
        assert_eq!(
            line("emacs  \t \t  27 || 29").as_deref(),
            Some("emacs@27 || 29")
        );
    }

    #[test]
    fn installable_specs_normalize_too() {
        assert_eq!(
            line("foo#bar^out,lib 25 #comment").as_deref(),
            Some("foo#bar^out,lib@25")
        );
    }

    #[test]
    fn read_specs_collects_lines_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".nix-tools");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "# tools").unwrap();
        writeln!(file, "emacs 29").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "nixhub:go@1.22").unwrap();

        let specs = read_specs(path.to_str().unwrap()).unwrap();
        assert_eq!(specs, vec!["emacs@29", "nixhub:go@1.22"]);
    }

    #[test]
    fn read_specs_reports_missing_file() {
        let err = read_specs("/does/not/exist/.nix-tools").unwrap_err();
        assert!(matches!(err, SpecError::SpecsFile { .. }));
    }

    #[test]
    fn expand_token_reads_tools_files_and_passes_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".tool-versions");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "nodejs 20.11.1").unwrap();

        let readers = FileReaders::default();
        let token = format!("@{}", path.display());
        assert_eq!(
            expand_token(&token, &readers).unwrap(),
            vec!["nodejs@20.11.1"]
        );
        assert_eq!(expand_token("emacs@29", &readers).unwrap(), vec!["emacs@29"]);
    }

    #[test]
    fn file_readers_map_is_caller_configurable() {
        let readers = FileReaders::empty().with_format(".my-tools", FileFormat::Tools);
        assert_eq!(readers.format_of("a/b/.my-tools"), Some(FileFormat::Tools));
        assert_eq!(readers.format_of(".nix-tools"), None);
    }
}
