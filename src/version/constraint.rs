//! Version constraint grammar and matching
//!
//! Supports the range syntax users write in pin files and on the command
//! line:
//! - `1.2.3` - exact match (partial versions are zero-padded)
//! - `^1.2.3` - compatible with version (>=1.2.3 <2.0.0)
//! - `~1.2.3` - approximately equivalent (>=1.2.3 <1.3.0)
//! - `>=1.2.3`, `>1.2.3`, `<=1.2.3`, `<1.2.3`, `=1.2.3` - comparisons
//! - `1.2.x`, `1.x`, `*` - wildcards
//! - `1.0.0 - 2.0.0` - hyphen range (inclusive)
//! - `>=1.0.0 <2.0.0` - AND, space separated
//! - `^1.0.0 || ^2.0.0` - OR
//!
//! Two special forms sit above the range grammar: the empty string (or `*`)
//! matches everything, and a constraint ending in `$` is treated as a
//! regular expression matched against the raw version string. The literal
//! substring `latest` is historical shorthand and is stripped before
//! evaluation.

use regex::Regex;
use semver::Version;

use crate::version::error::ConstraintError;
use crate::version::parse_version;

/// A parsed version constraint.
#[derive(Debug)]
pub enum Constraint {
    /// Matches every record, including unparseable versions.
    Any,
    /// Regular expression over the raw version string.
    Regex(Regex),
    /// Range expression over parsed semver values.
    Range(RangeExpr),
}

impl Constraint {
    /// Parse a constraint string.
    ///
    /// Fails with [`ConstraintError`] carrying the original string when the
    /// range syntax or the regex does not parse.
    pub fn parse(input: &str) -> Result<Self, ConstraintError> {
        let stripped = input.replace("latest", "");
        let spec = stripped.trim();

        if spec.is_empty() || spec == "*" {
            return Ok(Constraint::Any);
        }

        if spec.ends_with('$') {
            let re = Regex::new(spec).map_err(|source| ConstraintError::InvalidRegex {
                constraint: input.to_string(),
                source,
            })?;
            return Ok(Constraint::Regex(re));
        }

        RangeExpr::parse(spec)
            .map(Constraint::Range)
            .map_err(|reason| ConstraintError::InvalidRange {
                constraint: input.to_string(),
                reason,
            })
    }

    /// Check the raw version string of a record against this constraint.
    ///
    /// Range constraints never match versions that fail semver parsing;
    /// regex constraints match on the raw string regardless.
    pub fn matches(&self, raw_version: &str) -> bool {
        match self {
            Constraint::Any => true,
            Constraint::Regex(re) => re.is_match(raw_version),
            Constraint::Range(expr) => parse_version(raw_version)
                .map(|v| expr.satisfies(&v))
                .unwrap_or(false),
        }
    }
}

/// Range expression tree: OR of ANDs of single ranges.
#[derive(Debug)]
pub enum RangeExpr {
    Single(VersionRange),
    /// Space-separated ranges, all must satisfy.
    And(Vec<RangeExpr>),
    /// `||`-separated alternatives, any must satisfy.
    Or(Vec<RangeExpr>),
}

impl RangeExpr {
    fn parse(spec: &str) -> Result<Self, String> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err("empty range".to_string());
        }

        // OR has the lowest precedence
        if spec.contains("||") {
            let alternatives = spec
                .split("||")
                .map(|part| Self::parse_and_or_single(part.trim()))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(RangeExpr::Or(alternatives));
        }

        Self::parse_and_or_single(spec)
    }

    fn parse_and_or_single(spec: &str) -> Result<Self, String> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err("empty range".to_string());
        }

        // Hyphen ranges contain a space but are not AND
        if let Some(range) = VersionRange::parse_hyphen(spec) {
            return Ok(RangeExpr::Single(range));
        }

        let parts: Vec<&str> = spec.split_whitespace().collect();
        if parts.len() > 1 {
            let ranges = parts
                .into_iter()
                .map(|part| VersionRange::parse(part).map(RangeExpr::Single))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(RangeExpr::And(ranges));
        }

        VersionRange::parse(spec).map(RangeExpr::Single)
    }

    fn satisfies(&self, version: &Version) -> bool {
        match self {
            RangeExpr::Single(range) => range.satisfies(version),
            RangeExpr::And(exprs) => exprs.iter().all(|e| e.satisfies(version)),
            RangeExpr::Or(exprs) => exprs.iter().any(|e| e.satisfies(version)),
        }
    }
}

/// One comparator in a range expression.
#[derive(Debug)]
pub enum VersionRange {
    Exact(Version),
    /// `^1.2.3` means >=1.2.3 <2.0.0, with the usual 0.x special cases.
    Caret(Version),
    /// `~1.2.3` means >=1.2.3 <1.3.0; `~1` pins the major only.
    Tilde { base: Version, pin_minor: bool },
    Gte(Version),
    Gt(Version),
    Lte(Version),
    Lt(Version),
    /// `1.x` means >=1.0.0 <2.0.0.
    WildcardMajor(u64),
    /// `1.2.x` means >=1.2.0 <1.3.0.
    WildcardMinor(u64, u64),
    /// `1.0.0 - 2.0.0` means >=1.0.0 <=2.0.0.
    Hyphen { from: Version, to: Version },
}

impl VersionRange {
    fn parse(spec: &str) -> Result<Self, String> {
        let spec = spec.trim();

        let version = |rest: &str| {
            parse_version(rest.trim()).ok_or_else(|| format!("invalid version `{}`", rest.trim()))
        };

        if let Some(range) = Self::parse_hyphen(spec) {
            Ok(range)
        } else if let Some(rest) = spec.strip_prefix(">=") {
            version(rest).map(VersionRange::Gte)
        } else if let Some(rest) = spec.strip_prefix('>') {
            version(rest).map(VersionRange::Gt)
        } else if let Some(rest) = spec.strip_prefix("<=") {
            version(rest).map(VersionRange::Lte)
        } else if let Some(rest) = spec.strip_prefix('<') {
            version(rest).map(VersionRange::Lt)
        } else if let Some(rest) = spec.strip_prefix('^') {
            version(rest).map(VersionRange::Caret)
        } else if let Some(rest) = spec.strip_prefix('~') {
            let pin_minor = rest.trim().split('.').count() >= 2;
            version(rest).map(|base| VersionRange::Tilde { base, pin_minor })
        } else if let Some(rest) = spec.strip_prefix('=') {
            version(rest).map(VersionRange::Exact)
        } else if let Some(range) = Self::parse_wildcard(spec) {
            Ok(range)
        } else {
            version(spec).map(VersionRange::Exact)
        }
    }

    /// Parse a hyphen range like "1.0.0 - 2.0.0".
    fn parse_hyphen(spec: &str) -> Option<Self> {
        let parts: Vec<&str> = spec.split(" - ").collect();
        if parts.len() != 2 {
            return None;
        }
        let from = parse_version(parts[0].trim())?;
        let to = parse_version(parts[1].trim())?;
        Some(VersionRange::Hyphen { from, to })
    }

    /// Parse wildcard patterns like "1.x" or "1.2.x".
    fn parse_wildcard(spec: &str) -> Option<Self> {
        let parts: Vec<&str> = spec.split('.').collect();
        match parts.as_slice() {
            [major, x] if x.eq_ignore_ascii_case("x") => {
                major.parse::<u64>().ok().map(VersionRange::WildcardMajor)
            }
            [major, minor, x] if x.eq_ignore_ascii_case("x") => {
                let major = major.parse::<u64>().ok()?;
                let minor = minor.parse::<u64>().ok()?;
                Some(VersionRange::WildcardMinor(major, minor))
            }
            _ => None,
        }
    }

    fn satisfies(&self, version: &Version) -> bool {
        match self {
            VersionRange::Exact(v) => version == v,
            VersionRange::Caret(v) => {
                if version < v {
                    return false;
                }
                // ^1.2.3 -> >=1.2.3 <2.0.0
                // ^0.2.3 -> >=0.2.3 <0.3.0
                // ^0.0.3 -> >=0.0.3 <0.0.4
                if v.major == 0 {
                    if v.minor == 0 {
                        version.major == 0 && version.minor == 0 && version.patch == v.patch
                    } else {
                        version.major == 0 && version.minor == v.minor
                    }
                } else {
                    version.major == v.major
                }
            }
            VersionRange::Tilde { base, pin_minor } => {
                version >= base
                    && version.major == base.major
                    && (!pin_minor || version.minor == base.minor)
            }
            VersionRange::Gte(v) => version >= v,
            VersionRange::Gt(v) => version > v,
            VersionRange::Lte(v) => version <= v,
            VersionRange::Lt(v) => version < v,
            VersionRange::WildcardMajor(major) => version.major == *major,
            VersionRange::WildcardMinor(major, minor) => {
                version.major == *major && version.minor == *minor
            }
            VersionRange::Hyphen { from, to } => version >= from && version <= to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn matches(constraint: &str, version: &str) -> bool {
        Constraint::parse(constraint).unwrap().matches(version)
    }

    #[rstest]
    #[case("", "1.0.0")]
    #[case("", "not-a-version")]
    #[case("*", "0.0.1")]
    #[case("latest", "9.9.9")]
    #[case(" latest ", "junk")]
    fn any_constraint_matches_everything(#[case] constraint: &str, #[case] version: &str) {
        assert!(matches(constraint, version));
    }

    #[rstest]
    #[case(">1.0 latest", ">1.0")]
    #[case("latest ^2", "^2")]
    #[case("~1.2 latest", "~1.2")]
    fn latest_is_stripped_before_evaluation(#[case] with: &str, #[case] without: &str) {
        for version in ["0.9.0", "1.5.0", "2.1.0", "3.0.0", "nightly"] {
            assert_eq!(
                matches(with, version),
                matches(without, version),
                "constraint `{with}` vs `{without}` on {version}"
            );
        }
    }

    #[rstest]
    #[case("^1.2.3", "1.2.3", true)]
    #[case("^1.2.3", "1.9.9", true)]
    #[case("^1.2.3", "2.0.0", false)]
    #[case("^0.2.3", "0.2.9", true)]
    #[case("^0.2.3", "0.3.0", false)]
    #[case("^0.0.3", "0.0.3", true)]
    #[case("^0.0.3", "0.0.4", false)]
    #[case("~1.2.3", "1.2.9", true)]
    #[case("~1.2.3", "1.3.0", false)]
    #[case(">=1.0.0 <2.0.0", "1.5.0", true)]
    #[case(">=1.0.0 <2.0.0", "2.0.0", false)]
    #[case("^1.0.0 || ^2.0.0", "2.5.0", true)]
    #[case("^1.0.0 || ^2.0.0", "3.0.0", false)]
    #[case("27 || 29", "27.0.0", true)]
    #[case("27 || 29", "28.1.0", false)]
    #[case("1.0.0 - 2.0.0", "1.5.0", true)]
    #[case("1.0.0 - 2.0.0", "2.0.1", false)]
    #[case("1.x", "1.9.0", true)]
    #[case("1.x", "2.0.0", false)]
    #[case("1.2.x", "1.2.5", true)]
    #[case("1.2.x", "1.3.0", false)]
    #[case("=1.2.3", "1.2.3", true)]
    #[case("~25", "25.4.0", true)]
    #[case("~25", "26.0.0", false)]
    fn range_constraints_match_expected_versions(
        #[case] constraint: &str,
        #[case] version: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(matches(constraint, version), expected);
    }

    #[test]
    fn range_constraints_never_match_unparseable_versions() {
        assert!(!matches(">=0.0.0", "2024-05-01"));
    }

    #[rstest]
    #[case(r"^1\.2\..*$", "1.2.9", true)]
    #[case(r"^1\.2\..*$", "1.3.0", false)]
    #[case(r".*-rc.*$", "2.0.0-rc1", true)]
    #[case(r"^2024-.*$", "2024-05-01", true)]
    fn trailing_dollar_switches_to_regex_matching(
        #[case] constraint: &str,
        #[case] version: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(matches(constraint, version), expected);
    }

    #[test]
    fn invalid_range_reports_the_original_constraint() {
        let err = Constraint::parse(">=not.a.version").unwrap_err();
        let message = err.to_string();
        assert!(message.contains(">=not.a.version"));
    }

    #[test]
    fn invalid_regex_reports_the_original_constraint() {
        let err = Constraint::parse(r"*(unclosed$").unwrap_err();
        assert!(matches!(err, ConstraintError::InvalidRegex { .. }));
        assert!(err.to_string().contains("*(unclosed$"));
    }
}
