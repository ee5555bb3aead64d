//! Flake installable reference decomposition
//!
//! Installable references come in three shapes:
//! `flake/rev#attr`, `flake#attr` (revision defaults to `HEAD`) and the
//! pinned form `flake#attr#name#version` produced by generated tool files.

use std::sync::LazyLock;

use regex::Regex;

use crate::version::Version;

static WITH_REVISION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^#]+/)([^#]+)#([^# ]+)(#([^ #]+)#([^ #]+))?").expect("valid regex")
});

static SHORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^#/]+)#([^# ]+)(#([^ #]+)#([^ #]+))?").expect("valid regex")
});

/// True for strings that look like an installable reference rather than a
/// package attribute (`bin/` program queries excluded).
pub fn is_installable(s: &str) -> bool {
    s.contains([':', '/', '#']) && !s.starts_with("bin/")
}

/// Decompose an installable reference into a [`Version`] record.
///
/// `name` and `version` stay empty unless the reference carries the pinned
/// `#name#version` suffix; callers resolve them through the nix tool when
/// needed. A reference without any `#` selects the `default` attribute.
pub fn parse_installable(reference: &str) -> Version {
    if let Some(m) = WITH_REVISION.captures(reference) {
        return Version {
            name: m.get(5).map_or(String::new(), |g| g.as_str().to_string()),
            version: m.get(6).map_or(String::new(), |g| g.as_str().to_string()),
            attribute: m[3].to_string(),
            flake: m[1].trim_end_matches('/').to_string(),
            revision: m[2].to_string(),
        };
    }

    if let Some(m) = SHORT.captures(reference) {
        return Version {
            name: m.get(4).map_or(String::new(), |g| g.as_str().to_string()),
            version: m.get(5).map_or(String::new(), |g| g.as_str().to_string()),
            attribute: m[2].to_string(),
            flake: m[1].to_string(),
            revision: "HEAD".to_string(),
        };
    }

    Version {
        name: String::new(),
        version: String::new(),
        attribute: "default".to_string(),
        flake: reference.to_string(),
        revision: "HEAD".to_string(),
    }
}
