//! Compile-time defaults

/// Channel assumed for lazamar searches when the caller names none.
pub const DEFAULT_LAZAMAR_CHANNEL: &str = "nixpkgs-unstable";

/// Result cap for program and free-text package lookups.
pub const DEFAULT_FIND_LIMIT: usize = 10;
