//! Locally installed nix binary
//!
//! Resolves a flake installable to its package name and version by
//! evaluating the installable's derivation attributes. The binary is
//! invoked with flakes enabled regardless of the user's nix.conf.

use tokio::process::Command;

use crate::backends::{BackendError, InstallableResolver, ResolvedPackage};

const FLAKE_FLAGS: [&str; 2] = ["--extra-experimental-features", "flakes nix-command"];

/// Projects pname/version out of the package, stripping the trailing
/// `-version` nix appends to derivation names.
const NAME_VERSION_APPLY: &str = r#"p: { version = p.version; name = builtins.replaceStrings [("-" + p.version)] [""] (p.pname or p.name); }"#;

pub struct NixTool {
    bin: String,
}

impl NixTool {
    pub fn new(bin: &str) -> Self {
        Self {
            bin: bin.to_string(),
        }
    }
}

impl Default for NixTool {
    fn default() -> Self {
        Self::new("nix")
    }
}

#[async_trait::async_trait]
impl InstallableResolver for NixTool {
    async fn resolve(&self, installable: &str) -> Result<ResolvedPackage, BackendError> {
        let output = Command::new(&self.bin)
            .args(FLAKE_FLAGS)
            .args(["eval", "--json", installable, "--apply", NAME_VERSION_APPLY])
            .output()
            .await
            .map_err(|source| BackendError::NixSpawn {
                installable: installable.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(BackendError::NixCommand {
                installable: installable.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|e| BackendError::InvalidResponse {
            backend: "nix",
            query: installable.to_string(),
            reason: e.to_string(),
        })
    }
}
