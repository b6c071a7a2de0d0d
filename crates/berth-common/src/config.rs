//! Runtime configuration model assembled at the CLI boundary.
//!
//! Everything ambient (working directory, flags, the choice of runtime
//! binary) is captured once into this struct and passed down explicitly;
//! the lower layers never consult the process environment themselves.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which external container runtime to invoke.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuntimeKind {
    /// Probe `docker`, then `podman`, and use the first found.
    #[default]
    Auto,
    /// Require the `docker` binary.
    Docker,
    /// Require the `podman` binary.
    Podman,
}

/// Root configuration for one berth invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BerthConfig {
    /// Manifest path; `None` means discover in the working directory.
    pub manifest_path: Option<PathBuf>,
    /// Project name override; `None` derives it from the manifest path.
    pub project: Option<String>,
    /// Which external runtime binary to use.
    pub runtime: RuntimeKind,
}

impl BerthConfig {
    /// Resolves the manifest path, discovering one next to `cwd` if unset.
    ///
    /// # Errors
    ///
    /// Returns an error if no manifest candidate exists.
    pub fn resolve_manifest(&self, cwd: &std::path::Path) -> crate::error::Result<PathBuf> {
        if let Some(ref path) = self.manifest_path {
            return Ok(path.clone());
        }
        crate::constants::discover_manifest(cwd).ok_or_else(|| {
            crate::error::BerthError::Io {
                path: cwd.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!(
                        "no manifest found (tried {})",
                        crate::constants::MANIFEST_CANDIDATES.join(", ")
                    ),
                ),
            }
        })
    }

    /// Resolves the project name: the explicit override wins, then the
    /// manifest's own `name` key, then the manifest's directory name.
    #[must_use]
    pub fn resolve_project(
        &self,
        manifest_name: Option<&str>,
        manifest_path: &std::path::Path,
    ) -> String {
        if let Some(ref name) = self.project {
            crate::constants::sanitize_name(name)
        } else if let Some(name) = manifest_name {
            crate::constants::sanitize_name(name)
        } else {
            crate::constants::project_name_for(manifest_path)
        }
    }
}
