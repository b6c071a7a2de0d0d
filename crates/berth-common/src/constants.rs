//! System-wide constants and manifest discovery helpers.

use std::path::{Path, PathBuf};

/// Application name used in CLI output and derived resource names.
pub const APP_NAME: &str = "berth";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "berth";

/// Manifest file names probed, in order, when no `--file` is given.
pub const MANIFEST_CANDIDATES: &[&str] = &[
    "berth.yaml",
    "berth.yml",
    "compose.yaml",
    "compose.yml",
    "docker-compose.yaml",
    "docker-compose.yml",
];

/// Name of the optional variables file loaded beside the manifest.
pub const DOTENV_FILE: &str = ".env";

/// Suffix appended to the project name to form the stack network.
pub const DEFAULT_NETWORK_SUFFIX: &str = "default";

/// Searches `dir` for the first manifest candidate that exists.
#[must_use]
pub fn discover_manifest(dir: &Path) -> Option<PathBuf> {
    MANIFEST_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Derives a project name from the manifest path.
///
/// Uses the parent directory name, falling back to the file stem and
/// finally to [`APP_NAME`]. Non-alphanumeric characters are folded to `-`
/// so the name is safe in container and network names.
#[must_use]
pub fn project_name_for(manifest_path: &Path) -> String {
    let raw = manifest_path
        .parent()
        .and_then(Path::file_name)
        .or_else(|| manifest_path.file_stem())
        .map_or_else(|| APP_NAME.to_string(), |s| s.to_string_lossy().into_owned());
    sanitize_name(&raw)
}

/// Returns the name of the project's default network.
#[must_use]
pub fn default_network(project: &str) -> String {
    format!("{project}_{DEFAULT_NETWORK_SUFFIX}")
}

/// Returns the container name for a service under a project.
///
/// Matches the external runtime's compose convention of prefixing the
/// project so stacks do not collide.
#[must_use]
pub fn container_name(project: &str, service: &str) -> String {
    format!("{project}-{service}")
}

/// Folds a raw name into one safe for container and network names.
#[must_use]
pub fn sanitize_name(raw: &str) -> String {
    let folded: String = raw
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = folded.trim_matches('-');
    if trimmed.is_empty() {
        APP_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}
