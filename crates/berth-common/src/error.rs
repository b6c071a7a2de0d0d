//! Unified error types for the berth workspace.
//!
//! The taxonomy mirrors the lifecycle of a manifest: it can be malformed,
//! it can reference things that were never declared, its dependency graph
//! can be cyclic, and the external runtime can fail to start what it
//! describes. Everything else is ambient I/O.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum BerthError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A required key is absent or a value has the wrong shape.
    #[error("malformed manifest at `{path}`: {message}")]
    MalformedManifest {
        /// Key path of the offending node (e.g. `services.web.ports[0]`).
        path: String,
        /// Description of what was expected.
        message: String,
    },

    /// A name is used but never declared in the manifest.
    #[error("unknown {kind} \"{name}\" referenced by {referenced_by}")]
    UnknownReference {
        /// Kind of the missing declaration (`service`, `volume`, `network`).
        kind: &'static str,
        /// The undeclared name.
        name: String,
        /// Where the dangling reference appears.
        referenced_by: String,
    },

    /// The dependency graph contains a cycle; no ordering exists.
    #[error("cyclic dependency: {}", cycle.join(" -> "))]
    CyclicDependency {
        /// Services on the cycle, closed (first name repeated last).
        cycle: Vec<String>,
    },

    /// The external container runtime rejected a create/start call.
    #[error("runtime failed for \"{name}\": {message}")]
    StartFailure {
        /// Container, volume, or network the runtime was acting on.
        name: String,
        /// Runtime diagnostic (typically its stderr).
        message: String,
    },

    /// Serialization of a report failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// Rendering a manifest back to YAML failed.
    #[error("YAML serialization error: {source}")]
    YamlSerialization {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, BerthError>;
