//! Container runtime abstraction over external engine binaries.

pub mod cli;

use std::collections::BTreeMap;

use berth_common::config::RuntimeKind;
use berth_common::error::{BerthError, Result};
use berth_common::types::ContainerId;
use berth_manifest::model::{
    BuildSpec, CommandSpec, HealthCheck, PortMapping, PullPolicy, RestartPolicy, VolumeMount,
};

/// Everything the runtime needs to create one container.
///
/// All names are final here: volume and network references have already
/// been scoped to the project by the engine.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    /// Container name.
    pub name: String,
    /// Image reference to run.
    pub image: String,
    /// Command override.
    pub command: Option<CommandSpec>,
    /// Entrypoint override.
    pub entrypoint: Option<CommandSpec>,
    /// Environment variables.
    pub env: BTreeMap<String, String>,
    /// Volume mounts.
    pub mounts: Vec<VolumeMount>,
    /// Published ports.
    pub ports: Vec<PortMapping>,
    /// Restart policy.
    pub restart: RestartPolicy,
    /// Health probe configuration.
    pub healthcheck: Option<HealthCheck>,
    /// Image pull behavior.
    pub pull_policy: Option<PullPolicy>,
    /// Whether to allocate a pseudo-TTY.
    pub tty: bool,
    /// Extra `host:ip` entries for `/etc/hosts`.
    pub extra_hosts: Vec<String>,
    /// Networks to attach, first one at creation time.
    pub networks: Vec<String>,
    /// Labels identifying the owning project and service.
    pub labels: BTreeMap<String, String>,
}

/// External container runtime.
///
/// Implementors handle the runtime-specific details of resource and
/// container lifecycle calls; the engine stays runtime-agnostic.
pub trait ContainerRuntime: Send + Sync {
    /// Short name of the backing runtime (`docker`, `podman`).
    fn name(&self) -> &str;

    /// Returns whether the runtime is reachable right now.
    fn is_available(&self) -> bool;

    /// Creates a named network unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the network cannot be created.
    fn ensure_network(&self, name: &str, driver: Option<&str>) -> Result<()>;

    /// Removes a named network.
    ///
    /// # Errors
    ///
    /// Returns an error if the network cannot be removed.
    fn remove_network(&self, name: &str) -> Result<()>;

    /// Creates a named volume unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the volume cannot be created.
    fn ensure_volume(&self, name: &str, driver: Option<&str>) -> Result<()>;

    /// Removes a named volume.
    ///
    /// # Errors
    ///
    /// Returns an error if the volume cannot be removed.
    fn remove_volume(&self, name: &str) -> Result<()>;

    /// Builds an image from a build context and tags it.
    ///
    /// # Errors
    ///
    /// Returns an error if the build fails.
    fn build(&self, build: &BuildSpec, tag: &str) -> Result<()>;

    /// Creates a container from the given spec.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be created.
    fn create(&self, spec: &ContainerSpec) -> Result<ContainerId>;

    /// Starts a previously created container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be started.
    fn start(&self, name: &str) -> Result<()>;

    /// Stops a running container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be stopped.
    fn stop(&self, name: &str) -> Result<()>;

    /// Removes a stopped container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be removed.
    fn remove(&self, name: &str) -> Result<()>;
}

/// Picks the runtime binary to drive.
///
/// `Auto` probes `docker` first, then `podman`, and uses the first one
/// found on `PATH`.
///
/// # Errors
///
/// Returns an error if no candidate binary is installed.
pub fn detect_runtime(kind: RuntimeKind) -> Result<Box<dyn ContainerRuntime>> {
    let candidates: &[&str] = match kind {
        RuntimeKind::Auto => &["docker", "podman"],
        RuntimeKind::Docker => &["docker"],
        RuntimeKind::Podman => &["podman"],
    };
    for candidate in candidates {
        if let Ok(binary) = which::which(candidate) {
            tracing::debug!(runtime = candidate, binary = %binary.display(), "runtime selected");
            return Ok(Box::new(cli::CliRuntime::new(*candidate, binary)));
        }
    }
    Err(BerthError::StartFailure {
        name: candidates.join(", "),
        message: "no container runtime found on PATH".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_runtime_auto_yields_known_binary_or_probe_error() {
        match detect_runtime(RuntimeKind::Auto) {
            Ok(runtime) => assert!(matches!(runtime.name(), "docker" | "podman")),
            Err(e) => {
                assert!(e.to_string().contains("no container runtime"), "got: {e}");
            }
        }
    }

    #[test]
    fn container_spec_can_be_constructed() {
        let spec = ContainerSpec {
            name: "demo-redis".into(),
            image: "redis:7".into(),
            command: Some(CommandSpec::Argv(vec!["redis-server".into()])),
            entrypoint: None,
            env: BTreeMap::new(),
            mounts: vec![],
            ports: vec![],
            restart: RestartPolicy::No,
            healthcheck: None,
            pull_policy: None,
            tty: false,
            extra_hosts: vec![],
            networks: vec!["demo_default".into()],
            labels: BTreeMap::new(),
        };
        assert_eq!(spec.name, "demo-redis");
        assert_eq!(spec.networks, ["demo_default"]);
    }
}
