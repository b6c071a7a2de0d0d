//! Typed data model for a parsed manifest.
//!
//! Declaration order of services, volumes, and networks is significant
//! (it breaks ties in the deployment order), so the collections are
//! vectors rather than maps. All values are fully resolved: placeholder
//! substitution happens before this model is built.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Root of a parsed manifest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    /// Optional project name declared in the document (`name:` key).
    pub name: Option<String>,
    /// Services in declaration order.
    pub services: Vec<Service>,
    /// Top-level named volume declarations in declaration order.
    pub volumes: Vec<VolumeDecl>,
    /// Top-level network declarations in declaration order.
    pub networks: Vec<NetworkDecl>,
}

impl Manifest {
    /// Looks up a service by name.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Returns true if a volume with this name is declared.
    #[must_use]
    pub fn has_volume(&self, name: &str) -> bool {
        self.volumes.iter().any(|v| v.name == name)
    }

    /// Returns true if a network with this name is declared.
    #[must_use]
    pub fn has_network(&self, name: &str) -> bool {
        self.networks.iter().any(|n| n.name == name)
    }
}

/// One deployable unit: an image reference plus its runtime configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Service {
    /// Service name (unique key under `services`).
    pub name: String,
    /// Image reference; may be absent when a build context is given.
    pub image: Option<String>,
    /// Optional build context for locally built images.
    pub build: Option<BuildSpec>,
    /// Explicit container name overriding the project-derived one.
    pub container_name: Option<String>,
    /// Command override for the image's default.
    pub command: Option<CommandSpec>,
    /// Entrypoint override for the image's default.
    pub entrypoint: Option<CommandSpec>,
    /// Environment variables, resolved at load time.
    pub environment: BTreeMap<String, String>,
    /// Volume mounts in declaration order.
    pub volumes: Vec<VolumeMount>,
    /// Published port mappings in declaration order.
    pub ports: Vec<PortMapping>,
    /// Services that must be started before this one.
    pub depends_on: Vec<Dependency>,
    /// Probe configuration interpreted by the external runtime.
    pub healthcheck: Option<HealthCheck>,
    /// Restart behavior configured on the external runtime.
    pub restart: RestartPolicy,
    /// Image pull behavior.
    pub pull_policy: Option<PullPolicy>,
    /// Allocate a pseudo-TTY.
    pub tty: bool,
    /// Additional `host:ip` entries for the container's hosts file.
    pub extra_hosts: Vec<String>,
    /// Networks to attach; empty means the project default network.
    pub networks: Vec<String>,
}

/// Build context for a locally built image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildSpec {
    /// Build context directory.
    pub context: String,
    /// Dockerfile path relative to the context.
    pub dockerfile: Option<String>,
    /// Build arguments.
    pub args: BTreeMap<String, String>,
}

/// Command override, in either of the two compose notations.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandSpec {
    /// Exec form: an argument vector passed through unchanged.
    Argv(Vec<String>),
    /// Shell form: a single string run via `/bin/sh -c`.
    Shell(String),
}

/// A top-level named volume declaration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumeDecl {
    /// Volume name (unique key under `volumes`).
    pub name: String,
    /// Volume driver; the runtime default when absent.
    pub driver: Option<String>,
    /// Declared outside this manifest; berth never creates it.
    pub external: bool,
}

/// A top-level network declaration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkDecl {
    /// Network name (unique key under `networks`).
    pub name: String,
    /// Network driver; the runtime default when absent.
    pub driver: Option<String>,
    /// Declared outside this manifest; berth never creates it.
    pub external: bool,
}

/// One volume mount of a service.
#[derive(Debug, Clone, PartialEq)]
pub enum VolumeMount {
    /// A mount of a top-level named volume.
    Named {
        /// Name of the declared volume.
        source: String,
        /// Absolute path inside the container.
        target: String,
        /// Mount read-only.
        read_only: bool,
    },
    /// A bind mount of a host path.
    Bind {
        /// Host path (absolute, `./`, `../`, or `~` prefixed).
        source: String,
        /// Absolute path inside the container.
        target: String,
        /// Mount read-only.
        read_only: bool,
    },
    /// An anonymous volume managed entirely by the runtime.
    Anonymous {
        /// Absolute path inside the container.
        target: String,
    },
}

impl VolumeMount {
    /// Returns the mount path inside the container.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Named { target, .. } | Self::Bind { target, .. } | Self::Anonymous { target } => {
                target
            }
        }
    }

    /// Returns the referenced volume name for named mounts.
    #[must_use]
    pub fn named_source(&self) -> Option<&str> {
        match self {
            Self::Named { source, .. } => Some(source),
            Self::Bind { .. } | Self::Anonymous { .. } => None,
        }
    }
}

impl fmt::Display for VolumeMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named {
                source,
                target,
                read_only,
            }
            | Self::Bind {
                source,
                target,
                read_only,
            } => {
                write!(f, "{source}:{target}")?;
                if *read_only {
                    write!(f, ":ro")?;
                }
                Ok(())
            }
            Self::Anonymous { target } => write!(f, "{target}"),
        }
    }
}

/// Transport protocol of a published port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// TCP (the default).
    #[default]
    Tcp,
    /// UDP.
    Udp,
}

impl Protocol {
    /// Returns the lowercase protocol name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

/// A published port mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    /// Host address to bind; all interfaces when absent.
    pub host_address: Option<String>,
    /// Host port; the runtime picks an ephemeral one when absent.
    pub host_port: Option<u16>,
    /// Port inside the container.
    pub container_port: u16,
    /// Transport protocol.
    pub protocol: Protocol,
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.host_address.as_deref(), self.host_port) {
            (Some(addr), Some(port)) => write!(f, "{addr}:{port}:")?,
            (Some(addr), None) => write!(f, "{addr}::")?,
            (None, Some(port)) => write!(f, "{port}:")?,
            (None, None) => {}
        }
        write!(f, "{}", self.container_port)?;
        if self.protocol != Protocol::Tcp {
            write!(f, "/{}", self.protocol.as_str())?;
        }
        Ok(())
    }
}

/// Health probe command, in either compose notation.
#[derive(Debug, Clone, PartialEq)]
pub enum HealthTest {
    /// Exec form: `["CMD", ...]`.
    Command(Vec<String>),
    /// Shell form: a string run via the container's shell.
    Shell(String),
}

/// Probe configuration passed to the external runtime.
///
/// berth parses and forwards these values; it never polls health itself.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthCheck {
    /// The probe command.
    pub test: HealthTest,
    /// Time between probes.
    pub interval: Option<Duration>,
    /// Per-probe timeout.
    pub timeout: Option<Duration>,
    /// Grace period before failures count.
    pub start_period: Option<Duration>,
    /// Consecutive failures needed to mark unhealthy.
    pub retries: Option<u32>,
}

/// Readiness condition attached to a dependency edge.
///
/// Only start ordering is enforced here; conditions are preserved for the
/// external runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Condition {
    /// Dependency has been started.
    #[default]
    Started,
    /// Dependency reports healthy.
    Healthy,
    /// Dependency ran to completion successfully.
    CompletedSuccessfully,
}

impl Condition {
    /// Returns the compose spelling of this condition.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "service_started",
            Self::Healthy => "service_healthy",
            Self::CompletedSuccessfully => "service_completed_successfully",
        }
    }

    /// Parses the compose spelling of a condition.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "service_started" => Some(Self::Started),
            "service_healthy" => Some(Self::Healthy),
            "service_completed_successfully" => Some(Self::CompletedSuccessfully),
            _ => None,
        }
    }
}

/// One dependency edge of a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Name of the depended-on service.
    pub service: String,
    /// Readiness condition (ordering-only here).
    pub condition: Condition,
}

impl Dependency {
    /// Creates a start-ordering dependency on `service`.
    #[must_use]
    pub fn on(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            condition: Condition::Started,
        }
    }
}

/// Restart behavior configured on the external runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Never restart (the default).
    #[default]
    No,
    /// Always restart.
    Always,
    /// Restart unless explicitly stopped.
    UnlessStopped,
    /// Restart only on non-zero exit.
    OnFailure,
}

impl RestartPolicy {
    /// Returns the compose spelling of this policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::No => "no",
            Self::Always => "always",
            Self::UnlessStopped => "unless-stopped",
            Self::OnFailure => "on-failure",
        }
    }

    /// Parses the compose spelling of a policy.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "no" => Some(Self::No),
            "always" => Some(Self::Always),
            "unless-stopped" => Some(Self::UnlessStopped),
            "on-failure" => Some(Self::OnFailure),
            _ => None,
        }
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Image pull behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullPolicy {
    /// Always pull before creating.
    Always,
    /// Pull only when the image is missing locally.
    Missing,
    /// Never pull.
    Never,
}

impl PullPolicy {
    /// Returns the compose spelling of this policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Missing => "missing",
            Self::Never => "never",
        }
    }

    /// Parses the compose spelling of a pull policy.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "always" => Some(Self::Always),
            "missing" => Some(Self::Missing),
            "never" => Some(Self::Never),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_mapping_display_short_forms() {
        let full = PortMapping {
            host_address: Some("127.0.0.1".into()),
            host_port: Some(3000),
            container_port: 8080,
            protocol: Protocol::Udp,
        };
        assert_eq!(full.to_string(), "127.0.0.1:3000:8080/udp");

        let plain = PortMapping {
            host_address: None,
            host_port: Some(3000),
            container_port: 8080,
            protocol: Protocol::Tcp,
        };
        assert_eq!(plain.to_string(), "3000:8080");

        let container_only = PortMapping {
            host_address: None,
            host_port: None,
            container_port: 11434,
            protocol: Protocol::Tcp,
        };
        assert_eq!(container_only.to_string(), "11434");

        let addr_no_port = PortMapping {
            host_address: Some("127.0.0.1".into()),
            host_port: None,
            container_port: 8080,
            protocol: Protocol::Tcp,
        };
        assert_eq!(addr_no_port.to_string(), "127.0.0.1::8080");
    }

    #[test]
    fn volume_mount_display_round_forms() {
        let named = VolumeMount::Named {
            source: "ollama".into(),
            target: "/root/.ollama".into(),
            read_only: false,
        };
        assert_eq!(named.to_string(), "ollama:/root/.ollama");

        let ro_bind = VolumeMount::Bind {
            source: "./conf".into(),
            target: "/etc/app".into(),
            read_only: true,
        };
        assert_eq!(ro_bind.to_string(), "./conf:/etc/app:ro");

        let anon = VolumeMount::Anonymous {
            target: "/var/cache".into(),
        };
        assert_eq!(anon.to_string(), "/var/cache");
    }

    #[test]
    fn restart_policy_spellings_round_trip() {
        for policy in [
            RestartPolicy::No,
            RestartPolicy::Always,
            RestartPolicy::UnlessStopped,
            RestartPolicy::OnFailure,
        ] {
            assert_eq!(RestartPolicy::from_str_opt(policy.as_str()), Some(policy));
        }
        assert_eq!(RestartPolicy::from_str_opt("sometimes"), None);
    }

    #[test]
    fn condition_spellings_round_trip() {
        for cond in [
            Condition::Started,
            Condition::Healthy,
            Condition::CompletedSuccessfully,
        ] {
            assert_eq!(Condition::from_str_opt(cond.as_str()), Some(cond));
        }
    }

    #[test]
    fn manifest_lookup_helpers() {
        let manifest = Manifest {
            services: vec![Service {
                name: "cache".into(),
                image: Some("redis:7-alpine".into()),
                ..Service::default()
            }],
            volumes: vec![VolumeDecl {
                name: "data".into(),
                ..VolumeDecl::default()
            }],
            ..Manifest::default()
        };
        assert!(manifest.service("cache").is_some());
        assert!(manifest.service("db").is_none());
        assert!(manifest.has_volume("data"));
        assert!(!manifest.has_network("backend"));
    }
}
