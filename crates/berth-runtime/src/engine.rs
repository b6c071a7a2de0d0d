//! Deployment engine that walks a manifest in dependency order.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use berth_common::constants;
use berth_common::error::Result;
use berth_common::types::{ContainerId, ServiceState};
use berth_manifest::graph::DependencyGraph;
use berth_manifest::model::{Manifest, Service, VolumeMount};

use crate::invoker::{ContainerRuntime, ContainerSpec};

/// Outcome of one service during an engine walk.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceReport {
    /// Service name from the manifest.
    pub name: String,
    /// Container name the runtime knows it by.
    pub container: String,
    /// Runtime-assigned container ID, when creation succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ContainerId>,
    /// Final state.
    pub state: ServiceState,
    /// Failure or skip explanation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// RFC 3339 timestamp of a successful start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
}

/// Result of an `up` walk across the whole manifest.
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    /// Project the services were scoped under.
    pub project: String,
    /// Per-service outcomes, in start order.
    pub services: Vec<ServiceReport>,
}

impl DeployReport {
    /// Returns whether every service started.
    #[must_use]
    pub fn all_started(&self) -> bool {
        self.services
            .iter()
            .all(|s| s.state == ServiceState::Started)
    }

    /// Returns the services that did not start.
    #[must_use]
    pub fn failures(&self) -> Vec<&ServiceReport> {
        self.services
            .iter()
            .filter(|s| s.state != ServiceState::Started)
            .collect()
    }
}

/// Drives an external container runtime from a parsed manifest.
///
/// The engine owns name scoping (containers, volumes, networks carry the
/// project prefix) and the start walk; everything container-shaped goes
/// through the [`ContainerRuntime`] seam.
pub struct Engine {
    runtime: Box<dyn ContainerRuntime>,
    project: String,
}

impl Engine {
    /// Creates an engine deploying under the given project name.
    #[must_use]
    pub fn new(runtime: Box<dyn ContainerRuntime>, project: impl Into<String>) -> Self {
        Self {
            runtime,
            project: project.into(),
        }
    }

    /// Returns the project name.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Returns the name of the backing runtime.
    #[must_use]
    pub fn runtime_name(&self) -> &str {
        self.runtime.name()
    }

    /// Returns whether the backing runtime is reachable.
    #[must_use]
    pub fn runtime_available(&self) -> bool {
        self.runtime.is_available()
    }

    /// Final container name for a service.
    #[must_use]
    pub fn container_name(&self, service: &Service) -> String {
        service
            .container_name
            .clone()
            .unwrap_or_else(|| constants::container_name(&self.project, &service.name))
    }

    /// Starts every service of the manifest in dependency order.
    ///
    /// Networks and volumes are ensured first; a failure there aborts the
    /// walk. Service failures do not: the failing service is recorded,
    /// its dependents are skipped with a message naming the blocker, and
    /// services that do not depend on it still start.
    ///
    /// # Errors
    ///
    /// Returns an error if ordering fails or a shared network or volume
    /// cannot be ensured. Per-service failures are reported, not returned.
    pub fn up(&self, manifest: &Manifest) -> Result<DeployReport> {
        let order = DependencyGraph::from_manifest(manifest)?.resolve_order()?;
        info!(project = %self.project, ?order, "start order resolved");

        self.ensure_shared_resources(manifest)?;

        let mut blocked: HashSet<&str> = HashSet::new();
        let mut services = Vec::with_capacity(order.len());
        for name in &order {
            let Some(service) = manifest.service(name) else {
                continue;
            };
            let container = self.container_name(service);

            if let Some(blocker) = service
                .depends_on
                .iter()
                .find(|dep| blocked.contains(dep.service.as_str()))
            {
                warn!(
                    service = name.as_str(),
                    dependency = blocker.service.as_str(),
                    "skipping service, dependency did not start"
                );
                let _ = blocked.insert(name.as_str());
                services.push(ServiceReport {
                    name: name.clone(),
                    container,
                    id: None,
                    state: ServiceState::Skipped,
                    message: Some(format!("dependency \"{}\" did not start", blocker.service)),
                    started_at: None,
                });
                continue;
            }

            match self.start_service(manifest, service, &container) {
                Ok(id) => {
                    info!(
                        service = name.as_str(),
                        container = container.as_str(),
                        id = %id,
                        "service started"
                    );
                    services.push(ServiceReport {
                        name: name.clone(),
                        container,
                        id: Some(id),
                        state: ServiceState::Started,
                        message: None,
                        started_at: Some(Utc::now().to_rfc3339()),
                    });
                }
                Err(e) => {
                    warn!(service = name.as_str(), error = %e, "service failed to start");
                    let _ = blocked.insert(name.as_str());
                    services.push(ServiceReport {
                        name: name.clone(),
                        container,
                        id: None,
                        state: ServiceState::Failed,
                        message: Some(e.to_string()),
                        started_at: None,
                    });
                }
            }
        }

        Ok(DeployReport {
            project: self.project.clone(),
            services,
        })
    }

    /// Stops and removes the project's containers in reverse start order.
    ///
    /// Stop and remove failures are logged and skipped so `down` stays
    /// idempotent on a partially started stack. Project networks are
    /// removed after the containers; named volumes only when
    /// `remove_volumes` is set. External resources are never removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the dependency order cannot be resolved.
    pub fn down(&self, manifest: &Manifest, remove_volumes: bool) -> Result<Vec<ServiceReport>> {
        let mut order = DependencyGraph::from_manifest(manifest)?.resolve_order()?;
        order.reverse();

        let mut removed = Vec::new();
        for name in &order {
            let Some(service) = manifest.service(name) else {
                continue;
            };
            let container = self.container_name(service);
            if let Err(e) = self.runtime.stop(&container) {
                debug!(container = container.as_str(), error = %e, "stop skipped");
            }
            match self.runtime.remove(&container) {
                Ok(()) => {
                    info!(container = container.as_str(), "container removed");
                    removed.push(ServiceReport {
                        name: name.clone(),
                        container,
                        id: None,
                        state: ServiceState::Removed,
                        message: None,
                        started_at: None,
                    });
                }
                Err(e) => {
                    debug!(container = container.as_str(), error = %e, "remove skipped");
                }
            }
        }

        for network in &manifest.networks {
            if network.external {
                continue;
            }
            let name = self.scoped(&network.name);
            if let Err(e) = self.runtime.remove_network(&name) {
                debug!(network = name.as_str(), error = %e, "network remove skipped");
            }
        }
        if uses_default_network(manifest) {
            let name = constants::default_network(&self.project);
            if let Err(e) = self.runtime.remove_network(&name) {
                debug!(network = name.as_str(), error = %e, "network remove skipped");
            }
        }

        if remove_volumes {
            for volume in &manifest.volumes {
                if volume.external {
                    continue;
                }
                let name = self.scoped(&volume.name);
                if let Err(e) = self.runtime.remove_volume(&name) {
                    debug!(volume = name.as_str(), error = %e, "volume remove skipped");
                }
            }
        }

        Ok(removed)
    }

    /// Creates the project's networks and named volumes before any container.
    fn ensure_shared_resources(&self, manifest: &Manifest) -> Result<()> {
        if uses_default_network(manifest) {
            self.runtime
                .ensure_network(&constants::default_network(&self.project), None)?;
        }
        for network in &manifest.networks {
            if !network.external {
                self.runtime
                    .ensure_network(&self.scoped(&network.name), network.driver.as_deref())?;
            }
        }
        for volume in &manifest.volumes {
            if !volume.external {
                self.runtime
                    .ensure_volume(&self.scoped(&volume.name), volume.driver.as_deref())?;
            }
        }
        Ok(())
    }

    fn start_service(
        &self,
        manifest: &Manifest,
        service: &Service,
        container: &str,
    ) -> Result<ContainerId> {
        let image = self.resolve_image(service)?;
        let spec = self.container_spec(manifest, service, container, image);
        let id = self.runtime.create(&spec)?;
        self.runtime.start(&spec.name)?;
        Ok(id)
    }

    /// Returns the image to run, building one when only `build` is given.
    fn resolve_image(&self, service: &Service) -> Result<String> {
        if let Some(ref image) = service.image {
            return Ok(image.clone());
        }
        let Some(ref build) = service.build else {
            // Parse-time validation rejects this; the engine refuses too.
            return Err(berth_common::error::BerthError::StartFailure {
                name: service.name.clone(),
                message: "service has neither image nor build".into(),
            });
        };
        let tag = constants::container_name(&self.project, &service.name);
        info!(
            service = service.name.as_str(),
            context = build.context.as_str(),
            tag = tag.as_str(),
            "building image"
        );
        self.runtime.build(build, &tag)?;
        Ok(tag)
    }

    /// Assembles the runtime spec for one service, with all names scoped.
    fn container_spec(
        &self,
        manifest: &Manifest,
        service: &Service,
        container: &str,
        image: String,
    ) -> ContainerSpec {
        let mounts = service
            .volumes
            .iter()
            .map(|mount| match mount {
                VolumeMount::Named {
                    source,
                    target,
                    read_only,
                } if !is_external_volume(manifest, source) => VolumeMount::Named {
                    source: self.scoped(source),
                    target: target.clone(),
                    read_only: *read_only,
                },
                other => other.clone(),
            })
            .collect();

        let networks = if service.networks.is_empty() {
            vec![constants::default_network(&self.project)]
        } else {
            service
                .networks
                .iter()
                .map(|name| {
                    if is_external_network(manifest, name) {
                        name.clone()
                    } else {
                        self.scoped(name)
                    }
                })
                .collect()
        };

        let mut labels = BTreeMap::new();
        let _ = labels.insert("sh.berth.project".to_string(), self.project.clone());
        let _ = labels.insert("sh.berth.service".to_string(), service.name.clone());

        ContainerSpec {
            name: container.to_string(),
            image,
            command: service.command.clone(),
            entrypoint: service.entrypoint.clone(),
            env: service.environment.clone(),
            mounts,
            ports: service.ports.clone(),
            restart: service.restart,
            healthcheck: service.healthcheck.clone(),
            pull_policy: service.pull_policy,
            tty: service.tty,
            extra_hosts: service.extra_hosts.clone(),
            networks,
            labels,
        }
    }

    /// Project-scoped name for a declared volume or network.
    fn scoped(&self, resource: &str) -> String {
        format!("{}_{resource}", self.project)
    }
}

/// Returns whether any service lands on the project's default network.
fn uses_default_network(manifest: &Manifest) -> bool {
    manifest.services.iter().any(|s| s.networks.is_empty())
}

fn is_external_volume(manifest: &Manifest, name: &str) -> bool {
    manifest
        .volumes
        .iter()
        .find(|v| v.name == name)
        .is_some_and(|v| v.external)
}

fn is_external_network(manifest: &Manifest, name: &str) -> bool {
    manifest
        .networks
        .iter()
        .find(|n| n.name == name)
        .is_some_and(|n| n.external)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use berth_common::error::BerthError;
    use berth_manifest::model::{BuildSpec, Dependency, NetworkDecl, VolumeDecl};

    use super::*;

    /// Records every runtime call; injected entries fail when reached.
    struct RecordingRuntime {
        events: Mutex<Vec<String>>,
        failures: HashSet<String>,
    }

    impl RecordingRuntime {
        fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
                failures: HashSet::new(),
            }
        }

        fn failing(entries: &[&str]) -> Self {
            Self {
                failures: entries.iter().map(|s| (*s).to_string()).collect(),
                ..Self::new()
            }
        }

        fn log(&self, event: String) -> Result<()> {
            self.events.lock().expect("event lock").push(event.clone());
            if self.failures.contains(&event) {
                return Err(BerthError::StartFailure {
                    name: event,
                    message: "injected failure".into(),
                });
            }
            Ok(())
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().expect("event lock").clone()
        }
    }

    impl ContainerRuntime for Arc<RecordingRuntime> {
        fn name(&self) -> &str {
            "recording"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn ensure_network(&self, name: &str, _driver: Option<&str>) -> Result<()> {
            self.log(format!("network {name}"))
        }

        fn remove_network(&self, name: &str) -> Result<()> {
            self.log(format!("rm-network {name}"))
        }

        fn ensure_volume(&self, name: &str, _driver: Option<&str>) -> Result<()> {
            self.log(format!("volume {name}"))
        }

        fn remove_volume(&self, name: &str) -> Result<()> {
            self.log(format!("rm-volume {name}"))
        }

        fn build(&self, build: &BuildSpec, tag: &str) -> Result<()> {
            self.log(format!("build {} {tag}", build.context))
        }

        fn create(&self, spec: &ContainerSpec) -> Result<ContainerId> {
            self.log(format!("create {}", spec.name))?;
            Ok(ContainerId::new(format!("id-{}", spec.name)))
        }

        fn start(&self, name: &str) -> Result<()> {
            self.log(format!("start {name}"))
        }

        fn stop(&self, name: &str) -> Result<()> {
            self.log(format!("stop {name}"))
        }

        fn remove(&self, name: &str) -> Result<()> {
            self.log(format!("rm {name}"))
        }
    }

    fn service(name: &str, deps: &[&str]) -> Service {
        Service {
            name: name.into(),
            image: Some(format!("{name}:latest")),
            depends_on: deps.iter().map(|d| Dependency::on(*d)).collect(),
            ..Service::default()
        }
    }

    /// Engine over a recorder the test keeps a handle on.
    fn recording_engine(runtime: RecordingRuntime) -> (Engine, Arc<RecordingRuntime>) {
        let shared = Arc::new(runtime);
        (Engine::new(Box::new(shared.clone()), "demo"), shared)
    }

    #[test]
    fn up_walks_in_dependency_order() {
        let manifest = Manifest {
            services: vec![
                service("web", &["db"]),
                service("db", &[]),
                service("cache", &[]),
            ],
            ..Manifest::default()
        };
        let (engine, runtime) = recording_engine(RecordingRuntime::new());

        let report = engine.up(&manifest).expect("up should succeed");
        assert!(report.all_started());
        assert_eq!(
            runtime.events(),
            [
                "network demo_default",
                "create demo-db",
                "start demo-db",
                "create demo-web",
                "start demo-web",
                "create demo-cache",
                "start demo-cache",
            ]
        );
    }

    #[test]
    fn failed_service_skips_dependents_but_not_independents() {
        let manifest = Manifest {
            services: vec![
                service("db", &[]),
                service("web", &["db"]),
                service("cache", &[]),
            ],
            ..Manifest::default()
        };
        let (engine, runtime) = recording_engine(RecordingRuntime::failing(&["start demo-db"]));

        let report = engine.up(&manifest).expect("up should still succeed");
        let states: Vec<_> = report
            .services
            .iter()
            .map(|s| (s.name.as_str(), s.state))
            .collect();
        assert_eq!(
            states,
            [
                ("db", ServiceState::Failed),
                ("web", ServiceState::Skipped),
                ("cache", ServiceState::Started),
            ]
        );
        assert!(!runtime.events().contains(&"create demo-web".to_string()));
    }

    #[test]
    fn skip_cascades_through_the_chain() {
        let manifest = Manifest {
            services: vec![
                service("a", &[]),
                service("b", &["a"]),
                service("c", &["b"]),
            ],
            ..Manifest::default()
        };
        let (engine, _) = recording_engine(RecordingRuntime::failing(&["create demo-a"]));

        let report = engine.up(&manifest).expect("up should still succeed");
        assert_eq!(report.services[1].state, ServiceState::Skipped);
        assert_eq!(report.services[2].state, ServiceState::Skipped);
        assert_eq!(
            report.services[2].message.as_deref(),
            Some("dependency \"b\" did not start")
        );
    }

    #[test]
    fn failure_message_is_kept_in_the_report() {
        let manifest = Manifest {
            services: vec![service("db", &[])],
            ..Manifest::default()
        };
        let (engine, _) = recording_engine(RecordingRuntime::failing(&["start demo-db"]));

        let report = engine.up(&manifest).expect("up should still succeed");
        let message = report.services[0].message.as_deref().expect("message");
        assert!(message.contains("injected failure"), "got: {message}");
        assert_eq!(report.failures().len(), 1);
    }

    #[test]
    fn volume_failure_aborts_the_walk() {
        let manifest = Manifest {
            services: vec![service("db", &[])],
            volumes: vec![VolumeDecl {
                name: "data".into(),
                ..VolumeDecl::default()
            }],
            ..Manifest::default()
        };
        let (engine, runtime) = recording_engine(RecordingRuntime::failing(&["volume demo_data"]));

        assert!(engine.up(&manifest).is_err());
        assert!(!runtime.events().contains(&"create demo-db".to_string()));
    }

    #[test]
    fn named_mounts_and_networks_are_project_scoped() {
        let mut web = service("web", &[]);
        web.volumes.push(VolumeMount::Named {
            source: "data".into(),
            target: "/data".into(),
            read_only: false,
        });
        web.networks.push("backend".into());
        let manifest = Manifest {
            services: vec![web],
            volumes: vec![VolumeDecl {
                name: "data".into(),
                ..VolumeDecl::default()
            }],
            networks: vec![NetworkDecl {
                name: "backend".into(),
                ..NetworkDecl::default()
            }],
            ..Manifest::default()
        };
        let (engine, _) = recording_engine(RecordingRuntime::new());

        let spec = engine.container_spec(
            &manifest,
            &manifest.services[0],
            "demo-web",
            "web:latest".into(),
        );
        assert_eq!(
            spec.mounts[0],
            VolumeMount::Named {
                source: "demo_data".into(),
                target: "/data".into(),
                read_only: false,
            }
        );
        assert_eq!(spec.networks, ["demo_backend"]);
        assert_eq!(spec.labels.get("sh.berth.project").map(String::as_str), Some("demo"));
    }

    #[test]
    fn external_resources_keep_their_raw_names() {
        let mut web = service("web", &[]);
        web.volumes.push(VolumeMount::Named {
            source: "shared".into(),
            target: "/shared".into(),
            read_only: true,
        });
        web.networks.push("corp".into());
        let manifest = Manifest {
            services: vec![web],
            volumes: vec![VolumeDecl {
                name: "shared".into(),
                external: true,
                ..VolumeDecl::default()
            }],
            networks: vec![NetworkDecl {
                name: "corp".into(),
                external: true,
                ..NetworkDecl::default()
            }],
            ..Manifest::default()
        };
        let (engine, runtime) = recording_engine(RecordingRuntime::new());

        let report = engine.up(&manifest).expect("up should succeed");
        assert!(report.all_started());
        // External resources are never created.
        assert!(
            !runtime.events().iter().any(|e| e.starts_with("volume")),
            "got: {:?}",
            runtime.events()
        );
        let spec = engine.container_spec(
            &manifest,
            &manifest.services[0],
            "demo-web",
            "web:latest".into(),
        );
        assert_eq!(spec.networks, ["corp"]);
        assert_eq!(spec.mounts[0].named_source(), Some("shared"));
    }

    #[test]
    fn build_only_service_gets_a_project_tag() {
        let manifest = Manifest {
            services: vec![Service {
                name: "app".into(),
                build: Some(BuildSpec {
                    context: "./app".into(),
                    dockerfile: None,
                    args: BTreeMap::new(),
                }),
                ..Service::default()
            }],
            ..Manifest::default()
        };
        let (engine, runtime) = recording_engine(RecordingRuntime::new());

        let report = engine.up(&manifest).expect("up should succeed");
        assert!(report.all_started());
        assert_eq!(
            runtime.events(),
            ["build ./app demo-app", "create demo-app", "start demo-app"]
        );
    }

    #[test]
    fn container_name_override_is_honored() {
        let manifest = Manifest {
            services: vec![Service {
                name: "db".into(),
                image: Some("postgres:16".into()),
                container_name: Some("legacy-db".into()),
                ..Service::default()
            }],
            ..Manifest::default()
        };
        let (engine, runtime) = recording_engine(RecordingRuntime::new());

        let _ = engine.up(&manifest).expect("up should succeed");
        assert!(runtime.events().contains(&"create legacy-db".to_string()));
    }

    #[test]
    fn down_removes_in_reverse_order() {
        let manifest = Manifest {
            services: vec![service("db", &[]), service("web", &["db"])],
            volumes: vec![VolumeDecl {
                name: "data".into(),
                ..VolumeDecl::default()
            }],
            ..Manifest::default()
        };
        let (engine, runtime) = recording_engine(RecordingRuntime::new());

        let removed = engine.down(&manifest, false).expect("down should succeed");
        assert_eq!(
            runtime.events(),
            [
                "stop demo-web",
                "rm demo-web",
                "stop demo-db",
                "rm demo-db",
                "rm-network demo_default",
            ]
        );
        assert_eq!(removed.len(), 2);
        assert_eq!(removed[0].state, ServiceState::Removed);
    }

    #[test]
    fn down_with_volumes_removes_named_volumes() {
        let manifest = Manifest {
            services: vec![service("db", &[])],
            volumes: vec![
                VolumeDecl {
                    name: "data".into(),
                    ..VolumeDecl::default()
                },
                VolumeDecl {
                    name: "shared".into(),
                    external: true,
                    ..VolumeDecl::default()
                },
            ],
            ..Manifest::default()
        };
        let (engine, runtime) = recording_engine(RecordingRuntime::new());

        let _ = engine.down(&manifest, true).expect("down should succeed");
        let events = runtime.events();
        assert!(events.contains(&"rm-volume demo_data".to_string()));
        assert!(!events.contains(&"rm-volume shared".to_string()));
        assert!(!events.contains(&"rm-volume demo_shared".to_string()));
    }

    #[test]
    fn down_tolerates_missing_containers() {
        let manifest = Manifest {
            services: vec![service("db", &[]), service("cache", &[])],
            ..Manifest::default()
        };
        let (engine, _) = recording_engine(RecordingRuntime::failing(&[
            "stop demo-db",
            "rm demo-db",
        ]));

        let removed = engine.down(&manifest, false).expect("down should succeed");
        let names: Vec<_> = removed.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["cache"]);
    }
}
