//! Static checks over the parsed model.
//!
//! Catches dangling references, missing required properties, host port
//! conflicts, and dependency cycles before anything reaches the
//! external runtime.

use std::collections::{HashMap, HashSet};

use tracing::info;

use berth_common::error::{BerthError, Result};

use crate::graph::DependencyGraph;
use crate::model::{Manifest, Protocol};

/// Validates a parsed manifest for semantic correctness.
///
/// # Checks performed
///
/// 1. Every service declares an `image` or a `build`.
/// 2. Every `depends_on` target is a defined service.
/// 3. Every named volume mount refers to a declared volume.
/// 4. Every network attachment refers to a declared network.
/// 5. No two services publish the same host port.
/// 6. The dependency graph has no cycle.
///
/// # Errors
///
/// Returns an error if any check fails.
pub fn validate(manifest: &Manifest) -> Result<()> {
    info!("validating manifest");
    check_image_or_build(manifest)?;
    check_dependency_references(manifest)?;
    check_volume_references(manifest)?;
    check_network_references(manifest)?;
    check_host_port_conflicts(manifest)?;
    check_cycles(manifest)?;
    Ok(())
}

fn check_image_or_build(manifest: &Manifest) -> Result<()> {
    for service in &manifest.services {
        if service.image.is_none() && service.build.is_none() {
            return Err(BerthError::MalformedManifest {
                path: format!("services.{}", service.name),
                message: "one of `image` or `build` is required".into(),
            });
        }
    }
    Ok(())
}

fn check_dependency_references(manifest: &Manifest) -> Result<()> {
    let names: HashSet<&str> = manifest.services.iter().map(|s| s.name.as_str()).collect();
    for service in &manifest.services {
        for dep in &service.depends_on {
            if !names.contains(dep.service.as_str()) {
                return Err(BerthError::UnknownReference {
                    kind: "service",
                    name: dep.service.clone(),
                    referenced_by: format!("services.{}.depends_on", service.name),
                });
            }
        }
    }
    Ok(())
}

fn check_volume_references(manifest: &Manifest) -> Result<()> {
    for service in &manifest.services {
        for (i, mount) in service.volumes.iter().enumerate() {
            if let Some(source) = mount.named_source() {
                if !manifest.has_volume(source) {
                    return Err(BerthError::UnknownReference {
                        kind: "volume",
                        name: source.to_string(),
                        referenced_by: format!("services.{}.volumes[{i}]", service.name),
                    });
                }
            }
        }
    }
    Ok(())
}

fn check_network_references(manifest: &Manifest) -> Result<()> {
    for service in &manifest.services {
        for (i, network) in service.networks.iter().enumerate() {
            if !manifest.has_network(network) {
                return Err(BerthError::UnknownReference {
                    kind: "network",
                    name: network.clone(),
                    referenced_by: format!("services.{}.networks[{i}]", service.name),
                });
            }
        }
    }
    Ok(())
}

fn check_host_port_conflicts(manifest: &Manifest) -> Result<()> {
    let mut published: HashMap<(Option<&str>, u16, Protocol), &str> = HashMap::new();
    for service in &manifest.services {
        for (i, port) in service.ports.iter().enumerate() {
            let Some(host_port) = port.host_port else {
                continue;
            };
            let key = (port.host_address.as_deref(), host_port, port.protocol);
            if let Some(holder) = published.insert(key, service.name.as_str()) {
                return Err(BerthError::MalformedManifest {
                    path: format!("services.{}.ports[{i}]", service.name),
                    message: format!(
                        "host port {host_port} is already published by service \"{holder}\""
                    ),
                });
            }
        }
    }
    Ok(())
}

fn check_cycles(manifest: &Manifest) -> Result<()> {
    let _ = DependencyGraph::from_manifest(manifest)?.resolve_order()?;
    Ok(())
}
