//! Formatted output helpers for CLI commands.
//!
//! Provides the colored per-service report rows and access URL
//! extraction shared by `up` and `down`.

use berth_common::types::ServiceState;
use berth_manifest::model::Manifest;
use berth_runtime::engine::{DeployReport, ServiceReport};

/// Bold escape.
pub const BOLD: &str = "\x1b[1m";
/// Dim escape.
pub const DIM: &str = "\x1b[2m";
/// Green escape.
pub const GREEN: &str = "\x1b[32m";
/// Red escape.
pub const RED: &str = "\x1b[31m";
/// Yellow escape.
pub const YELLOW: &str = "\x1b[33m";
/// Cyan escape.
pub const CYAN: &str = "\x1b[36m";
/// Reset escape.
pub const RESET: &str = "\x1b[0m";

/// One formatted report row for a service outcome.
#[must_use]
pub fn service_row(service: &ServiceReport) -> String {
    match service.state {
        ServiceState::Started => {
            let id = service
                .id
                .as_ref()
                .map_or_else(String::new, |id| format!(" {DIM}[{}]{RESET}", id.short()));
            format!("    {GREEN}\u{25cf}{RESET} {BOLD}{}{RESET}{id}", service.name)
        }
        ServiceState::Failed => format!(
            "    {RED}\u{2717}{RESET} {BOLD}{}{RESET} {}",
            service.name,
            service.message.as_deref().unwrap_or("failed")
        ),
        ServiceState::Skipped => format!(
            "    {YELLOW}\u{25cb}{RESET} {BOLD}{}{RESET} {DIM}{}{RESET}",
            service.name,
            service.message.as_deref().unwrap_or("skipped")
        ),
        ServiceState::Removed => format!("    {DIM}\u{2212}{RESET} {}", service.name),
    }
}

/// Local URLs for every published port of a service that started.
#[must_use]
pub fn access_urls(manifest: &Manifest, report: &DeployReport) -> Vec<String> {
    report
        .services
        .iter()
        .filter(|s| s.state == ServiceState::Started)
        .filter_map(|s| manifest.service(&s.name))
        .flat_map(|service| service.ports.iter())
        .filter_map(|port| port.host_port.map(|p| format!("http://localhost:{p}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use berth_common::types::ContainerId;
    use berth_manifest::model::{PortMapping, Protocol, Service};

    use super::*;

    fn report_entry(name: &str, state: ServiceState) -> ServiceReport {
        ServiceReport {
            name: name.into(),
            container: format!("demo-{name}"),
            id: Some(ContainerId::new("0123456789abcdef")),
            state,
            message: Some("dependency \"db\" did not start".into()),
            started_at: None,
        }
    }

    #[test]
    fn started_row_shows_short_id() {
        let row = service_row(&report_entry("web", ServiceState::Started));
        assert!(row.contains("web"), "got: {row}");
        assert!(row.contains("0123456789ab"), "got: {row}");
        assert!(!row.contains("0123456789abcdef"), "got: {row}");
    }

    #[test]
    fn skipped_row_shows_the_reason() {
        let row = service_row(&report_entry("web", ServiceState::Skipped));
        assert!(row.contains("did not start"), "got: {row}");
    }

    #[test]
    fn access_urls_only_cover_started_services() {
        let port = |host: u16| PortMapping {
            host_address: None,
            host_port: Some(host),
            container_port: 8080,
            protocol: Protocol::Tcp,
        };
        let manifest = Manifest {
            services: vec![
                Service {
                    name: "web".into(),
                    ports: vec![port(3000)],
                    ..Service::default()
                },
                Service {
                    name: "admin".into(),
                    ports: vec![port(3001)],
                    ..Service::default()
                },
            ],
            ..Manifest::default()
        };
        let report = DeployReport {
            project: "demo".into(),
            services: vec![
                report_entry("web", ServiceState::Started),
                report_entry("admin", ServiceState::Failed),
            ],
        };

        assert_eq!(access_urls(&manifest, &report), ["http://localhost:3000"]);
    }

    #[test]
    fn container_only_ports_produce_no_urls() {
        let manifest = Manifest {
            services: vec![Service {
                name: "web".into(),
                ports: vec![PortMapping {
                    host_address: None,
                    host_port: None,
                    container_port: 9099,
                    protocol: Protocol::Tcp,
                }],
                ..Service::default()
            }],
            ..Manifest::default()
        };
        let report = DeployReport {
            project: "demo".into(),
            services: vec![report_entry("web", ServiceState::Started)],
        };

        assert!(access_urls(&manifest, &report).is_empty());
    }
}
