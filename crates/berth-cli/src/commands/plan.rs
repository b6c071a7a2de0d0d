//! `berth plan` — show the start order without touching the runtime.

use berth_manifest::graph::DependencyGraph;

use super::Context;

/// Executes the `plan` command.
///
/// Resolves the dependency graph and lists every service in the order
/// `up` would start it, with the details the runtime would receive.
///
/// # Errors
///
/// Returns an error if the dependency order cannot be resolved.
pub fn execute(context: &Context) -> anyhow::Result<()> {
    let order = DependencyGraph::from_manifest(&context.manifest)?.resolve_order()?;

    println!(
        "Start plan for project {} ({})",
        context.project,
        context.manifest_path.display()
    );
    println!("{}", "\u{2550}".repeat(40));
    println!();

    for name in &order {
        let Some(service) = context.manifest.service(name) else {
            continue;
        };
        println!("  + {name}");
        if let Some(ref image) = service.image {
            println!("      image: {image}");
        }
        if let Some(ref build) = service.build {
            println!("      build: {}", build.context);
        }
        for port in &service.ports {
            println!("      port: {port}");
        }
        if !service.depends_on.is_empty() {
            let after: Vec<&str> = service
                .depends_on
                .iter()
                .map(|dep| dep.service.as_str())
                .collect();
            println!("      after: {}", after.join(", "));
        }
    }

    println!();
    println!("  {} service(s) will be started.", order.len());
    Ok(())
}
