//! `berth down` — stop and remove the stack in reverse order.

use clap::Args;

use berth_runtime::engine::Engine;
use berth_runtime::invoker::detect_runtime;

use crate::output::{self, BOLD, GREEN, RESET};

use super::Context;

/// Arguments for the `down` command.
#[derive(Args, Debug)]
pub struct DownArgs {
    /// Also remove the project's named volumes.
    #[arg(long)]
    pub volumes: bool,
}

/// Executes the `down` command.
///
/// Containers go first, in reverse start order, then project networks.
/// Named volumes survive unless `--volumes` is given; external
/// resources are never touched.
///
/// # Errors
///
/// Returns an error if no runtime is installed or ordering fails.
pub fn execute(context: &Context, args: &DownArgs) -> anyhow::Result<()> {
    let runtime = detect_runtime(context.runtime)?;
    let engine = Engine::new(runtime, context.project.clone());

    eprintln!();
    eprintln!("  Stopping project {BOLD}{}{RESET}...", context.project);
    eprintln!();

    let removed = engine.down(&context.manifest, args.volumes)?;
    for service in &removed {
        eprintln!("{}", output::service_row(service));
    }

    eprintln!();
    eprintln!("  {GREEN}Removed {} container(s).{RESET}", removed.len());
    Ok(())
}
