//! `berth up` — create and start the stack in dependency order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use clap::Args;

use berth_runtime::engine::{DeployReport, Engine};
use berth_runtime::invoker::detect_runtime;

use crate::output::{self, BOLD, CYAN, DIM, GREEN, RESET, YELLOW};

use super::Context;

/// Arguments for the `up` command.
#[derive(Args, Debug)]
pub struct UpArgs {
    /// Start and return without waiting for Ctrl+C.
    #[arg(short, long)]
    pub detach: bool,
}

/// Executes the `up` command.
///
/// Starts every service in dependency order and prints the outcome per
/// service. Failures do not abort the walk; they are reported, their
/// dependents skipped, and the exit code reflects them.
///
/// # Errors
///
/// Returns an error if no runtime is installed, ordering fails, shared
/// resources cannot be created, or any service did not start.
pub fn execute(context: &Context, args: &UpArgs) -> anyhow::Result<()> {
    let started = Instant::now();
    print_header();

    let runtime = detect_runtime(context.runtime)?;
    let engine = Engine::new(runtime, context.project.clone());
    if !engine.runtime_available() {
        eprintln!(
            "  {YELLOW}Note:{RESET} {} is not responding; container calls may fail.",
            engine.runtime_name()
        );
        eprintln!();
    }

    let report = engine.up(&context.manifest)?;
    print_report(context, &report, started);

    if !report.all_started() {
        anyhow::bail!("{} service(s) did not start", report.failures().len());
    }

    if args.detach {
        eprintln!();
        eprintln!("  Running detached. Use {BOLD}berth down{RESET} to stop the stack.");
        return Ok(());
    }

    wait_for_shutdown(&engine, context)
}

fn print_header() {
    eprintln!();
    eprintln!(
        "  {BOLD}berth{RESET} {DIM}v{}{RESET}",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
}

fn print_report(context: &Context, report: &DeployReport, started: Instant) {
    let up = report.services.len() - report.failures().len();
    eprintln!();
    eprintln!(
        "  {GREEN}{BOLD}Started {up}/{}{RESET} service(s) in {:.1}s:",
        report.services.len(),
        started.elapsed().as_secs_f64()
    );
    eprintln!();
    for service in &report.services {
        eprintln!("{}", output::service_row(service));
    }

    let urls = output::access_urls(&context.manifest, report);
    if !urls.is_empty() {
        eprintln!();
        for url in &urls {
            eprintln!("  {CYAN}Access at:{RESET} {BOLD}{url}{RESET}");
        }
    }
}

fn wait_for_shutdown(engine: &Engine, context: &Context) -> anyhow::Result<()> {
    eprintln!();
    eprintln!("  Press {BOLD}Ctrl+C{RESET} to stop the stack...");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(std::time::Duration::from_millis(250));
    }

    eprintln!();
    eprintln!("  Stopping the stack...");
    let removed = engine.down(&context.manifest, false)?;
    eprintln!("  {GREEN}Removed {} container(s).{RESET}", removed.len());

    Ok(())
}
