//! Adapter that drives a compose-compatible container CLI.
//!
//! `docker` and `podman` share the command surface berth needs, so one
//! adapter covers both; [`super::detect_runtime`] picks the binary.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, trace};

use berth_common::error::{BerthError, Result};
use berth_common::types::ContainerId;
use berth_manifest::model::{BuildSpec, CommandSpec, HealthTest, RestartPolicy};
use berth_manifest::parser::short::format_duration;

use super::{ContainerRuntime, ContainerSpec};

/// Shells out to an external container runtime binary.
#[derive(Debug)]
pub struct CliRuntime {
    name: String,
    binary: PathBuf,
}

impl CliRuntime {
    /// Creates an adapter for the given binary.
    #[must_use]
    pub fn new(name: impl Into<String>, binary: PathBuf) -> Self {
        Self {
            name: name.into(),
            binary,
        }
    }

    /// Runs the CLI with `args`, capturing trimmed stdout.
    ///
    /// A non-zero exit becomes a [`BerthError::StartFailure`] carrying
    /// `subject` and the runtime's stderr.
    fn run(&self, subject: &str, args: &[String]) -> Result<String> {
        trace!(binary = %self.binary.display(), ?args, "invoking runtime");
        let output = Command::new(&self.binary).args(args).output().map_err(|e| {
            BerthError::StartFailure {
                name: subject.to_string(),
                message: format!("failed to invoke {}: {e}", self.name),
            }
        })?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .trim()
                .lines()
                .last()
                .unwrap_or("runtime exited with an error")
                .to_string();
            Err(BerthError::StartFailure {
                name: subject.to_string(),
                message,
            })
        }
    }

    /// Returns whether `kind inspect name` succeeds.
    fn exists(&self, kind: &str, name: &str) -> bool {
        self.run(name, &str_args(&[kind, "inspect", name])).is_ok()
    }
}

impl ContainerRuntime for CliRuntime {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.run(&self.name, &str_args(&["info"])).is_ok()
    }

    fn ensure_network(&self, name: &str, driver: Option<&str>) -> Result<()> {
        if self.exists("network", name) {
            debug!(network = name, "network already exists");
            return Ok(());
        }
        let mut args = str_args(&["network", "create"]);
        if let Some(driver) = driver {
            args.push("--driver".into());
            args.push(driver.into());
        }
        args.push(name.into());
        let _ = self.run(name, &args)?;
        Ok(())
    }

    fn remove_network(&self, name: &str) -> Result<()> {
        let _ = self.run(name, &str_args(&["network", "rm", name]))?;
        Ok(())
    }

    fn ensure_volume(&self, name: &str, driver: Option<&str>) -> Result<()> {
        if self.exists("volume", name) {
            debug!(volume = name, "volume already exists");
            return Ok(());
        }
        let mut args = str_args(&["volume", "create"]);
        if let Some(driver) = driver {
            args.push("--driver".into());
            args.push(driver.into());
        }
        args.push(name.into());
        let _ = self.run(name, &args)?;
        Ok(())
    }

    fn remove_volume(&self, name: &str) -> Result<()> {
        let _ = self.run(name, &str_args(&["volume", "rm", name]))?;
        Ok(())
    }

    fn build(&self, build: &BuildSpec, tag: &str) -> Result<()> {
        let mut args = str_args(&["build", "--tag", tag]);
        if let Some(ref dockerfile) = build.dockerfile {
            // The manifest names the Dockerfile relative to the context.
            args.push("--file".into());
            args.push(
                Path::new(&build.context)
                    .join(dockerfile)
                    .to_string_lossy()
                    .into_owned(),
            );
        }
        for (name, value) in &build.args {
            args.push("--build-arg".into());
            args.push(format!("{name}={value}"));
        }
        args.push(build.context.clone());
        let _ = self.run(tag, &args)?;
        Ok(())
    }

    fn create(&self, spec: &ContainerSpec) -> Result<ContainerId> {
        let stdout = self.run(&spec.name, &create_args(spec))?;
        // `create` accepts a single --network; attach the rest afterwards.
        for network in spec.networks.iter().skip(1) {
            let _ = self.run(
                &spec.name,
                &str_args(&["network", "connect", network, &spec.name]),
            )?;
        }
        let id = stdout.lines().last().unwrap_or_default().trim();
        if id.is_empty() {
            Ok(ContainerId::new(&spec.name))
        } else {
            Ok(ContainerId::new(id))
        }
    }

    fn start(&self, name: &str) -> Result<()> {
        let _ = self.run(name, &str_args(&["start", name]))?;
        Ok(())
    }

    fn stop(&self, name: &str) -> Result<()> {
        let _ = self.run(name, &str_args(&["stop", name]))?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        let _ = self.run(name, &str_args(&["rm", name]))?;
        Ok(())
    }
}

fn str_args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| (*s).to_string()).collect()
}

/// Assembles the full `create` argument vector for a container spec.
///
/// Flag order follows the runtime's expectation: options first, then the
/// image, then the command arguments.
fn create_args(spec: &ContainerSpec) -> Vec<String> {
    let mut args = str_args(&["create", "--name", &spec.name]);
    for (key, value) in &spec.labels {
        args.push("--label".into());
        args.push(format!("{key}={value}"));
    }
    if spec.restart != RestartPolicy::No {
        args.push("--restart".into());
        args.push(spec.restart.as_str().into());
    }
    if let Some(policy) = spec.pull_policy {
        args.push("--pull".into());
        args.push(policy.as_str().into());
    }
    if spec.tty {
        args.push("--tty".into());
    }
    for (name, value) in &spec.env {
        args.push("--env".into());
        args.push(format!("{name}={value}"));
    }
    for mount in &spec.mounts {
        args.push("--volume".into());
        args.push(mount.to_string());
    }
    for port in &spec.ports {
        args.push("--publish".into());
        args.push(port.to_string());
    }
    for host in &spec.extra_hosts {
        args.push("--add-host".into());
        args.push(host.clone());
    }
    if let Some(network) = spec.networks.first() {
        args.push("--network".into());
        args.push(network.clone());
    }
    if let Some(ref healthcheck) = spec.healthcheck {
        args.push("--health-cmd".into());
        args.push(match &healthcheck.test {
            // The CLI flag only takes the shell form.
            HealthTest::Shell(cmd) => cmd.clone(),
            HealthTest::Command(argv) => argv.join(" "),
        });
        if let Some(interval) = healthcheck.interval {
            args.push("--health-interval".into());
            args.push(format_duration(interval));
        }
        if let Some(timeout) = healthcheck.timeout {
            args.push("--health-timeout".into());
            args.push(format_duration(timeout));
        }
        if let Some(start_period) = healthcheck.start_period {
            args.push("--health-start-period".into());
            args.push(format_duration(start_period));
        }
        if let Some(retries) = healthcheck.retries {
            args.push("--health-retries".into());
            args.push(retries.to_string());
        }
    }
    // --entrypoint takes a single binary; extra argv elements are passed
    // ahead of the command arguments after the image.
    let mut entry_rest: Vec<String> = Vec::new();
    if let Some(ref entrypoint) = spec.entrypoint {
        let first = match entrypoint {
            CommandSpec::Shell(cmd) => Some(cmd.clone()),
            CommandSpec::Argv(argv) => {
                entry_rest = argv.get(1..).map(<[String]>::to_vec).unwrap_or_default();
                argv.first().cloned()
            }
        };
        if let Some(first) = first {
            args.push("--entrypoint".into());
            args.push(first);
        }
    }
    args.push(spec.image.clone());
    args.extend(entry_rest);
    if let Some(ref command) = spec.command {
        match command {
            CommandSpec::Argv(argv) => args.extend(argv.iter().cloned()),
            CommandSpec::Shell(cmd) => {
                args.extend(str_args(&["/bin/sh", "-c", cmd]));
            }
        }
    }
    args
}
