//! CLI command definitions and dispatch.

pub mod config;
pub mod down;
pub mod plan;
pub mod up;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use berth_common::config::{BerthConfig, RuntimeKind};
use berth_common::constants;
use berth_manifest::environment::Environment;
use berth_manifest::model::Manifest;
use berth_manifest::parser;

/// berth — declarative multi-container deployments.
#[derive(Parser, Debug)]
#[command(name = "berth", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to the manifest file. Defaults to discovery in the
    /// working directory (berth.yaml, compose.yaml, ...).
    #[arg(short, long, global = true)]
    pub file: Option<PathBuf>,

    /// Project name. Defaults to the manifest's `name` key, then the
    /// manifest's directory name.
    #[arg(short, long, global = true)]
    pub project: Option<String>,

    /// Container runtime to drive.
    #[arg(long, global = true, value_enum, default_value_t = RuntimeArg::Auto)]
    pub runtime: RuntimeArg,
}

/// Which runtime binary to use, as a CLI flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RuntimeArg {
    /// Probe `docker`, then `podman`.
    #[default]
    Auto,
    /// Require `docker`.
    Docker,
    /// Require `podman`.
    Podman,
}

impl From<RuntimeArg> for RuntimeKind {
    fn from(arg: RuntimeArg) -> Self {
        match arg {
            RuntimeArg::Auto => Self::Auto,
            RuntimeArg::Docker => Self::Docker,
            RuntimeArg::Podman => Self::Podman,
        }
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the manifest with all variables resolved.
    Config(config::ConfigArgs),
    /// Show the start order without touching the runtime.
    Plan,
    /// Create and start the stack in dependency order.
    Up(up::UpArgs),
    /// Stop and remove the stack in reverse order.
    Down(down::DownArgs),
}

/// Resolved invocation: the parsed manifest plus everything ambient.
pub struct Context {
    /// Parsed and validated manifest.
    pub manifest: Manifest,
    /// Path the manifest was loaded from.
    pub manifest_path: PathBuf,
    /// Project name all resources are scoped under.
    pub project: String,
    /// Requested runtime binary.
    pub runtime: RuntimeKind,
}

impl Context {
    /// Loads the manifest named by the CLI flags.
    ///
    /// The variable environment is the process environment, extended by
    /// a `.env` file next to the manifest for names not already set.
    ///
    /// # Errors
    ///
    /// Returns an error if no manifest is found or parsing fails.
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let config = BerthConfig {
            manifest_path: cli.file.clone(),
            project: cli.project.clone(),
            runtime: cli.runtime.into(),
        };
        let cwd = std::env::current_dir()?;
        let manifest_path = config.resolve_manifest(&cwd)?;

        let mut env = Environment::from_process();
        let dotenv = manifest_path
            .parent()
            .map(|dir| dir.join(constants::DOTENV_FILE));
        if let Some(path) = dotenv.filter(|p| p.is_file()) {
            tracing::debug!(path = %path.display(), "loading variables file");
            env.merge_missing(&Environment::load_dotenv(&path)?);
        }

        let manifest = parser::load(&manifest_path, &env)?;
        let project = config.resolve_project(manifest.name.as_deref(), &manifest_path);

        Ok(Self {
            manifest,
            manifest_path,
            project,
            runtime: config.runtime,
        })
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let context = Context::load(&cli)?;
    match cli.command {
        Command::Config(args) => config::execute(&context, &args),
        Command::Plan => plan::execute(&context),
        Command::Up(args) => up::execute(&context, &args),
        Command::Down(args) => down::execute(&context, &args),
    }
}
