//! `berth config` — print the manifest with all variables resolved.

use clap::{Args, ValueEnum};

use berth_manifest::render;

use super::Context;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Yaml)]
    pub format: Format,
}

/// Serialization format for the resolved manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Canonical YAML, parseable by berth itself.
    #[default]
    Yaml,
    /// Pretty-printed JSON.
    Json,
}

/// Executes the `config` command.
///
/// The output is the canonical rendering: placeholder resolution and
/// validation have already happened, so what prints is exactly what
/// `up` would deploy.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn execute(context: &Context, args: &ConfigArgs) -> anyhow::Result<()> {
    match args.format {
        Format::Yaml => print!("{}", render::to_yaml_string(&context.manifest)?),
        Format::Json => {
            let value = render::to_value(&context.manifest);
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}
