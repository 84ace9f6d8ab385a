use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Subcommand};
use modelcompat_core::{capability, Capability, ModelClass, ProbeOptions};
use modelcompat_types::{builtin_class, BUILTIN_MODELS};

use crate::exit::{compat_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod envinfo;
pub mod probe;
pub mod schema;
pub mod validate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report the active validation generation and its capability gaps.
    Probe(ProbeArgs),
    /// Print the JSON schema of a built-in model.
    Schema(SchemaArgs),
    /// Validate a JSON document against a built-in model.
    Validate(ValidateArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Print build and environment diagnostics.
    Envinfo(EnvinfoArgs),
}

pub fn run(command: Command, format: OutputFormat, options: ProbeOptions) -> CliResult<i32> {
    match command {
        Command::Probe(args) => probe::run(args, format, options),
        Command::Schema(args) => schema::run(args, format, options),
        Command::Validate(args) => validate::run(args, format, options),
        Command::Version(args) => version::run(args),
        Command::Envinfo(args) => envinfo::run(args, format),
    }
}

pub(crate) fn init_capability(options: ProbeOptions) -> CliResult<Capability> {
    capability::init(options).map_err(|err| compat_error("capability probe", err))
}

pub(crate) fn resolve_model(name: &str, capability: Capability) -> CliResult<Arc<ModelClass>> {
    match builtin_class(name, capability) {
        Some(class) => class.map_err(|err| compat_error(name, err)),
        None => Err(CliError::new(
            USAGE,
            format!(
                "unknown model {name:?}; expected one of: {}",
                BUILTIN_MODELS.join(", ")
            ),
        )),
    }
}

#[derive(Args, Debug, Default)]
pub struct ProbeArgs {}

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Built-in model name (image, audio, message, history, tool).
    pub model: String,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Built-in model name (image, audio, message, history, tool).
    pub model: String,
    /// Inline JSON document.
    #[arg(long, conflicts_with = "file")]
    pub json: Option<String>,
    /// Read the JSON document from a file.
    #[arg(long, conflicts_with = "json")]
    pub file: Option<PathBuf>,
    /// Drop null values from the dumped instance.
    #[arg(long)]
    pub exclude_none: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct EnvinfoArgs {}
