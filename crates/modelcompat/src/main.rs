mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;
use modelcompat_core::ProbeOptions;

use crate::cmd::Command;
use crate::exit::compat_error;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "modelcompat",
    version,
    about = "Validate data models under either jsonschema API line"
)]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Force a validation generation (legacy|modern, also a|b, 1|2).
    #[arg(long, value_name = "GEN", env = "MODELCOMPAT_GENERATION", global = true)]
    generation: Option<String>,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = ProbeOptions::from_value(cli.generation.as_deref())
        .map_err(|err| compat_error("--generation", err))
        .and_then(|options| cmd::run(cli.command, format, options));

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
