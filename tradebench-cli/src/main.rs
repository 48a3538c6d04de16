//! CLI entry point for the tradebench synthetic benchmark data generator.
//!
//! Parses the single positional config-file argument, runs the generator
//! pipeline to completion, and maps its typed error tree to a nonzero exit
//! code. Logging is initialized eagerly so every subsequent step can emit
//! structured diagnostics via `tracing`.

mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tradebench_core::{BdgError, Config};

use crate::logging::LoggingError;

/// Generate the social-trading benchmark dataset described by a config file.
#[derive(Debug, Parser)]
#[command(name = "tradebench", about = "Generate a social-trading benchmark dataset.")]
struct Cli {
    /// Path to the JSON configuration file.
    config: PathBuf,
}

fn try_main() -> Result<(), BdgError> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    tradebench_core::run(&config)?;
    Ok(())
}

fn main() -> ExitCode {
    if let Err(err) = logging::init_logging() {
        report_logging_init_error(&err);
        return ExitCode::FAILURE;
    }

    if let Err(err) = try_main() {
        error!(error = %err, code = err.code(), "data generation failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Emit a fallback diagnostic to stderr when tracing initialization fails.
#[expect(
    clippy::print_stderr,
    reason = "one-off diagnostic before tracing is initialized"
)]
fn report_logging_init_error(err: &LoggingError) {
    eprintln!("failed to initialize logging: {err}");
}
