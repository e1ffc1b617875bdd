//! `docluster` binary.
//!
//! Logging comes up first, then the command runs and its report or summary
//! is printed to stdout. Any failure is logged once with its stable code and
//! the process exits with status 1.

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use docluster_cli::{
    cli::{Cli, CliError, render_summary, run_cli},
    logging::{self, LoggingError},
};
use tracing::{error, field};

fn main() -> ExitCode {
    if let Err(err) = logging::init_logging() {
        report_logging_init_error(&err);
        return ExitCode::FAILURE;
    }
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log_failure(&err);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let summary = run_cli(Cli::parse()).context("command failed")?;
    let mut stdout = BufWriter::new(io::stdout().lock());
    render_summary(&summary, &mut stdout).context("failed to print results")?;
    stdout.flush().context("failed to flush stdout")
}

fn log_failure(err: &anyhow::Error) {
    let cause = err.downcast_ref::<CliError>();
    let code = cause.map(|cli_error| field::display(cli_error.code()));
    let store_code = cause.and_then(CliError::store_code).map(field::display);
    let message = format!("{err:#}");
    error!(error = %message, code, store_code, "docluster failed");
}

#[expect(
    clippy::print_stderr,
    reason = "Emit one-off diagnostic before tracing is initialized"
)]
fn report_logging_init_error(err: &LoggingError) {
    eprintln!("failed to initialize logging: {err}");
}
