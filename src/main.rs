// ABOUTME: Binary entry point: logging setup, CLI parsing, exit-code mapping

use std::process::ExitCode;

use clap::Parser;

use worklock::cli::{self, Cli, EXIT_ERROR};

fn main() -> ExitCode {
    setup_logging();
    let cli = Cli::parse();
    match cli::run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Diagnostics go to stderr and stay off unless requested, so stdout
/// remains clean for the CLI's own output.
fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("WORKLOCK_LOG")
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
