// Entrypoint for the CLI application.
// - Keeps `main` small: set up logging, parse arguments, hand off to `ui`.
// - Any error ends up here and becomes a message plus exit code 1.

use std::process::ExitCode;

use clap::Parser;
use sbclient::{cli::Cli, ui};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Logs go to stderr so `--output-path -` stays a clean byte stream.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match ui::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
