//! Binary crate for the `clima` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration
//! - Rendering weather to the terminal and reading searches from stdin

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod display;
mod repl;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stderr keeps log lines out of the interactive output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
