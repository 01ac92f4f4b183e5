//! Demo Shell Runtime
//!
//! Command line host for the shell's settings file

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Demo Shell v{}", shell_core::VERSION);

    let args = cli::Args::parse();
    let mut stdout = std::io::stdout().lock();
    cli::run(&args, &mut stdout)
}
