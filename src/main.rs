// src/main.rs

use anyhow::{Context, Result};
use chanarch::cli::Cli;
use chanarch::prelude::*;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbosity: Verbosity) {
    let level = match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => "warn",
        Verbosity::Verbose => "info",
        Verbosity::Debug => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stdout)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbosity = cli.verbosity();
    init_tracing(verbosity);

    let config = cli.into_config();
    if !config.has_input() {
        Cli::command().print_help()?;
        println!();
        anyhow::bail!(RunError::NoInput);
    }

    let summary = chanarch::run(config).await.context("run aborted")?;
    if verbosity != Verbosity::Quiet {
        println!("{summary}");
    }
    Ok(())
}
