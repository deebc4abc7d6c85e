//! Binary crate for the `weather-agent` service.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Serving the HTTP API
//! - Interactive configuration

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
