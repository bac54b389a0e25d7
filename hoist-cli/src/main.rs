//! Hoist CLI
//!
//! Command-line interface for issuing deployment tokens and triggering
//! deployments on a Hoist server.

mod api;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "hoist")]
#[command(about = "Hoist deployment trigger CLI", long_about = None)]
struct Cli {
    /// Hoist server URL
    #[arg(long, env = "HOIST_URL", default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        server_url: cli.url,
    };

    handle_command(cli.command, &config).await
}
