//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod deploy;

pub use deploy::DeployArgs;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Print a signed deployment token
    Token(DeployArgs),
    /// Sign a token and trigger the deployment
    Deploy(DeployArgs),
    /// Check that the server is alive
    Ping,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Token(args) => deploy::print_token(&args),
        Commands::Deploy(args) => deploy::deploy(&args, config).await,
        Commands::Ping => deploy::ping(config).await,
    }
}
