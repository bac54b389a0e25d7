//! Deploy command handlers
//!
//! Token issuing, deployment triggering and the liveness check.

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use hoist_core::token::{DEFAULT_TOKEN_TTL_SECS, TokenSigner};

use crate::api::ApiClient;
use crate::config::Config;

/// What to deploy and how to sign it
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Service name as declared in the compose file
    #[arg(long)]
    pub service: String,

    /// Image reference to deploy (e.g. quay.io/openware/barong:2.4.6)
    #[arg(long)]
    pub image: String,

    /// Token lifetime in seconds
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_SECS)]
    pub ttl: i64,

    /// Shared signing secret
    #[arg(long, env = "WEBHOOK_JWT_SECRET", hide_env_values = true)]
    pub secret: String,
}

impl DeployArgs {
    fn sign(&self) -> Result<String> {
        TokenSigner::new(&self.secret)
            .with_ttl(chrono::Duration::seconds(self.ttl))
            .sign(&self.service, &self.image)
            .context("Failed to sign deployment token")
    }
}

/// Print a token for the given service and image
pub fn print_token(args: &DeployArgs) -> Result<()> {
    println!("{}", args.sign()?);
    Ok(())
}

/// Sign a token and call the deploy endpoint
pub async fn deploy(args: &DeployArgs, config: &Config) -> Result<()> {
    let token = args.sign()?;
    let client = ApiClient::new(&config.server_url);

    println!(
        "{} Deploying {} with image {}",
        "▸".cyan(),
        args.service.bold(),
        args.image.bold()
    );

    let result = client.deploy(&token).await?;

    if result.is_success() {
        println!("{} {}", "✓".green(), result.message.green());
        Ok(())
    } else {
        println!(
            "{} {} {}",
            "✗".red(),
            format!("[{}]", result.status_code).dimmed(),
            result.message.red()
        );
        anyhow::bail!("Deployment failed with status {}", result.status_code);
    }
}

/// Call the liveness probe
pub async fn ping(config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.server_url);
    let body = client.ping().await?;

    println!("{} {}", body.green(), config.server_url.dimmed());
    Ok(())
}
