//! Hoist Server
//!
//! Authenticated "redeploy this service with this image" endpoint.
//!
//! Architecture:
//! - Configuration: environment, validated once at startup
//! - Services: registry, locator, executor and the deploy pipeline
//! - Process: docker / compose invocation behind a runner trait
//! - API: axum router with the deploy endpoint and a liveness probe

mod api;
mod config;
mod process;
mod service;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::AppState;
use crate::config::Config;
use crate::process::{CommandRunner, SystemCommandRunner};
use crate::service::DeployPipeline;

#[tokio::main]
async fn main() -> Result<()> {
    // Optional .env next to the binary
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hoist_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Hoist server...");

    let config = Config::from_env()?;
    config.validate()?;
    info!(
        "Loaded configuration: config_path={}, docker={}, compose={}",
        config.config_path.display(),
        config.docker_bin,
        config.compose_command.join(" ")
    );

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemCommandRunner::new());
    let pipeline = Arc::new(DeployPipeline::new(&config, runner));

    // Build router with all API endpoints
    let app = api::create_router(AppState { pipeline });

    info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
