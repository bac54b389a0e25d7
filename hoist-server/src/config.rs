//! Server configuration
//!
//! Built once at startup from the environment and handed to the pipeline.
//! Business logic never reads the environment directly.

use anyhow::{Context, bail};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::service::registry::{self, DeploymentRegistry};

/// Server configuration
#[derive(Clone)]
pub struct Config {
    /// Shared HS256 secret for deployment tokens
    pub secret: String,

    /// YAML file listing deployment descriptors, reloaded on every request
    pub config_path: PathBuf,

    /// Listen address (e.g., "0.0.0.0:8080")
    pub bind_addr: String,

    /// Container runtime binary used for pull / inspect
    pub docker_bin: String,

    /// Compose command, possibly several words (e.g., "docker compose")
    pub compose_command: Vec<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("secret", &"<redacted>")
            .field("config_path", &self.config_path)
            .field("bind_addr", &self.bind_addr)
            .field("docker_bin", &self.docker_bin)
            .field("compose_command", &self.compose_command)
            .finish()
    }
}

impl Config {
    /// Creates a configuration with default bind address and tool names
    pub fn new(secret: String, config_path: PathBuf) -> Self {
        Self {
            secret,
            config_path,
            bind_addr: "0.0.0.0:8080".to_string(),
            docker_bin: "docker".to_string(),
            compose_command: vec!["docker-compose".to_string()],
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - WEBHOOK_JWT_SECRET (required)
    /// - CONFIG_PATH (required)
    /// - HOIST_BIND_ADDR (optional, default: 0.0.0.0:8080)
    /// - HOIST_DOCKER_BIN (optional, default: docker)
    /// - HOIST_COMPOSE_COMMAND (optional, default: docker-compose)
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = std::env::var("WEBHOOK_JWT_SECRET").unwrap_or_default();
        let config_path = std::env::var("CONFIG_PATH").unwrap_or_default();

        let mut config = Self::new(secret, PathBuf::from(config_path));

        if let Ok(addr) = std::env::var("HOIST_BIND_ADDR") {
            config.bind_addr = addr;
        }

        if let Ok(bin) = std::env::var("HOIST_DOCKER_BIN") {
            config.docker_bin = bin;
        }

        if let Ok(command) = std::env::var("HOIST_COMPOSE_COMMAND") {
            config.compose_command = command.split_whitespace().map(String::from).collect();
        }

        Ok(config)
    }

    /// Validates the configuration
    ///
    /// Any failure here is fatal: the server must not start without a secret
    /// or a non-empty deployment configuration. A configuration that parses
    /// but has the wrong shape only produces a warning.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.secret.is_empty() {
            bail!("WEBHOOK_JWT_SECRET is not set");
        }

        if self.config_path.as_os_str().is_empty() {
            bail!("CONFIG_PATH is not set");
        }

        let document = registry::read_document(&self.config_path)
            .with_context(|| format!("Failed to load {}", self.config_path.display()))?;
        if registry::is_blank(&document) {
            bail!("The config file is empty or non-existent");
        }
        match DeploymentRegistry::from_value(document) {
            Ok(registry) => info!("{} deployment(s) configured", registry.len()),
            // Reported to callers as a 500 on every request until fixed
            Err(e) => warn!("{}: {}", self.config_path.display(), e),
        }

        self.bind_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid bind address '{}'", self.bind_addr))?;

        if self.docker_bin.is_empty() {
            bail!("HOIST_DOCKER_BIN cannot be empty");
        }

        if self.compose_command.is_empty() {
            bail!("HOIST_COMPOSE_COMMAND cannot be empty");
        }

        Ok(())
    }
}
