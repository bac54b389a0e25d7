//! Request Pipeline
//!
//! Turns a token and a hostname into exactly one [`PipelineResult`]. Checks
//! run in a fixed order and the first failure decides the response:
//!
//! verify token → service/image present → config shape → host → root
//! → service file → image syntax → execute

use hoist_core::domain::outcome::PipelineResult;
use hoist_core::image::is_valid_image_ref;
use hoist_core::token::TokenVerifier;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::process::CommandRunner;
use crate::service::error::{DeployError, Result};
use crate::service::executor::DeploymentExecutor;
use crate::service::locator;
use crate::service::registry::DeploymentRegistry;

/// End-to-end deploy request handler
pub struct DeployPipeline {
    verifier: TokenVerifier,
    config_path: PathBuf,
    executor: DeploymentExecutor,
}

impl DeployPipeline {
    pub fn new(config: &Config, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            verifier: TokenVerifier::new(&config.secret),
            config_path: config.config_path.clone(),
            executor: DeploymentExecutor::from_config(config, runner),
        }
    }

    /// Handles one deploy request
    ///
    /// # Arguments
    /// * `token` - Signed deployment token from the request path
    /// * `hostname` - Host the request was addressed to, without port
    pub fn handle(&self, token: &str, hostname: &str) -> PipelineResult {
        match self.run(token, hostname) {
            Ok(message) => {
                info!("{}", message);
                PipelineResult::ok(message)
            }
            Err(e) => e.into_result(),
        }
    }

    fn run(&self, token: &str, hostname: &str) -> Result<String> {
        let claims = self.verifier.verify(token).map_err(|e| {
            debug!("Rejected token: {}", e);
            DeployError::InvalidToken
        })?;

        let request = claims.into_request().map_err(DeployError::MissingField)?;
        info!(
            "Deploy requested on {}: service={} image={}",
            hostname, request.service, request.image
        );

        // Read on every request
        let registry = DeploymentRegistry::load(&self.config_path)?;
        let descriptor = registry.resolve(hostname)?;

        let service_file = locator::locate(&descriptor.search_dir(), &request.service)
            .ok_or_else(|| DeployError::ServiceNotFound(request.service.clone()))?;

        if !is_valid_image_ref(&request.image) {
            return Err(DeployError::InvalidImageFormat);
        }

        self.executor.execute(
            &descriptor.root,
            &service_file,
            &request.service,
            &request.image,
        )
    }
}
