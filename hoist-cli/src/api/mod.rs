//! API client module
//!
//! HTTP client for the Hoist server's deploy endpoints.

use anyhow::{Context, Result};
use hoist_core::domain::outcome::PipelineResult;
use hoist_core::dto::deploy::DeployResponse;
use reqwest::Client;

/// HTTP client for the Hoist server
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the server
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Trigger a deployment
    ///
    /// Every answer the server gives is returned as a [`PipelineResult`];
    /// only transport and decoding failures are errors.
    ///
    /// # Arguments
    /// * `token` - Signed deployment token
    pub async fn deploy(&self, token: &str) -> Result<PipelineResult> {
        let url = self.deploy_url(token);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send deploy request")?;

        let status = response.status();
        let body: DeployResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse response (status {})", status))?;

        Ok(PipelineResult::new(status.as_u16(), body.message))
    }

    /// Check that the server is alive
    ///
    /// # Returns
    /// The probe body, `pong`
    pub async fn ping(&self) -> Result<String> {
        let url = format!("{}/deploy/ping", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send ping request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Request failed with status {}: {}", status, error_text);
        }

        response.text().await.context("Failed to read ping response")
    }

    fn deploy_url(&self, token: &str) -> String {
        format!("{}/deploy/{}", self.base_url, token)
    }
}
