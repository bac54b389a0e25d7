//! Deployment error taxonomy
//!
//! Every way a deploy request can stop early. Each variant knows its HTTP
//! status and the message shown to the client.

use hoist_core::domain::deployment::MissingField;
use hoist_core::domain::outcome::PipelineResult;
use thiserror::Error;
use tracing::{error, warn};

use crate::service::registry::RegistryError;

/// Service error type
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("invalid token")]
    InvalidToken,

    #[error("{0} is not specified")]
    MissingField(MissingField),

    #[error("configuration must be an array of hash")]
    ConfigShape,

    #[error("unknown domain {0}")]
    UnknownDomain(String),

    #[error("root missing for host {0}")]
    RootMissing(String),

    #[error("service {0} not found")]
    ServiceNotFound(String),

    #[error("invalid image format")]
    InvalidImageFormat,

    /// Neither pullable nor present locally
    #[error("invalid image")]
    ImageNotFound,

    #[error("could not recreate the container")]
    RecreateFailed,

    /// Anything unexpected; details are logged, never returned
    #[error("internal server error")]
    Internal(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DeployError>;

impl DeployError {
    pub fn status_code(&self) -> u16 {
        match self {
            DeployError::InvalidToken
            | DeployError::MissingField(_)
            | DeployError::UnknownDomain(_)
            | DeployError::RootMissing(_)
            | DeployError::ServiceNotFound(_)
            | DeployError::InvalidImageFormat => 400,
            DeployError::ImageNotFound => 404,
            DeployError::ConfigShape | DeployError::RecreateFailed | DeployError::Internal(_) => {
                500
            }
        }
    }

    /// Converts the error into the client-facing result, logging it
    pub fn into_result(self) -> PipelineResult {
        let status = self.status_code();

        match &self {
            DeployError::Internal(err) => error!("Deployment failed: {:#}", err),
            _ if status >= 500 => error!("Deployment failed: {}", self),
            _ => warn!("Deployment rejected ({}): {}", status, self),
        }

        PipelineResult::new(status, self.to_string())
    }
}

impl From<RegistryError> for DeployError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Shape => DeployError::ConfigShape,
            RegistryError::UnknownDomain(host) => DeployError::UnknownDomain(host),
            RegistryError::RootMissing(host) => DeployError::RootMissing(host),
            err @ (RegistryError::Read { .. } | RegistryError::Parse { .. }) => {
                DeployError::Internal(err.into())
            }
        }
    }
}
