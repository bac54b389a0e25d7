//! Pipeline outcome

use crate::dto::deploy::DeployResponse;

/// Final answer of the request pipeline
///
/// Always produced, never partial. The status code is one of 200, 400, 404
/// or 500.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    pub status_code: u16,
    pub message: String,
}

impl PipelineResult {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(200, message)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Wire body for this result
    pub fn to_response(&self) -> DeployResponse {
        DeployResponse {
            message: self.message.clone(),
        }
    }
}
