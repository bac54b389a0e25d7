//! API Responses
//!
//! Every deploy outcome becomes `{ "message": ... }` with its status code.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hoist_core::domain::outcome::PipelineResult;

/// HTTP rendering of a [`PipelineResult`]
#[derive(Debug)]
pub struct DeployReply(pub PipelineResult);

impl DeployReply {
    /// Generic 500, used when the pipeline itself could not run to completion
    pub fn internal_error() -> Self {
        Self(PipelineResult::new(500, "internal server error"))
    }
}

impl IntoResponse for DeployReply {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(self.0.to_response())).into_response()
    }
}
