//! Liveness probe
//!
//! Fixed answer, independent of configuration and the deploy pipeline.

use axum::{http::StatusCode, response::IntoResponse};

/// GET /deploy/ping
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}
