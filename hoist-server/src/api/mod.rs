//! API Module
//!
//! HTTP layer of the deployment trigger. Handlers stay thin: they extract the
//! token and hostname and hand them to the deploy pipeline.

pub mod deploy;
pub mod health;
pub mod response;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::service::DeployPipeline;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DeployPipeline>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Liveness probe; static segment wins over the token route
        .route("/deploy/ping", get(health::ping))
        .route("/deploy/{token}", get(deploy::deploy))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::RecordingRunner;
    use crate::service::pipeline::tests::{Fixture, IMAGE, token};
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn router(fixture: &Fixture, runner: Arc<RecordingRunner>) -> Router {
        create_router(AppState {
            pipeline: Arc::new(fixture.pipeline(runner)),
        })
    }

    async fn send(app: Router, uri: &str, host: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .uri(uri)
            .header(header::HOST, host)
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    fn message(body: &[u8]) -> serde_json::Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let fixture = Fixture::new();
        let app = router(&fixture, Arc::new(RecordingRunner::new()));

        let (status, body) = send(app, "/deploy/ping", "anything.example").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"pong");
    }

    #[tokio::test]
    async fn test_deploy_success() {
        let fixture = Fixture::new();
        let runner = Arc::new(RecordingRunner::new());
        let app = router(&fixture, runner.clone());

        let uri = format!("/deploy/{}", token("barong", IMAGE));
        let (status, body) = send(app, &uri, "example.org:8080").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            message(&body),
            serde_json::json!({ "message": format!("service barong updated with image {IMAGE}") })
        );
        assert_eq!(runner.commands().len(), 2);
    }

    #[tokio::test]
    async fn test_deploy_invalid_token() {
        let fixture = Fixture::new();
        let app = router(&fixture, Arc::new(RecordingRunner::new()));

        let (status, body) = send(app, "/deploy/anything", "example.org").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message(&body), serde_json::json!({ "message": "invalid token" }));
    }

    #[tokio::test]
    async fn test_deploy_unknown_host() {
        let fixture = Fixture::new();
        let app = router(&fixture, Arc::new(RecordingRunner::new()));

        let uri = format!("/deploy/{}", token("barong", IMAGE));
        let (status, body) = send(app, &uri, "other.example").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            message(&body),
            serde_json::json!({ "message": "unknown domain other.example" })
        );
    }

    #[tokio::test]
    async fn test_deploy_image_not_found() {
        let fixture = Fixture::new();
        let app = router(
            &fixture,
            Arc::new(RecordingRunner::new().failing("docker image")),
        );

        let uri = format!("/deploy/{}", token("barong", IMAGE));
        let (status, body) = send(app, &uri, "example.org").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(message(&body), serde_json::json!({ "message": "invalid image" }));
    }
}
