//! Deploy API Handler

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Uri, header},
};

use crate::api::AppState;
use crate::api::response::DeployReply;

/// GET /deploy/{token}
/// Verify the token and redeploy the service it names
pub async fn deploy(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    uri: Uri,
) -> DeployReply {
    let hostname = request_hostname(&headers, &uri);
    tracing::debug!("Deploy request for host '{}'", hostname);

    // Pull and compose block for as long as they take
    let pipeline = state.pipeline.clone();
    let outcome =
        tokio::task::spawn_blocking(move || pipeline.handle(&token, &hostname)).await;

    match outcome {
        Ok(result) => DeployReply(result),
        Err(e) => {
            tracing::error!("Deploy pipeline aborted: {}", e);
            DeployReply::internal_error()
        }
    }
}

/// Hostname the request was addressed to, port stripped
fn request_hostname(headers: &HeaderMap, uri: &Uri) -> String {
    headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(strip_port)
        .or_else(|| uri.host().map(String::from))
        .unwrap_or_default()
}

fn strip_port(authority: &str) -> String {
    // [::1]:8080
    if let Some(rest) = authority.strip_prefix('[') {
        if let Some((host, _)) = rest.split_once(']') {
            return host.to_string();
        }
    }

    match authority.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
            host.to_string()
        }
        _ => authority.to_string(),
    }
}
