//! HTTP middleware: caller authentication.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use super::state::AppState;

/// Resolve the calling identity from its API token.
///
/// Every request except /health must carry either `Authorization: Bearer
/// <token>` or `X-API-Key: <token>`. The resolved [`solo_core::Caller`] is
/// stored as a request extension.
pub(crate) async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    // /health is exempt from auth (for load balancer health checks)
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let bearer = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let api_key = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok());

    let token = match bearer.or(api_key) {
        Some(token) => token.to_string(),
        None => {
            return super::json_error(StatusCode::UNAUTHORIZED, "authentication required")
                .into_response()
        }
    };

    match state.caller_for_token(&token) {
        Some(caller) => {
            debug!(caller = %caller.id, path = %request.uri().path(), "authenticated");
            request.extensions_mut().insert(caller.clone());
            next.run(request).await
        }
        None => super::json_error(StatusCode::FORBIDDEN, "invalid API key").into_response(),
    }
}
