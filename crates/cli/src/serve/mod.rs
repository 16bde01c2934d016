//! `solo serve` -- HTTP admin API for single-record sections.
//!
//! Endpoints:
//! - GET  /health                        - Server status (exempt from auth)
//! - GET  /permissions                   - Permission codes provided by sections
//! - GET  /admin/{section}               - Edit view with available actions
//! - POST /admin/{section}/save          - Save field data to Draft
//! - POST /admin/{section}/publish       - Save and publish to Live
//! - POST /admin/{section}/unpublish     - Remove the Live copy
//! - POST /admin/{section}/rollback      - Revert Draft to a version or to Live
//! - GET  /admin/{section}/versions      - Version history
//! - GET  /admin/{section}/preview       - Record on the Draft or Live stage
//!
//! Every operation response carries the outcome message in `X-Status`.

mod handlers;
mod middleware;
pub(crate) mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use self::handlers::{
    handle_edit, handle_health, handle_not_found, handle_permissions, handle_preview,
    handle_publish, handle_rollback, handle_save, handle_unpublish, handle_versions,
};
use self::middleware::auth_middleware;
use self::state::AppState;
use crate::config::SoloConfig;

/// Maximum request body size: 1 MB.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

pub(crate) fn build_router(state: Arc<AppState>) -> Router {
    // CORS: permissive for local admin tooling
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .expose_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/permissions", get(handle_permissions))
        .route("/admin/{section}", get(handle_edit))
        .route("/admin/{section}/save", post(handle_save))
        .route("/admin/{section}/publish", post(handle_publish))
        .route("/admin/{section}/unpublish", post(handle_unpublish))
        .route("/admin/{section}/rollback", post(handle_rollback))
        .route("/admin/{section}/versions", get(handle_versions))
        .route("/admin/{section}/preview", get(handle_preview))
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Start the HTTP server and run until Ctrl+C.
pub async fn start_server(
    config: SoloConfig,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::from_config(&config).await?);
    if state.tokens.is_empty() {
        warn!("no caller tokens configured; every admin request will be rejected");
    }
    for name in state.controllers.keys() {
        info!(section = %name, "serving section");
    }

    let app = build_router(state);
    let addr = format!("{}:{}", config.server.bind, port.unwrap_or(config.server.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("solo listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received shutdown signal"),
        Err(e) => warn!(error = %e, "failed to listen for Ctrl+C"),
    }
}
