//! Route handlers for the admin API.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use solo_core::{
    negotiate, Caller, ControllerError, Disposition, EditView, FieldData, Negotiated, Operation,
    OperationOutcome, RequestContext,
};
use solo_storage::Stage;

use super::json_error;
use super::state::{AppState, Controller};

/// Body of `save` and `publish`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SaveRequest {
    #[serde(default)]
    pub(crate) fields: FieldData,
    /// Draft version the form was rendered from.
    #[serde(default)]
    pub(crate) expected_version: Option<u64>,
}

/// Body of `rollback`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RollbackRequest {
    /// Omit to revert to the published version.
    #[serde(default)]
    pub(crate) version: Option<u64>,
}

fn edit_url(section: &str) -> String {
    format!("/admin/{section}")
}

fn request_context(headers: &HeaderMap, query: &HashMap<String, String>) -> RequestContext {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    RequestContext::detect(
        header("x-requested-with"),
        query.get("ajax").map(String::as_str),
        header("x-pjax"),
    )
}

fn lookup<'a>(state: &'a AppState, section: &str) -> Result<&'a Controller, Response> {
    state.controller(section).ok_or_else(|| {
        json_error(
            StatusCode::NOT_FOUND,
            &format!("section '{}' not found", section),
        )
        .into_response()
    })
}

/// Turn a negotiated shape and its JSON body into an HTTP response.
fn render(negotiated: &Negotiated, body: serde_json::Value) -> Response {
    let status =
        StatusCode::from_u16(negotiated.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, Json(body)).into_response();
    for (name, value) in &negotiated.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            response.headers_mut().insert(name, value);
        }
    }
    response
}

fn error_body(negotiated: &Negotiated, err: &ControllerError, section: &str) -> serde_json::Value {
    match (&negotiated.disposition, err) {
        (Disposition::Fragment { fragment }, ControllerError::ValidationFailed(errors)) => {
            serde_json::json!({
                "fragment": fragment,
                "message": negotiated.message,
                "errors": errors,
            })
        }
        (Disposition::RedirectBack { location }, _) => serde_json::json!({ "redirect": location }),
        (Disposition::ReadOnly, _) => serde_json::json!({
            "message": negotiated.message,
            "view": EditView::empty(section),
        }),
        _ => serde_json::json!({ "error": negotiated.message }),
    }
}

fn view_body(negotiated: &Negotiated, view: &EditView) -> serde_json::Value {
    let fragment = match &negotiated.disposition {
        Disposition::Fragment { fragment } => Some(*fragment),
        _ => None,
    };
    serde_json::json!({
        "message": negotiated.message,
        "fragment": fragment,
        "view": view,
    })
}

/// Negotiate a finished operation and render the edit view behind it.
async fn respond(
    controller: &Controller,
    caller: &Caller,
    ctx: &RequestContext,
    operation: Operation,
    result: Result<OperationOutcome, ControllerError>,
) -> Response {
    let section = controller.section().name.clone();
    let url = edit_url(&section);
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            let negotiated = negotiate(ctx, operation, Err(&err), &url);
            return render(&negotiated, error_body(&negotiated, &err, &section));
        }
    };

    let negotiated = negotiate(ctx, operation, Ok(&outcome.message), &url);
    match controller.edit_view(caller).await {
        Ok(view) => render(&negotiated, view_body(&negotiated, &view)),
        Err(err) => {
            let negotiated = negotiate(ctx, Operation::Edit, Err(&err), &url);
            render(&negotiated, error_body(&negotiated, &err, &section))
        }
    }
}

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// GET /permissions
pub(crate) async fn handle_permissions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = serde_json::json!({ "permissions": state.permissions });
    (StatusCode::OK, Json(response))
}

/// GET /admin/{section}
pub(crate) async fn handle_edit(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(section): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let controller = match lookup(&state, &section) {
        Ok(c) => c,
        Err(response) => return response,
    };
    let ctx = request_context(&headers, &query);
    let url = edit_url(&section);

    match controller.edit_view(&caller).await {
        Ok(view) => {
            let negotiated = negotiate(&ctx, Operation::Edit, Ok(""), &url);
            let mut response = render(&negotiated, view_body(&negotiated, &view));
            if let Some(etag) = view
                .etag
                .as_deref()
                .and_then(|e| HeaderValue::from_str(&format!("\"{e}\"")).ok())
            {
                response.headers_mut().insert(axum::http::header::ETAG, etag);
            }
            response
        }
        Err(err) => {
            let negotiated = negotiate(&ctx, Operation::Edit, Err(&err), &url);
            render(&negotiated, error_body(&negotiated, &err, &section))
        }
    }
}

async fn save_or_publish(
    state: &AppState,
    caller: &Caller,
    section: &str,
    ctx: &RequestContext,
    request: SaveRequest,
    publish: bool,
) -> Response {
    let controller = match lookup(state, section) {
        Ok(c) => c,
        Err(response) => return response,
    };
    let result = controller
        .save(caller, &request.fields, publish, request.expected_version)
        .await;
    let operation = if publish {
        Operation::Publish
    } else {
        Operation::Save
    };
    respond(controller, caller, ctx, operation, result).await
}

/// POST /admin/{section}/save
pub(crate) async fn handle_save(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(section): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(request): Json<SaveRequest>,
) -> Response {
    let ctx = request_context(&headers, &query);
    save_or_publish(&state, &caller, &section, &ctx, request, false).await
}

/// POST /admin/{section}/publish
pub(crate) async fn handle_publish(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(section): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(request): Json<SaveRequest>,
) -> Response {
    let ctx = request_context(&headers, &query);
    save_or_publish(&state, &caller, &section, &ctx, request, true).await
}

/// POST /admin/{section}/unpublish
pub(crate) async fn handle_unpublish(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(section): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let controller = match lookup(&state, &section) {
        Ok(c) => c,
        Err(response) => return response,
    };
    let ctx = request_context(&headers, &query);
    let result = controller.unpublish(&caller).await;
    respond(controller, &caller, &ctx, Operation::Unpublish, result).await
}

/// POST /admin/{section}/rollback
pub(crate) async fn handle_rollback(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(section): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(request): Json<RollbackRequest>,
) -> Response {
    let controller = match lookup(&state, &section) {
        Ok(c) => c,
        Err(response) => return response,
    };
    let ctx = request_context(&headers, &query);
    let result = controller.rollback(&caller, request.version).await;
    respond(controller, &caller, &ctx, Operation::Rollback, result).await
}

/// GET /admin/{section}/versions
pub(crate) async fn handle_versions(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(section): Path<String>,
) -> Response {
    let controller = match lookup(&state, &section) {
        Ok(c) => c,
        Err(response) => return response,
    };
    match controller.history(&caller).await {
        Ok(versions) => {
            let response = serde_json::json!({ "versions": versions });
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => {
            let negotiated = negotiate(
                &RequestContext::default(),
                Operation::History,
                Err(&err),
                &edit_url(&section),
            );
            render(&negotiated, serde_json::json!({ "error": negotiated.message }))
        }
    }
}

/// `stage=Stage` (or `draft`) previews Draft; `stage=Live` (or `live`) previews Live.
fn parse_stage(value: Option<&str>) -> Option<Stage> {
    match value.map(str::to_ascii_lowercase).as_deref() {
        None | Some("stage") | Some("draft") => Some(Stage::Draft),
        Some("live") => Some(Stage::Live),
        Some(_) => None,
    }
}

/// GET /admin/{section}/preview?stage=Stage|Live
pub(crate) async fn handle_preview(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(section): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let controller = match lookup(&state, &section) {
        Ok(c) => c,
        Err(response) => return response,
    };
    let stage = match parse_stage(query.get("stage").map(String::as_str)) {
        Some(stage) => stage,
        None => {
            return json_error(StatusCode::BAD_REQUEST, "stage must be Stage or Live")
                .into_response()
        }
    };
    match controller.read_stage(&caller, stage).await {
        Ok(Some(record)) => {
            let response = serde_json::json!({ "stage": stage, "record": record });
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(None) => json_error(
            StatusCode::NOT_FOUND,
            &format!("record is not on the {} stage", stage),
        )
        .into_response(),
        Err(err) => {
            let negotiated = negotiate(
                &RequestContext::default(),
                Operation::Edit,
                Err(&err),
                &edit_url(&section),
            );
            render(&negotiated, serde_json::json!({ "error": negotiated.message }))
        }
    }
}
