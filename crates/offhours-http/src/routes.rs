//! Route handlers

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use offhours_api::Status;
use offhours_core::{CoreResult, ManagerHandle};
use serde_json::json;
use tracing::warn;

/// Build the scheduler router around a manager handle
pub fn router(handle: ManagerHandle) -> Router {
    Router::new()
        .route("/scheduler/status", get(status))
        .route("/scheduler/extend", get(extend))
        .route("/health", get(health))
        .with_state(handle)
}

fn error_response(msg: &str, status: StatusCode) -> Response {
    (status, Json(json!({ "error": msg }))).into_response()
}

fn status_response(result: CoreResult<Status>) -> Response {
    match result {
        Ok(status) => ([(header::CACHE_CONTROL, "no-cache")], Json(status)).into_response(),
        Err(e) => {
            warn!(error = %e, "Status unavailable");
            error_response(&e.to_string(), StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// GET /scheduler/status
async fn status(State(handle): State<ManagerHandle>) -> Response {
    status_response(handle.status().await)
}

/// GET /scheduler/extend
async fn extend(State(handle): State<ManagerHandle>) -> Response {
    status_response(handle.extend().await)
}

/// GET /health
async fn health(State(handle): State<ManagerHandle>) -> Response {
    if handle.is_closed() {
        error_response("Scheduler manager has stopped", StatusCode::SERVICE_UNAVAILABLE)
    } else {
        Json(json!({ "status": "ok" })).into_response()
    }
}
