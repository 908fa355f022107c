//! JSON response helpers for the HTTP API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

/// Wraps a payload in a 200 JSON response.
pub fn api_success<T: Serialize>(payload: T) -> Response {
    Json(payload).into_response()
}

/// A bare `{"status":"ok"}` response.
pub fn api_ok() -> Response {
    api_success(json!({ "status": "ok" }))
}

/// An error response with a machine-readable code.
pub fn api_error(status: StatusCode, code: &str, err: impl std::fmt::Display) -> Response {
    (
        status,
        Json(json!({ "error": err.to_string(), "code": code })),
    )
        .into_response()
}

/// A `{"message": ...}` response with the given status.
///
/// The action endpoints use this for their fixed success messages.
pub fn api_message(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}
