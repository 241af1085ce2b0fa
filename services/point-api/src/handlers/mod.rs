//! HTTP handlers for the point API.

pub mod air;
pub mod health;
pub mod map;

use axum::{
    http::{header, StatusCode},
    response::Response,
};
use serde::Serialize;

use aq_common::AqError;

/// Serialize a body as a JSON response with the given status.
pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(json.into())
        .unwrap()
}

/// Structured JSON error body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    json_response(
        status,
        &ErrorBody {
            error: message.to_string(),
        },
    )
}

/// Map an engine error onto its HTTP status.
pub(crate) fn aq_error_response(err: &AqError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    error_response(status, &err.to_string())
}
