//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use uuid::Uuid;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// No route matches the request path.
    NotFound(String),
    /// `/chat` was requested without a valid WebSocket handshake.
    UpgradeRequired(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(path) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("No route for {path}"),
            ),
            AppError::UpgradeRequired(reason) => (
                StatusCode::UPGRADE_REQUIRED,
                "WEBSOCKET_UPGRADE_REQUIRED",
                reason.clone(),
            ),
        };

        let body = json!({
            "data": null,
            "meta": {
                "request_id": Uuid::now_v7().to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
