//! Welcome, health and fallback handlers.

use axum::extract::State;
use axum::http::Uri;
use axum::Json;
use chrono::Utc;

use crate::http::error::AppError;
use crate::state::AppState;

/// GET / - Welcome message.
pub async fn welcome() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Welcome to the Playground API",
    }))
}

/// GET /health - Liveness plus the open chat sessions.
///
/// `oldest_session_age_secs` is null when no session is open.
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let oldest_session_age_secs = state
        .sessions
        .iter()
        .map(|entry| *entry.value())
        .min()
        .map(|opened| (Utc::now() - opened).num_seconds());

    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "backend": state.backend.name(),
        "active_sessions": state.sessions.len(),
        "oldest_session_age_secs": oldest_session_age_secs,
    }))
}

/// Any unmatched path.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
