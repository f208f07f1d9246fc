use axum::{response::IntoResponse, Json};

/// Failure taxonomy for the support subsystem. Every externally visible
/// failure carries its kind so callers can decide retry vs. fallback.
#[derive(Debug, thiserror::Error)]
pub enum SupportError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invalid transition: {0}")]
    Transition(String),
    #[error("Transport error: {0}")]
    Transport(String),
    /// Unreachable from the default quick-response renderer, which leaves
    /// unresolved tokens literal; kept for callers that render strictly.
    #[error("Template error: {0}")]
    Template(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for SupportError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Transition(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::Transport(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            Self::Template(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
