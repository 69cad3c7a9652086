//! Consistent error responses in the envelope shape.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use remitdesk_core::DomainError;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "message": message.into(),
            "error": code,
        })),
    )
        .into_response()
}

pub fn authentication_error(message: impl Into<String>) -> Response {
    json_error(StatusCode::UNAUTHORIZED, "authentication_error", message)
}

pub fn authorization_error(message: impl Into<String>) -> Response {
    json_error(StatusCode::FORBIDDEN, "authorization_error", message)
}

pub fn validation_error(message: impl Into<String>) -> Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

pub fn not_found(message: impl Into<String>) -> Response {
    json_error(StatusCode::NOT_FOUND, "not_found", message)
}

/// Map a domain failure onto status + envelope.
///
/// Internal detail is surfaced only in debug builds; release builds return
/// a generic message and leave the specifics to the logs.
pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Authentication(msg) => authentication_error(msg),
        DomainError::Authorization(msg) => authorization_error(msg),
        DomainError::Validation(msg) => validation_error(msg),
        DomainError::StateTransition { .. } => json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "state_transition_error",
            err.to_string(),
        ),
        DomainError::NotFound(msg) => not_found(msg),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::Internal(msg) => {
            tracing::error!(error = %msg, "internal error");
            let message = if cfg!(debug_assertions) {
                format!("internal error: {msg}")
            } else {
                "internal error".to_string()
            };
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
        }
    }
}
