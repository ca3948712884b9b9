use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockbook_core::{message, DomainError};

/// Maps a domain failure onto the HTTP surface. The carried message is the
/// response body verbatim, except for `Unavailable`: its internals stay in
/// the logs and clients get the generic server-failure body.
pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::InvalidOperation(msg) => {
            json_error(StatusCode::FORBIDDEN, "invalid_operation", msg)
        }
        DomainError::Unavailable(detail) => {
            tracing::error!(%detail, "storage unavailable");
            json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                message::SERVER_ERROR,
            )
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
