use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use printloop_core::error::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Responses are `{"error": message, "code": CODE}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    let message = err.to_string();
    match err {
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", message),
        CoreError::InvalidTransition { .. } => (StatusCode::CONFLICT, "INVALID_TRANSITION", message),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::PrinterBusy(_) => (StatusCode::CONFLICT, "PRINTER_BUSY", message),
        CoreError::PrinterOffline => (StatusCode::SERVICE_UNAVAILABLE, "PRINTER_OFFLINE", message),
        CoreError::NotConnected => (StatusCode::SERVICE_UNAVAILABLE, "NOT_CONNECTED", message),
        CoreError::Transport(_) => (StatusCode::BAD_GATEWAY, "TRANSPORT_ERROR", message),
        CoreError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", message),
        CoreError::Conversion(_) => (StatusCode::UNPROCESSABLE_ENTITY, "CONVERSION_ERROR", message),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
