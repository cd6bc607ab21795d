//! `AppError` to HTTP response mapping.
//!
//! Calls `IntoResponse` directly; no server needed.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use printloop_api::error::AppError;
use printloop_core::error::CoreError;
use printloop_core::job::JobStatus;
use printloop_core::printer::PrinterState;
use printloop_core::types::JobId;

async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn domain_errors_map_to_status_and_code() {
    let id = JobId::nil();
    let cases = [
        (CoreError::Validation("bad".into()), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        (CoreError::NotFound(id), StatusCode::NOT_FOUND, "NOT_FOUND"),
        (
            CoreError::InvalidTransition {
                id,
                from: JobStatus::Ready,
                to: JobStatus::Cancelled,
            },
            StatusCode::CONFLICT,
            "INVALID_TRANSITION",
        ),
        (CoreError::Conflict("printing".into()), StatusCode::CONFLICT, "CONFLICT"),
        (CoreError::PrinterBusy(PrinterState::Running), StatusCode::CONFLICT, "PRINTER_BUSY"),
        (CoreError::PrinterOffline, StatusCode::SERVICE_UNAVAILABLE, "PRINTER_OFFLINE"),
        (CoreError::NotConnected, StatusCode::SERVICE_UNAVAILABLE, "NOT_CONNECTED"),
        (CoreError::Transport("timeout".into()), StatusCode::BAD_GATEWAY, "TRANSPORT_ERROR"),
        (CoreError::Upstream("expired".into()), StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
        (
            CoreError::Conversion("degenerate".into()),
            StatusCode::UNPROCESSABLE_ENTITY,
            "CONVERSION_ERROR",
        ),
    ];

    for (err, status, code) in cases {
        let label = err.to_string();
        let (got_status, json) = error_to_response(AppError::Core(err)).await;
        assert_eq!(got_status, status, "{label}");
        assert_eq!(json["code"], code, "{label}");
        assert!(json["error"].is_string());
    }
}

#[tokio::test]
async fn busy_message_names_the_printer_state() {
    let (_, json) = error_to_response(AppError::Core(CoreError::PrinterBusy(PrinterState::Paused))).await;
    assert_eq!(json["error"], "Printer is busy (paused)");
}

#[tokio::test]
async fn internal_errors_are_sanitized() {
    let (status, json) =
        error_to_response(AppError::Core(CoreError::Internal("artifact path /srv/x".into()))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");

    let (status, json) = error_to_response(AppError::InternalError("secret".into())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn bad_request_keeps_its_message() {
    let (status, json) = error_to_response(AppError::BadRequest("pick one unit".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "pick one unit");
}
