//! HTTP-level tests for the `/printer` resource.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, post_empty, post_json};
use printloop_printer::PrinterCommand;

#[tokio::test]
async fn status_reports_snapshot_and_readiness() {
    let (app, ctx) = common::build_test_app();

    let response = get(app.clone(), "/api/v1/printer/status").await;
    assert_eq!(response.status(), StatusCode::OK);
    let status = body_json(response).await["data"].clone();
    assert_eq!(status["connected"], false);
    assert_eq!(status["state"], "unknown");
    assert_eq!(status["ready"], false);

    ctx.printer_reports("IDLE").await;
    ctx.printer.on_telemetry(br#"{"print":{"nozzle_temper":212.5}}"#);

    let status = body_json(get(app, "/api/v1/printer/status").await).await["data"].clone();
    assert_eq!(status["connected"], true);
    assert_eq!(status["state"], "idle");
    assert_eq!(status["ready"], true);
    assert_eq!(status["temperatures"]["nozzle"], 212.5);
}

#[tokio::test]
async fn commands_need_a_connection() {
    let (app, ctx) = common::build_test_app();

    let response = post_empty(app, "/api/v1/printer/pause").await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "NOT_CONNECTED");
    assert!(ctx.transport.published.lock().unwrap().is_empty());
}

#[tokio::test]
async fn controls_are_forwarded_without_touching_the_snapshot() {
    let (app, ctx) = common::build_test_app();
    ctx.printer_reports("RUNNING").await;

    let response = post_empty(app.clone(), "/api/v1/printer/pause").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["command"], "pause");

    post_empty(app.clone(), "/api/v1/printer/resume").await;
    let response = post_json(app, "/api/v1/printer/light", serde_json::json!({"on": true})).await;
    assert_eq!(response.status(), StatusCode::OK);

    let published = ctx.transport.published.lock().unwrap().clone();
    assert_eq!(
        published[1..],
        [
            PrinterCommand::Pause,
            PrinterCommand::Resume,
            PrinterCommand::SetLight { on: true },
        ]
    );
    assert_eq!(ctx.printer.snapshot().state.as_str(), "running");
}
