//! Handlers for the `/printer` resource.
//!
//! Commands are forwarded as-is; the snapshot only changes once the
//! printer reports back over telemetry.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use printloop_core::printer::PrinterSnapshot;
use printloop_printer::PrinterCommand;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PrinterStatus {
    #[serde(flatten)]
    pub snapshot: PrinterSnapshot,
    /// Whether a new print would be accepted right now.
    pub ready: bool,
}

#[derive(Debug, Serialize)]
pub struct CommandAccepted {
    pub command: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct LightRequest {
    pub on: bool,
}

/// GET /api/v1/printer/status
pub async fn status(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let snapshot = state.printer.snapshot();
    let ready = snapshot.is_ready();
    Ok(Json(DataResponse {
        data: PrinterStatus { snapshot, ready },
    }))
}

/// POST /api/v1/printer/pause
pub async fn pause(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    send(&state, PrinterCommand::Pause).await
}

/// POST /api/v1/printer/resume
pub async fn resume(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    send(&state, PrinterCommand::Resume).await
}

/// POST /api/v1/printer/light
pub async fn light(
    State(state): State<AppState>,
    Json(input): Json<LightRequest>,
) -> AppResult<impl IntoResponse> {
    send(&state, PrinterCommand::SetLight { on: input.on }).await
}

async fn send(state: &AppState, command: PrinterCommand) -> AppResult<Json<DataResponse<CommandAccepted>>> {
    let kind = command.kind();
    state.printer.issue_command(command).await?;
    Ok(Json(DataResponse {
        data: CommandAccepted { command: kind },
    }))
}
