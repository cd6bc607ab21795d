use axum::routing::{get, post};
use axum::Router;

use crate::handlers::printer;
use crate::state::AppState;

/// Routes mounted at `/printer`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(printer::status))
        .route("/pause", post(printer::pause))
        .route("/resume", post(printer::resume))
        .route("/light", post(printer::light))
}
