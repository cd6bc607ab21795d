pub mod health;
pub mod jobs;
pub mod printer;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /jobs                          list, create
/// /jobs/{id}                     get, delete
/// /jobs/{id}/print               start print (POST)
/// /jobs/{id}/cancel              cancel generation or print (POST)
///
/// /printer/status                snapshot and readiness
/// /printer/pause                 pause (POST)
/// /printer/resume                resume (POST)
/// /printer/light                 chamber light (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/jobs", jobs::router())
        .nest("/printer", printer::router())
}

/// Long-lived streaming routes, mounted without the request timeout.
///
/// ```text
/// /jobs/events                   job event stream (SSE)
/// ```
pub fn stream_routes() -> Router<AppState> {
    Router::new().route("/jobs/events", get(handlers::events::job_events))
}
