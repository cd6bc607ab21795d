use std::sync::Arc;

use printloop_events::EventBus;
use printloop_pipeline::JobService;
use printloop_printer::PrinterStateSync;

use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheap to clone: everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub jobs: Arc<JobService>,
    pub printer: Arc<PrinterStateSync>,
    pub events: Arc<EventBus>,
}
