//! Background service that mirrors job events into the tracing log.

use tokio::sync::broadcast;

use crate::bus::JobEvent;

/// Subscribes to the bus and logs every event at `info`.
pub struct EventLog;

impl EventLog {
    /// Run until the bus is dropped.
    pub async fn run(mut receiver: broadcast::Receiver<JobEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    tracing::info!(
                        job_id = %event.job_id,
                        event_type = %event.event_type,
                        status = ?event.status,
                        progress = event.progress,
                        "Job event"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event log lagged, some events were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, event log shutting down");
                    break;
                }
            }
        }
    }
}
