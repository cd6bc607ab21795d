//! Completes printing jobs from printer telemetry.

use std::sync::Arc;

use chrono::Utc;
use printloop_core::job::{FailureKind, Job, JobStatus, JobUpdate};
use printloop_core::printer::{PrinterSnapshot, PrinterState};
use printloop_core::types::JobId;
use printloop_store::JobStore;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Watches snapshot changes and finishes the PRINTING job.
///
/// A finished or failed printer state only counts once the printer has
/// been seen working on the tracked job; before that it describes the
/// previous print.
pub struct PrintMonitor {
    store: Arc<JobStore>,
    snapshots: watch::Receiver<PrinterSnapshot>,
    tracked: Option<JobId>,
    seen_active: bool,
}

impl PrintMonitor {
    pub fn new(store: Arc<JobStore>, snapshots: watch::Receiver<PrinterSnapshot>) -> Self {
        Self {
            store,
            snapshots,
            tracked: None,
            seen_active: false,
        }
    }

    /// Apply one snapshot. Returns the job if it reached a terminal status.
    pub async fn observe(&mut self, snapshot: &PrinterSnapshot) -> Option<Job> {
        let Some(job) = self.store.find_printing().await else {
            self.tracked = None;
            self.seen_active = false;
            return None;
        };

        if self.tracked != Some(job.id) {
            self.tracked = Some(job.id);
            self.seen_active = false;
        }

        if snapshot.state.is_active() {
            self.seen_active = true;
            return None;
        }
        if !self.seen_active {
            return None;
        }

        let now = Utc::now();
        let (to, update) = match snapshot.state {
            PrinterState::Finished => (
                JobStatus::Completed,
                JobUpdate {
                    progress: Some(100),
                    print_ended_at: Some(now),
                    ..Default::default()
                },
            ),
            PrinterState::Failed | PrinterState::Error => {
                let mut update = JobUpdate::failure(
                    FailureKind::Printer,
                    format!("printer reported {}", snapshot.state),
                );
                update.print_ended_at = Some(now);
                (JobStatus::Failed, update)
            }
            _ => return None,
        };

        match self.store.transition(job.id, JobStatus::Printing, to, update).await {
            Ok(job) => {
                tracing::info!(job_id = %job.id, status = %job.status, "Print finished");
                self.tracked = None;
                self.seen_active = false;
                Some(job)
            }
            Err(e) => {
                tracing::debug!(job_id = %job.id, error = %e, "Print outcome not recorded");
                None
            }
        }
    }

    /// Run until `cancel` fires or the snapshot owner goes away.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!("Print monitor started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = self.snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = self.snapshots.borrow_and_update().clone();
                    self.observe(&snapshot).await;
                }
            }
        }
        tracing::info!("Print monitor stopped");
    }
}
