//! Readiness-gated print start and print cancellation.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use printloop_core::error::CoreError;
use printloop_core::job::{FailureKind, Job, JobStatus, JobUpdate};
use printloop_core::printer::PrinterState;
use printloop_core::types::JobId;
use printloop_printer::commands::PrintOptions;
use printloop_printer::{PrinterCommand, PrinterStateSync};
use printloop_store::JobStore;
use tokio::sync::Mutex;

pub struct PrintDispatcher {
    store: Arc<JobStore>,
    printer: Arc<PrinterStateSync>,
    /// Held for a whole dispatch so two starts cannot both pass the
    /// occupancy check.
    dispatch: Mutex<()>,
}

impl PrintDispatcher {
    pub fn new(store: Arc<JobStore>, printer: Arc<PrinterStateSync>) -> Self {
        Self {
            store,
            printer,
            dispatch: Mutex::new(()),
        }
    }

    /// Upload a READY job's artifact and start printing it.
    ///
    /// All preconditions are checked before the job is touched: it must
    /// be READY with an artifact, no other job may be uploading or
    /// printing, and the printer must be ready. Once uploading has begun,
    /// any failure moves the job to FAILED and is also returned to the
    /// caller.
    ///
    /// Dispatches are serialized. Telemetry lags behind a print start, so
    /// the snapshot alone cannot tell that the printer was just taken.
    pub async fn start_print(&self, id: JobId, options: PrintOptions) -> Result<Job, CoreError> {
        let _dispatch = self.dispatch.lock().await;

        let job = self.store.get(id).await?;
        if job.status != JobStatus::Ready {
            return Err(CoreError::InvalidTransition {
                id,
                from: job.status,
                to: JobStatus::Uploading,
            });
        }
        let artifact = job
            .artifact_path
            .clone()
            .ok_or_else(|| CoreError::Internal(format!("job {id} is ready without an artifact")))?;

        if let Some(holder) = self.store.find_holding_printer().await {
            tracing::info!(job_id = %id, holder = %holder.id, status = %holder.status, "Printer already taken");
            let state = match holder.status {
                JobStatus::Uploading => PrinterState::Preparing,
                _ => PrinterState::Running,
            };
            return Err(CoreError::PrinterBusy(state));
        }

        self.printer.ensure_ready()?;

        self.store
            .transition(id, JobStatus::Ready, JobStatus::Uploading, JobUpdate::default())
            .await?;

        match self.upload_and_start(id, &artifact, options).await {
            Ok(job) => Ok(job),
            Err((kind, e)) => {
                tracing::error!(job_id = %id, error = %e, "Print dispatch failed");
                self.fail(id, kind, &e).await;
                Err(e)
            }
        }
    }

    async fn upload_and_start(
        &self,
        id: JobId,
        artifact: &Path,
        options: PrintOptions,
    ) -> Result<Job, (FailureKind, CoreError)> {
        let bytes = tokio::fs::read(artifact).await.map_err(|e| {
            (
                FailureKind::Internal,
                CoreError::Internal(format!("could not read artifact {}: {e}", artifact.display())),
            )
        })?;
        let file_name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{id}.3mf"));

        let ack = self
            .printer
            .upload(bytes, &file_name)
            .await
            .map_err(|e| (FailureKind::Transport, e))?;

        let job = self
            .store
            .transition(
                id,
                JobStatus::Uploading,
                JobStatus::Printing,
                JobUpdate {
                    printer_job_ref: Some(ack.remote_name.clone()),
                    print_started_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| (FailureKind::Internal, e))?;

        self.printer
            .issue_command(PrinterCommand::PrintStart {
                file_name: ack.remote_name,
                options,
            })
            .await
            .map_err(|e| (FailureKind::Transport, e))?;

        Ok(job)
    }

    /// Stop the printer and cancel a PRINTING job.
    ///
    /// The job is only marked cancelled once the stop command went
    /// through; if it fails the job stays PRINTING and the error is
    /// returned.
    pub async fn cancel_print(&self, id: JobId) -> Result<Job, CoreError> {
        let job = self.store.get(id).await?;
        if job.status != JobStatus::Printing {
            return Err(CoreError::InvalidTransition {
                id,
                from: job.status,
                to: JobStatus::Cancelled,
            });
        }

        self.printer.issue_command(PrinterCommand::Stop).await?;

        self.store
            .transition(
                id,
                JobStatus::Printing,
                JobStatus::Cancelled,
                JobUpdate {
                    print_ended_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await
    }

    async fn fail(&self, id: JobId, kind: FailureKind, error: &CoreError) {
        let current = match self.store.get(id).await {
            Ok(job) if !job.status.is_terminal() => job.status,
            _ => return,
        };
        if let Err(e) = self
            .store
            .transition(id, current, JobStatus::Failed, JobUpdate::failure(kind, error.to_string()))
            .await
        {
            tracing::warn!(job_id = %id, error = %e, "Could not record dispatch failure");
        }
    }
}
