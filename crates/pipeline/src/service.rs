//! The job operations offered to the outer API layer.

use std::sync::Arc;

use printloop_core::error::CoreError;
use printloop_core::job::{Job, JobSpec, JobStatus};
use printloop_core::types::JobId;
use printloop_printer::commands::PrintOptions;
use printloop_store::JobStore;

use crate::conversion::discard_artifact;
use crate::coordinator::GenerationCoordinator;
use crate::dispatcher::PrintDispatcher;

pub struct JobService {
    store: Arc<JobStore>,
    coordinator: Arc<GenerationCoordinator>,
    dispatcher: Arc<PrintDispatcher>,
}

impl JobService {
    pub fn new(
        store: Arc<JobStore>,
        coordinator: Arc<GenerationCoordinator>,
        dispatcher: Arc<PrintDispatcher>,
    ) -> Self {
        Self {
            store,
            coordinator,
            dispatcher,
        }
    }

    /// Create a job and start generating it in the background.
    pub async fn create_job(&self, spec: JobSpec) -> Result<Job, CoreError> {
        let job = self.store.create(spec).await?;
        self.coordinator.submit(job.id).await
    }

    pub async fn get_job(&self, id: JobId) -> Result<Job, CoreError> {
        self.store.get(id).await
    }

    pub async fn list_jobs(&self) -> Vec<Job> {
        self.store.list().await
    }

    /// Delete a job, stop its generation task and remove its artifact.
    pub async fn delete_job(&self, id: JobId) -> Result<(), CoreError> {
        let job = self.store.delete(id).await?;
        self.coordinator.forget(id).await;
        if let Some(artifact) = job.artifact_path {
            discard_artifact(&artifact).await;
        }
        Ok(())
    }

    pub async fn start_print(&self, id: JobId, options: PrintOptions) -> Result<Job, CoreError> {
        self.dispatcher.start_print(id, options).await
    }

    /// Cancel generation or printing, whichever the job is doing.
    pub async fn cancel_job(&self, id: JobId) -> Result<Job, CoreError> {
        let job = self.store.get(id).await?;
        match job.status {
            status if status.is_generating() => self.coordinator.cancel(id).await,
            JobStatus::Printing => self.dispatcher.cancel_print(id).await,
            from => Err(CoreError::InvalidTransition {
                id,
                from,
                to: JobStatus::Cancelled,
            }),
        }
    }

    pub fn coordinator(&self) -> &Arc<GenerationCoordinator> {
        &self.coordinator
    }
}
