//! Background generation driver.
//!
//! Each submitted job gets its own task, spawned under a supervisor. The
//! task runs the preview stage, then the refine stage, then conversion,
//! writing every step through [`JobStore::transition`]. A cancelled job
//! is finalised by the canceller; the task only notices at its next
//! checkpoint and stops without writing.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use printloop_core::error::CoreError;
use printloop_core::job::{FailureKind, Job, JobStatus, JobUpdate};
use printloop_core::types::JobId;
use printloop_meshy::{GenerationService, GenerationTask, TaskRequest, TaskStatus};
use printloop_store::JobStore;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::conversion::{discard_artifact, ConversionPipeline};

/// Default interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default wall-clock bound on one generation stage.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy)]
pub struct GenerationConfig {
    pub poll_interval: Duration,
    pub stage_timeout: Duration,
    /// Run mesh repair before scaling.
    pub auto_repair: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
            auto_repair: true,
        }
    }
}

/// Why a job task stopped before reaching READY.
#[derive(Debug)]
enum StageError {
    /// Cancelled, deleted, or moved on by someone else. No further writes.
    Stopped,
    Failed(FailureKind, String),
}

impl From<CoreError> for StageError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::NotFound(_) | CoreError::InvalidTransition { .. } => Self::Stopped,
            other => Self::Failed(FailureKind::Internal, other.to_string()),
        }
    }
}

/// One generation stage: which status it runs under and how its
/// reported percentage maps onto job progress.
struct Stage {
    status: JobStatus,
    request: TaskRequest,
    progress_base: u8,
}

impl Stage {
    fn job_progress(&self, task: &GenerationTask) -> u8 {
        self.progress_base + task.percent() / 2
    }

    fn record_task_id(&self, task_id: &str) -> JobUpdate {
        let mut update = JobUpdate::default();
        match self.request {
            TaskRequest::Preview { .. } => update.preview_task_id = Some(task_id.to_string()),
            TaskRequest::Refine { .. } => update.refine_task_id = Some(task_id.to_string()),
        }
        update
    }
}

pub struct GenerationCoordinator {
    store: Arc<JobStore>,
    generator: Arc<dyn GenerationService>,
    conversion: Arc<ConversionPipeline>,
    config: GenerationConfig,
    tasks: Mutex<HashMap<JobId, CancellationToken>>,
    shutdown: CancellationToken,
}

impl GenerationCoordinator {
    pub fn new(
        store: Arc<JobStore>,
        generator: Arc<dyn GenerationService>,
        conversion: Arc<ConversionPipeline>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            store,
            generator,
            conversion,
            config,
            tasks: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Move a pending job into GENERATING_PREVIEW and start its task.
    ///
    /// Returns as soon as the task is spawned.
    pub async fn submit(self: &Arc<Self>, id: JobId) -> Result<Job, CoreError> {
        let job = self
            .store
            .transition(id, JobStatus::Pending, JobStatus::GeneratingPreview, JobUpdate::default())
            .await?;

        let token = self.shutdown.child_token();
        self.tasks.lock().await.insert(id, token.clone());

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let worker = tokio::spawn({
                let this = Arc::clone(&this);
                let token = token.clone();
                async move { this.run_job(id, token).await }
            });

            if let Err(e) = worker.await {
                if e.is_panic() {
                    tracing::error!(job_id = %id, "Generation task panicked");
                    this.fail(id, &token, FailureKind::Internal, "generation task panicked".into())
                        .await;
                } else {
                    tracing::warn!(job_id = %id, error = %e, "Generation task aborted");
                }
            }
            this.tasks.lock().await.remove(&id);
        });

        Ok(job)
    }

    /// Cancel a job that is still generating.
    ///
    /// The job is moved to CANCELLED here, then its task is woken so it
    /// stops at the next checkpoint.
    pub async fn cancel(&self, id: JobId) -> Result<Job, CoreError> {
        loop {
            let current = self.store.get(id).await?;
            if !current.status.is_generating() {
                return Err(CoreError::InvalidTransition {
                    id,
                    from: current.status,
                    to: JobStatus::Cancelled,
                });
            }

            match self
                .store
                .transition(id, current.status, JobStatus::Cancelled, JobUpdate::default())
                .await
            {
                Ok(job) => {
                    if let Some(token) = self.tasks.lock().await.get(&id) {
                        token.cancel();
                    }
                    return Ok(job);
                }
                // The task advanced a stage between our read and the CAS.
                Err(CoreError::InvalidTransition { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Stop tracking a job, waking its task if one is running.
    pub async fn forget(&self, id: JobId) {
        if let Some(token) = self.tasks.lock().await.remove(&id) {
            token.cancel();
        }
    }

    /// Number of job tasks still running.
    pub async fn active_tasks(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Wake every job task so it stops at its next checkpoint.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    async fn run_job(&self, id: JobId, token: CancellationToken) {
        match self.drive(id, &token).await {
            Ok(()) => {}
            Err(StageError::Stopped) => {
                tracing::info!(job_id = %id, "Generation stopped");
            }
            Err(StageError::Failed(kind, message)) => {
                tracing::error!(job_id = %id, kind = ?kind, error = %message, "Generation failed");
                self.fail(id, &token, kind, message).await;
            }
        }
    }

    async fn drive(&self, id: JobId, token: &CancellationToken) -> Result<(), StageError> {
        let job = self.store.get(id).await?;

        let preview = self
            .run_stage(
                id,
                token,
                Stage {
                    status: JobStatus::GeneratingPreview,
                    request: TaskRequest::Preview {
                        prompt: job.prompt.clone(),
                        style: job.style,
                    },
                    progress_base: 0,
                },
            )
            .await?;

        self.checkpoint(id, JobStatus::GeneratingPreview, token).await?;
        self.store
            .transition(
                id,
                JobStatus::GeneratingPreview,
                JobStatus::GeneratingRefine,
                JobUpdate::progress(50),
            )
            .await?;

        let refine = self
            .run_stage(
                id,
                token,
                Stage {
                    status: JobStatus::GeneratingRefine,
                    request: TaskRequest::Refine {
                        preview_task_id: preview.id,
                    },
                    progress_base: 50,
                },
            )
            .await?;

        let model_url = refine.glb_url().map(str::to_string).ok_or_else(|| {
            StageError::Failed(
                FailureKind::UpstreamFailed,
                "refine task finished without a GLB model".into(),
            )
        })?;

        self.checkpoint(id, JobStatus::GeneratingRefine, token).await?;
        let result = self
            .conversion
            .convert(id, &model_url, job.target_size_mm, self.config.auto_repair)
            .await
            .map_err(|e| StageError::Failed(FailureKind::Conversion, e.to_string()))?;
        let artifact = result.artifact_path.clone();

        if let Err(e) = self.checkpoint(id, JobStatus::GeneratingRefine, token).await {
            discard_artifact(&artifact).await;
            return Err(e);
        }

        let mut update = result.into_update();
        update.progress = Some(100);
        update.model_url = Some(model_url);
        update.thumbnail_url = refine.thumbnail_url.or(preview.thumbnail_url);

        if let Err(e) = self
            .store
            .transition(id, JobStatus::GeneratingRefine, JobStatus::Ready, update)
            .await
        {
            discard_artifact(&artifact).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Create the stage's task and poll it until it finishes, fails, or
    /// the stage deadline passes.
    async fn run_stage(
        &self,
        id: JobId,
        token: &CancellationToken,
        stage: Stage,
    ) -> Result<GenerationTask, StageError> {
        let mode = stage.request.mode();
        self.checkpoint(id, stage.status, token).await?;

        // The deadline covers task creation and every poll call.
        let deadline = Instant::now() + self.config.stage_timeout;

        let task_id = self
            .bounded(deadline, token, self.generator.create(&stage.request))
            .await?
            .ok_or_else(|| self.timed_out(mode))?
            .map_err(|e| {
                StageError::Failed(
                    FailureKind::UpstreamFailed,
                    format!("could not create {mode} task: {e}"),
                )
            })?;
        tracing::info!(job_id = %id, mode, task_id = %task_id, "Generation task created");

        self.checkpoint(id, stage.status, token).await?;
        let mut progress = self
            .store
            .transition(id, stage.status, stage.status, stage.record_task_id(&task_id))
            .await?
            .progress;

        loop {
            let polled = self
                .bounded(deadline, token, self.generator.get(&task_id))
                .await?
                .ok_or_else(|| self.timed_out(mode))?;
            match polled {
                Ok(task) => {
                    self.checkpoint(id, stage.status, token).await?;
                    match task.status {
                        TaskStatus::Succeeded => return Ok(task),
                        TaskStatus::Failed | TaskStatus::Canceled => {
                            let detail = task.error_message().unwrap_or("no detail given");
                            return Err(StageError::Failed(
                                FailureKind::UpstreamFailed,
                                format!("{mode} task failed: {detail}"),
                            ));
                        }
                        TaskStatus::Expired => {
                            return Err(StageError::Failed(
                                FailureKind::UpstreamExpired,
                                format!("{mode} task expired"),
                            ));
                        }
                        TaskStatus::Pending | TaskStatus::InProgress | TaskStatus::Unknown => {
                            let next = stage.job_progress(&task);
                            if next > progress {
                                progress = self
                                    .store
                                    .transition(id, stage.status, stage.status, JobUpdate::progress(next))
                                    .await?
                                    .progress;
                            }
                        }
                    }
                }
                // Poll failures are retried until the stage deadline.
                Err(e) => {
                    tracing::warn!(job_id = %id, mode, task_id = %task_id, error = %e, "Generation poll failed");
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(self.timed_out(mode));
            }

            let wait = self.config.poll_interval.min(deadline - now);
            tokio::select! {
                _ = token.cancelled() => return Err(StageError::Stopped),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Await an upstream call until it returns, the deadline passes
    /// (`None`) or the job is cancelled.
    async fn bounded<T>(
        &self,
        deadline: Instant,
        token: &CancellationToken,
        call: impl Future<Output = T>,
    ) -> Result<Option<T>, StageError> {
        tokio::select! {
            _ = token.cancelled() => Err(StageError::Stopped),
            result = tokio::time::timeout_at(deadline, call) => Ok(result.ok()),
        }
    }

    fn timed_out(&self, mode: &str) -> StageError {
        StageError::Failed(
            FailureKind::UpstreamTimedOut,
            format!(
                "{mode} stage timed out after {}s",
                self.config.stage_timeout.as_secs_f64()
            ),
        )
    }

    /// Stop unless the job is still in `expected` and nobody cancelled it.
    async fn checkpoint(
        &self,
        id: JobId,
        expected: JobStatus,
        token: &CancellationToken,
    ) -> Result<(), StageError> {
        if token.is_cancelled() {
            return Err(StageError::Stopped);
        }
        let job = self.store.get(id).await?;
        if job.status != expected {
            return Err(StageError::Stopped);
        }
        Ok(())
    }

    /// Move a still-active job to FAILED.
    async fn fail(&self, id: JobId, token: &CancellationToken, kind: FailureKind, message: String) {
        if token.is_cancelled() {
            return;
        }
        let current = match self.store.get(id).await {
            Ok(job) if !job.status.is_terminal() => job.status,
            _ => return,
        };
        if let Err(e) = self
            .store
            .transition(id, current, JobStatus::Failed, JobUpdate::failure(kind, message))
            .await
        {
            tracing::warn!(job_id = %id, error = %e, "Could not record generation failure");
        }
    }
}
