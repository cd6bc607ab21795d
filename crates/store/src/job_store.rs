use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use printloop_core::error::CoreError;
use printloop_core::job::{Job, JobSpec, JobStatus, JobUpdate};
use printloop_core::job_events;
use printloop_core::types::{new_job_id, JobId};
use printloop_events::{EventBus, JobEvent};
use tokio::sync::RwLock;

/// Keyed registry of job records.
///
/// Reads clone the record out; no caller ever holds a reference into the
/// map, so read-modify-write outside [`transition`](Self::transition) is
/// impossible.
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
    events: Arc<EventBus>,
}

impl JobStore {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Validate `spec` and insert a new `Pending` job.
    pub async fn create(&self, spec: JobSpec) -> Result<Job, CoreError> {
        spec.validate()?;

        let job = Job::new(new_job_id(), spec, Utc::now());
        self.jobs.write().await.insert(job.id, job.clone());

        tracing::info!(job_id = %job.id, style = %job.style, target_size_mm = job.target_size_mm, "Job created");
        self.events.publish(
            JobEvent::new(job_events::EVENT_JOB_STATUS, job.id).with_status(job.status, job.progress),
        );
        Ok(job)
    }

    pub async fn get(&self, id: JobId) -> Result<Job, CoreError> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound(id))
    }

    /// All jobs, newest first.
    pub async fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        jobs
    }

    /// Atomically move a job from `from` to `to` and apply `update`.
    ///
    /// Fails with `InvalidTransition` if the current status is not `from`
    /// or the edge is not part of the state machine. `from == to` is a
    /// field-only update and is rejected on terminal records. A progress
    /// value below the current one is a validation error.
    pub async fn transition(
        &self,
        id: JobId,
        from: JobStatus,
        to: JobStatus,
        update: JobUpdate,
    ) -> Result<Job, CoreError> {
        let job = {
            let mut jobs = self.jobs.write().await;
            let job = jobs.get_mut(&id).ok_or(CoreError::NotFound(id))?;

            if job.status != from {
                return Err(CoreError::InvalidTransition {
                    id,
                    from: job.status,
                    to,
                });
            }

            let allowed = if from == to {
                !from.is_terminal()
            } else {
                from.can_transition_to(to)
            };
            if !allowed {
                return Err(CoreError::InvalidTransition { id, from, to });
            }

            if let Some(progress) = update.progress {
                if progress > 100 {
                    return Err(CoreError::Validation(format!(
                        "progress must be at most 100, got {progress}"
                    )));
                }
                if progress < job.progress {
                    return Err(CoreError::Validation(format!(
                        "progress may not decrease ({} -> {progress})",
                        job.progress
                    )));
                }
            }

            update.apply_to(job);
            job.status = to;
            job.updated_at = Utc::now();
            job.clone()
        };

        if from == to {
            tracing::debug!(job_id = %id, status = %to, progress = job.progress, "Job updated");
        } else {
            tracing::info!(job_id = %id, from = %from, to = %to, progress = job.progress, "Job transitioned");
        }
        self.events.publish(JobEvent::for_change(from, &job));
        Ok(job)
    }

    /// Remove a job and return its last state. Forbidden while it is
    /// printing.
    pub async fn delete(&self, id: JobId) -> Result<Job, CoreError> {
        let removed = {
            let mut jobs = self.jobs.write().await;
            let job = jobs.get(&id).ok_or(CoreError::NotFound(id))?;
            if job.status == JobStatus::Printing {
                return Err(CoreError::Conflict(format!(
                    "job {id} is printing; cancel the print before deleting"
                )));
            }
            jobs.remove(&id).ok_or(CoreError::NotFound(id))?
        };

        tracing::info!(job_id = %id, "Job deleted");
        self.events.publish(JobEvent::deleted(id));
        Ok(removed)
    }

    /// The job currently in `Printing`, if any.
    pub async fn find_printing(&self) -> Option<Job> {
        self.jobs
            .read()
            .await
            .values()
            .filter(|job| job.status == JobStatus::Printing)
            .max_by_key(|job| job.print_started_at)
            .cloned()
    }

    /// A job holding the printer: uploading to it or printing on it.
    pub async fn find_holding_printer(&self) -> Option<Job> {
        self.jobs
            .read()
            .await
            .values()
            .find(|job| matches!(job.status, JobStatus::Uploading | JobStatus::Printing))
            .cloned()
    }
}
