//! Broadcast-backed event bus for job lifecycle notifications.
//!
//! Shared as `Arc<EventBus>` between the job store (publisher) and the API
//! (subscriber).

use chrono::{DateTime, Utc};
use printloop_core::job::{Job, JobStatus};
use printloop_core::job_events;
use printloop_core::types::JobId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// JobEvent
// ---------------------------------------------------------------------------

/// A change to a single job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    /// One of the `EVENT_*` constants in [`printloop_core::job_events`].
    pub event_type: String,

    pub job_id: JobId,

    /// Status after the change. `None` for deletions.
    pub status: Option<JobStatus>,

    pub progress: u8,

    /// Event-specific extras such as the failure message.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl JobEvent {
    pub fn new(event_type: impl Into<String>, job_id: JobId) -> Self {
        Self {
            event_type: event_type.into(),
            job_id,
            status: None,
            progress: 0,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: JobStatus, progress: u8) -> Self {
        self.status = Some(status);
        self.progress = progress;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Describe a job after a store write.
    ///
    /// `previous` is the status before the write; an unchanged status is
    /// reported as progress, a new terminal status by its own event type.
    pub fn for_change(previous: JobStatus, job: &Job) -> Self {
        let event_type = match job.status {
            JobStatus::Completed => job_events::EVENT_JOB_COMPLETED,
            JobStatus::Failed => job_events::EVENT_JOB_FAILED,
            JobStatus::Cancelled => job_events::EVENT_JOB_CANCELLED,
            status if status == previous => job_events::EVENT_JOB_PROGRESS,
            _ => job_events::EVENT_JOB_STATUS,
        };

        let mut event = Self::new(event_type, job.id).with_status(job.status, job.progress);
        if let Some(error) = &job.error {
            event = event.with_payload(serde_json::json!({
                "error_kind": error.kind,
                "error": error.message,
            }));
        }
        event
    }

    pub fn deleted(job_id: JobId) -> Self {
        Self::new(job_events::EVENT_JOB_DELETED, job_id)
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use printloop_events::bus::{EventBus, JobEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(JobEvent::deleted(printloop_core::types::JobId::nil()));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<JobEvent>,
}

impl EventBus {
    /// Slow receivers observe `RecvError::Lagged` once `capacity` unread
    /// events pile up.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped if there are none.
    pub fn publish(&self, event: JobEvent) {
        // SendError only means zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use printloop_core::job::{FailureKind, JobSpec, JobUpdate, Style};
    use printloop_core::types::new_job_id;

    use super::*;

    fn sample_job(status: JobStatus) -> Job {
        let mut job = Job::new(
            new_job_id(),
            JobSpec::new("owl", Style::Cartoon, 100.0),
            Utc::now(),
        );
        job.status = status;
        job
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let id = new_job_id();
        bus.publish(JobEvent::deleted(id));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1.job_id, id);
        assert_eq!(e2.event_type, job_events::EVENT_JOB_DELETED);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(JobEvent::deleted(new_job_id()));
    }

    #[test]
    fn same_status_is_reported_as_progress() {
        let mut job = sample_job(JobStatus::GeneratingPreview);
        job.progress = 30;
        let event = JobEvent::for_change(JobStatus::GeneratingPreview, &job);
        assert_eq!(event.event_type, job_events::EVENT_JOB_PROGRESS);
        assert_eq!(event.progress, 30);
    }

    #[test]
    fn status_change_and_terminal_events() {
        let job = sample_job(JobStatus::Ready);
        assert_eq!(
            JobEvent::for_change(JobStatus::GeneratingRefine, &job).event_type,
            job_events::EVENT_JOB_STATUS
        );

        let mut failed = sample_job(JobStatus::Failed);
        JobUpdate::failure(FailureKind::Transport, "upload refused").apply_to(&mut failed);
        let event = JobEvent::for_change(JobStatus::Uploading, &failed);
        assert_eq!(event.event_type, job_events::EVENT_JOB_FAILED);
        assert_eq!(event.payload["error"], "upload refused");
        assert_eq!(event.payload["error_kind"], "transport");
    }
}
