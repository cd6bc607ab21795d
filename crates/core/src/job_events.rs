//! Event type constants for job lifecycle notifications.
//!
//! Carried in the `event_type` field of events published on the bus and
//! used as the SSE `event:` name on `/api/v1/jobs/events`.

/// Progress moved forward during generation or printing.
pub const EVENT_JOB_PROGRESS: &str = "job_progress";

/// Status changed without reaching a terminal state.
pub const EVENT_JOB_STATUS: &str = "job_status";

/// Print finished on the printer.
pub const EVENT_JOB_COMPLETED: &str = "job_completed";

pub const EVENT_JOB_FAILED: &str = "job_failed";

/// Job was cancelled by the user.
pub const EVENT_JOB_CANCELLED: &str = "job_cancelled";

pub const EVENT_JOB_DELETED: &str = "job_deleted";
