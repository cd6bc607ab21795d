use crate::job::JobStatus;
use crate::printer::PrinterState;
use crate::types::JobId;

/// Domain error taxonomy shared by every crate in the workspace.
///
/// Collaborator crates define their own `thiserror` enums and map into
/// this type at the pipeline boundary, so callers only ever match on
/// one set of variants.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Invalid transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The generation service reported failure, expiry, or timed out.
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Printer is offline")]
    PrinterOffline,

    #[error("Printer is busy ({0})")]
    PrinterBusy(PrinterState),

    #[error("Printer is not connected")]
    NotConnected,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
