//! Job record, state machine, and input validation.
//!
//! A [`Job`] is owned by the job store and only ever changes through
//! `JobStore::transition`, which applies a [`JobUpdate`] atomically with
//! the status compare-and-set.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{JobId, Timestamp};

/// Maximum accepted prompt length in characters.
pub const MAX_PROMPT_LEN: usize = 2_000;

/// Largest target size accepted for a job, in millimetres.
pub const MAX_TARGET_SIZE_MM: f64 = 1_000.0;

/// Target size used when the caller does not provide one.
pub const DEFAULT_TARGET_SIZE_MM: f64 = 150.0;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a print job.
///
/// ```text
/// Pending -> GeneratingPreview -> GeneratingRefine -> Ready
///         -> Uploading -> Printing -> Completed
/// ```
///
/// Any non-terminal status may move to `Failed`. `Cancelled` is reachable
/// only from the two generating stages and from `Printing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    GeneratingPreview,
    GeneratingRefine,
    Ready,
    Uploading,
    Printing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::GeneratingPreview => "generating_preview",
            Self::GeneratingRefine => "generating_refine",
            Self::Ready => "ready",
            Self::Uploading => "uploading",
            Self::Printing => "printing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal records are immutable.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub const fn is_generating(self) -> bool {
        matches!(self, Self::GeneratingPreview | Self::GeneratingRefine)
    }

    /// Whether a user cancel is accepted from this status.
    pub const fn is_cancellable(self) -> bool {
        matches!(
            self,
            Self::GeneratingPreview | Self::GeneratingRefine | Self::Printing
        )
    }

    /// Whether `self -> next` is an edge of the state machine.
    ///
    /// Self-edges are not covered here; the store treats them as
    /// field-only updates on non-terminal records.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Failed => true,
            Self::Cancelled => self.is_cancellable(),
            _ => matches!(
                (self, next),
                (Self::Pending, Self::GeneratingPreview)
                    | (Self::GeneratingPreview, Self::GeneratingRefine)
                    | (Self::GeneratingRefine, Self::Ready)
                    | (Self::Ready, Self::Uploading)
                    | (Self::Uploading, Self::Printing)
                    | (Self::Printing, Self::Completed)
            ),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Style
// ---------------------------------------------------------------------------

/// Visual style requested from the generation service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    #[default]
    Cartoon,
    Realistic,
    Sculpture,
}

impl Style {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cartoon => "cartoon",
            Self::Realistic => "realistic",
            Self::Sculpture => "sculpture",
        }
    }
}

impl FromStr for Style {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cartoon" => Ok(Self::Cartoon),
            "realistic" => Ok(Self::Realistic),
            "sculpture" => Ok(Self::Sculpture),
            other => Err(CoreError::Validation(format!(
                "style must be one of cartoon, realistic, sculpture; got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Caller-provided input for a new job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub prompt: String,
    pub style: Style,
    pub target_size_mm: f64,
}

impl JobSpec {
    pub fn new(prompt: impl Into<String>, style: Style, target_size_mm: f64) -> Self {
        Self {
            prompt: prompt.into(),
            style,
            target_size_mm,
        }
    }

    /// Check prompt and size bounds.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_prompt(&self.prompt)?;
        validate_target_size(self.target_size_mm)
    }
}

pub fn validate_prompt(prompt: &str) -> Result<(), CoreError> {
    if prompt.trim().is_empty() {
        return Err(CoreError::Validation("prompt must not be empty".to_string()));
    }
    let len = prompt.chars().count();
    if len > MAX_PROMPT_LEN {
        return Err(CoreError::Validation(format!(
            "prompt has {len} characters, maximum is {MAX_PROMPT_LEN}"
        )));
    }
    Ok(())
}

pub fn validate_target_size(size_mm: f64) -> Result<(), CoreError> {
    if !size_mm.is_finite() {
        return Err(CoreError::Validation(
            "target size must be a finite number".to_string(),
        ));
    }
    if size_mm <= 0.0 || size_mm > MAX_TARGET_SIZE_MM {
        return Err(CoreError::Validation(format!(
            "target size must be greater than 0 and at most {MAX_TARGET_SIZE_MM} mm, got {size_mm}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Geometry metrics and failures
// ---------------------------------------------------------------------------

/// Bounding-box extents of the converted model, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width_mm: f64,
    pub depth_mm: f64,
    pub height_mm: f64,
}

impl Dimensions {
    pub fn max(&self) -> f64 {
        self.width_mm.max(self.depth_mm).max(self.height_mm)
    }

    pub fn min(&self) -> f64 {
        self.width_mm.min(self.depth_mm).min(self.height_mm)
    }
}

/// Machine-checkable printability warning codes, in check order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    NotWatertight,
    InconsistentWinding,
    ThinDimension,
    ExceedsBuildX,
    ExceedsBuildY,
    ExceedsBuildZ,
    HighTriangleCount,
}

/// A printability warning: a stable code plus a readable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintWarning {
    pub code: WarningCode,
    pub message: String,
}

impl PrintWarning {
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Kind of terminal failure recorded on a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UpstreamFailed,
    UpstreamExpired,
    UpstreamTimedOut,
    Conversion,
    Transport,
    Printer,
    Internal,
}

impl FailureKind {
    pub const fn is_upstream(self) -> bool {
        matches!(
            self,
            Self::UpstreamFailed | Self::UpstreamExpired | Self::UpstreamTimedOut
        )
    }
}

/// Last failure captured on a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: FailureKind,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// A print job, from prompt to finished print.
///
/// Optional fields are populated as the job advances: task ids during
/// generation, geometry metrics and artifact at `Ready`, print linkage
/// from `Printing` onwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub prompt: String,
    pub style: Style,
    pub target_size_mm: f64,
    pub status: JobStatus,
    pub progress: u8,
    pub preview_task_id: Option<String>,
    pub refine_task_id: Option<String>,
    pub model_url: Option<String>,
    pub thumbnail_url: Option<String>,
    /// Server-local; never sent to clients.
    #[serde(skip_serializing, default)]
    pub artifact_path: Option<PathBuf>,
    pub dimensions: Option<Dimensions>,
    pub triangle_count: Option<u64>,
    pub is_watertight: Option<bool>,
    pub warnings: Vec<PrintWarning>,
    pub estimated_print_minutes: Option<u32>,
    pub printer_job_ref: Option<String>,
    pub print_started_at: Option<Timestamp>,
    pub print_ended_at: Option<Timestamp>,
    pub error: Option<JobError>,
    /// Always 0: failed jobs are never retried automatically.
    pub retry_count: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Job {
    /// A fresh `Pending` record with zero progress.
    pub fn new(id: JobId, spec: JobSpec, now: Timestamp) -> Self {
        Self {
            id,
            prompt: spec.prompt,
            style: spec.style,
            target_size_mm: spec.target_size_mm,
            status: JobStatus::Pending,
            progress: 0,
            preview_task_id: None,
            refine_task_id: None,
            model_url: None,
            thumbnail_url: None,
            artifact_path: None,
            dimensions: None,
            triangle_count: None,
            is_watertight: None,
            warnings: Vec::new(),
            estimated_print_minutes: None,
            printer_job_ref: None,
            print_started_at: None,
            print_ended_at: None,
            error: None,
            retry_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Field updates applied together with a status transition.
///
/// `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub progress: Option<u8>,
    pub preview_task_id: Option<String>,
    pub refine_task_id: Option<String>,
    pub model_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub artifact_path: Option<PathBuf>,
    pub dimensions: Option<Dimensions>,
    pub triangle_count: Option<u64>,
    pub is_watertight: Option<bool>,
    pub warnings: Option<Vec<PrintWarning>>,
    pub estimated_print_minutes: Option<u32>,
    pub printer_job_ref: Option<String>,
    pub print_started_at: Option<Timestamp>,
    pub print_ended_at: Option<Timestamp>,
    pub error: Option<JobError>,
}

impl JobUpdate {
    pub fn progress(percent: u8) -> Self {
        Self {
            progress: Some(percent),
            ..Default::default()
        }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            error: Some(JobError {
                kind,
                message: message.into(),
            }),
            ..Default::default()
        }
    }

    /// Copy every set field onto `job`.
    pub fn apply_to(self, job: &mut Job) {
        if let Some(v) = self.progress {
            job.progress = v.min(100);
        }
        if let Some(v) = self.preview_task_id {
            job.preview_task_id = Some(v);
        }
        if let Some(v) = self.refine_task_id {
            job.refine_task_id = Some(v);
        }
        if let Some(v) = self.model_url {
            job.model_url = Some(v);
        }
        if let Some(v) = self.thumbnail_url {
            job.thumbnail_url = Some(v);
        }
        if let Some(v) = self.artifact_path {
            job.artifact_path = Some(v);
        }
        if let Some(v) = self.dimensions {
            job.dimensions = Some(v);
        }
        if let Some(v) = self.triangle_count {
            job.triangle_count = Some(v);
        }
        if let Some(v) = self.is_watertight {
            job.is_watertight = Some(v);
        }
        if let Some(v) = self.warnings {
            job.warnings = v;
        }
        if let Some(v) = self.estimated_print_minutes {
            job.estimated_print_minutes = Some(v);
        }
        if let Some(v) = self.printer_job_ref {
            job.printer_job_ref = Some(v);
        }
        if let Some(v) = self.print_started_at {
            job.print_started_at = Some(v);
        }
        if let Some(v) = self.print_ended_at {
            job.print_ended_at = Some(v);
        }
        if let Some(v) = self.error {
            job.error = Some(v);
        }
    }
}
