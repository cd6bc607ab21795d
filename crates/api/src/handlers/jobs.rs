//! Handlers for the `/jobs` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use printloop_core::job::{JobSpec, Style, DEFAULT_TARGET_SIZE_MM};
use printloop_core::types::JobId;
use printloop_core::units::inches_to_mm;
use printloop_printer::commands::PrintOptions;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /jobs`. The size may be given in millimetres or inches,
/// not both.
#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub prompt: String,
    pub style: Option<String>,
    pub target_size_mm: Option<f64>,
    pub target_size_in: Option<f64>,
}

impl CreateJobRequest {
    fn into_spec(self) -> AppResult<JobSpec> {
        let style = match self.style.as_deref() {
            Some(raw) => raw.parse::<Style>()?,
            None => Style::default(),
        };
        let target_size_mm = match (self.target_size_mm, self.target_size_in) {
            (Some(_), Some(_)) => {
                return Err(AppError::BadRequest(
                    "give target_size_mm or target_size_in, not both".into(),
                ))
            }
            (Some(mm), None) => mm,
            (None, Some(inches)) => inches_to_mm(inches),
            (None, None) => DEFAULT_TARGET_SIZE_MM,
        };
        Ok(JobSpec::new(self.prompt, style, target_size_mm))
    }
}

/// Body of `POST /jobs/{id}/print`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PrintRequest {
    pub bed_leveling: Option<bool>,
    pub use_ams: Option<bool>,
}

impl PrintRequest {
    fn options(&self) -> PrintOptions {
        let defaults = PrintOptions::default();
        PrintOptions {
            bed_leveling: self.bed_leveling.unwrap_or(defaults.bed_leveling),
            use_ams: self.use_ams.unwrap_or(defaults.use_ams),
        }
    }
}

/// POST /api/v1/jobs
///
/// Create a job and start generating it. Returns 201 with the job, already
/// in `generating_preview`.
pub async fn create_job(
    State(state): State<AppState>,
    Json(input): Json<CreateJobRequest>,
) -> AppResult<impl IntoResponse> {
    let job = state.jobs.create_job(input.into_spec()?).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

/// GET /api/v1/jobs
pub async fn list_jobs(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let jobs = state.jobs.list_jobs().await;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = state.jobs.get_job(id).await?;
    Ok(Json(DataResponse { data: job }))
}

/// DELETE /api/v1/jobs/{id}
///
/// 409 while the job is printing.
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    state.jobs.delete_job(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/jobs/{id}/print
///
/// Rejected with 409 if the job is not ready or the printer is busy, and
/// 503 if the printer is offline.
pub async fn start_print(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
    body: Option<Json<PrintRequest>>,
) -> AppResult<impl IntoResponse> {
    let options = body.map(|Json(b)| b.options()).unwrap_or_default();
    let job = state.jobs.start_print(id, options).await?;
    Ok(Json(DataResponse { data: job }))
}

/// POST /api/v1/jobs/{id}/cancel
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = state.jobs.cancel_job(id).await?;
    Ok(Json(DataResponse { data: job }))
}
