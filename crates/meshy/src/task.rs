//! Request payloads and task status types for the text-to-3D API.

use printloop_core::job::Style;
use serde::{Deserialize, Serialize};

use crate::prompt::{enhance_prompt, wants_a_pose};

/// Generation model requested for preview tasks.
pub const AI_MODEL: &str = "meshy-6";

/// Polygon budget balancing detail against print time.
pub const TARGET_POLYCOUNT: u32 = 50_000;

/// One generation stage to create.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskRequest {
    /// Untextured base geometry from a prompt.
    Preview { prompt: String, style: Style },
    /// Texture pass on a finished preview.
    Refine { preview_task_id: String },
}

impl TaskRequest {
    pub const fn mode(&self) -> &'static str {
        match self {
            Self::Preview { .. } => "preview",
            Self::Refine { .. } => "refine",
        }
    }

    /// JSON body for `POST /openapi/v2/text-to-3d`.
    pub fn to_payload(&self) -> serde_json::Value {
        match self {
            Self::Preview { prompt, style } => {
                let mut payload = serde_json::json!({
                    "mode": "preview",
                    "prompt": enhance_prompt(prompt),
                    "ai_model": AI_MODEL,
                    "topology": "quad",
                    "target_polycount": TARGET_POLYCOUNT,
                    "should_remesh": true,
                    "symmetry_mode": "auto",
                });
                // Meshy only knows realistic and sculpture; cartoon is its default look.
                if matches!(style, Style::Realistic | Style::Sculpture) {
                    payload["art_style"] = serde_json::Value::from(style.as_str());
                }
                if wants_a_pose(prompt) {
                    payload["pose_mode"] = serde_json::Value::from("a-pose");
                }
                payload
            }
            Self::Refine { preview_task_id } => serde_json::json!({
                "mode": "refine",
                "preview_task_id": preview_task_id,
                "enable_pbr": true,
            }),
        }
    }
}

/// Response of the create endpoint.
#[derive(Debug, Deserialize)]
pub struct CreateResponse {
    pub result: String,
}

/// Remote task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed,
    Expired,
    Canceled,
    /// Anything newer than this client; treated as still running.
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    pub const fn is_finished(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Expired | Self::Canceled
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelUrls {
    pub glb: Option<String>,
    pub fbx: Option<String>,
    pub obj: Option<String>,
    pub usdz: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskError {
    #[serde(default)]
    pub message: String,
}

/// Status report for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationTask {
    pub id: String,
    pub status: TaskStatus,
    /// Percent complete, 0-100.
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub model_urls: Option<ModelUrls>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub task_error: Option<TaskError>,
}

impl GenerationTask {
    /// Progress clamped to 0-100.
    pub fn percent(&self) -> u8 {
        self.progress.min(100) as u8
    }

    pub fn glb_url(&self) -> Option<&str> {
        self.model_urls.as_ref()?.glb.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.task_error
            .as_ref()
            .map(|e| e.message.as_str())
            .filter(|m| !m.is_empty())
    }
}
