use async_trait::async_trait;

use crate::client::MeshyError;
use crate::task::{GenerationTask, TaskRequest};

/// Remote generation service: creates preview/refine tasks and reports
/// their status.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Create a task and return its opaque reference.
    async fn create(&self, request: &TaskRequest) -> Result<String, MeshyError>;

    /// Current status of a previously created task.
    async fn get(&self, task_id: &str) -> Result<GenerationTask, MeshyError>;
}
