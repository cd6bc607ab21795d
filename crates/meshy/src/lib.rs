//! Text-to-3D generation collaborator.
//!
//! - [`GenerationService`]: the seam the pipeline drives (create a task,
//!   poll it).
//! - [`MeshyClient`]: REST implementation against the Meshy
//!   `/openapi/v2/text-to-3d` endpoints.
//! - [`prompt`]: printability prompt enhancement.

pub mod client;
pub mod prompt;
pub mod service;
pub mod task;

pub use client::{MeshyClient, MeshyError};
pub use service::GenerationService;
pub use task::{GenerationTask, TaskRequest, TaskStatus};
