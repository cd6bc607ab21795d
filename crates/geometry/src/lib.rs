//! Triangle-mesh geometry engine.
//!
//! Loads GLB and STL models, repairs common defects, answers printability
//! questions (watertightness, winding) and exports print-ready 3MF.
//! Everything here is synchronous and CPU bound; async callers should run
//! it on a blocking thread.

pub mod engine;
pub mod error;
pub mod export;
pub mod import;
pub mod mesh;
pub mod repair;
pub mod topology;

pub use engine::{GeometryEngine, TriMeshEngine};
pub use error::GeometryError;
pub use export::ExportFormat;
pub use mesh::{Aabb, Mesh};
pub use repair::RepairReport;
