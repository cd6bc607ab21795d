//! The print job pipeline.
//!
//! - [`GenerationCoordinator`]: one supervised background task per job
//!   that drives preview and refine generation, then conversion.
//! - [`ConversionPipeline`]: fetch, repair, scale, center, check and
//!   export a generated model.
//! - [`PrintDispatcher`]: readiness-gated upload and print start, and
//!   print cancellation.
//! - [`PrintMonitor`]: completes printing jobs from printer telemetry.
//! - [`JobService`]: the facade the HTTP layer talks to.

pub mod conversion;
pub mod coordinator;
pub mod dispatcher;
pub mod fetch;
pub mod monitor;
pub mod service;

pub use conversion::{BuildVolume, ConversionError, ConversionPipeline, ConversionResult};
pub use coordinator::{GenerationConfig, GenerationCoordinator};
pub use dispatcher::PrintDispatcher;
pub use fetch::{AssetFetcher, FetchError, HttpFetcher};
pub use monitor::PrintMonitor;
pub use service::JobService;
