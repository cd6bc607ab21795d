//! In-process job event bus.
//!
//! - [`EventBus`] fans [`JobEvent`]s out to any number of subscribers
//!   (the SSE stream and the [`EventLog`] service).
//! - [`EventLog`] writes every event to the tracing log.

pub mod bus;
pub mod log;

pub use bus::{EventBus, JobEvent};
pub use log::EventLog;
