//! In-memory job registry.
//!
//! [`JobStore`] is the single source of truth for job state. Every
//! mutation goes through [`JobStore::transition`], a compare-and-set on
//! the job status applied together with its field updates.

pub mod job_store;

pub use job_store::JobStore;
