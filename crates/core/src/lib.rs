//! Domain types shared by every printloop crate: the job record and its
//! state machine, the printer snapshot, and the error taxonomy.

pub mod error;
pub mod job;
pub mod job_events;
pub mod printer;
pub mod types;
pub mod units;
