//! printloop HTTP server library.
//!
//! Exposes configuration, state, error mapping and the router so the
//! binary entrypoint and integration tests build the same application.

pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
