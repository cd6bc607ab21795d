//! Printer integration: the shared status snapshot, telemetry parsing,
//! printer commands and the Bambu MQTT transport.
//!
//! - [`PrinterStateSync`] owns the single [`PrinterSnapshot`] and is the
//!   only way to issue commands.
//! - [`PrinterTransport`] is the seam to the physical printer;
//!   [`BambuTransport`] implements it over MQTT and an HTTP upload bridge.
//! - [`run_telemetry_loop`] drives the MQTT event loop with reconnect
//!   backoff.
//!
//! [`PrinterSnapshot`]: printloop_core::printer::PrinterSnapshot

pub mod bambu;
pub mod commands;
pub mod reconnect;
pub mod sync;
pub mod telemetry;
pub mod tls;
pub mod transport;

pub use bambu::{run_telemetry_loop, BambuConfig, BambuTransport};
pub use commands::PrinterCommand;
pub use reconnect::ReconnectConfig;
pub use sync::PrinterStateSync;
pub use telemetry::TelemetryUpdate;
pub use transport::{PrinterTransport, TransportError, UploadAck};
