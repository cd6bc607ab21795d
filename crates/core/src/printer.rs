//! Printer status snapshot shared between telemetry ingestion and
//! job dispatch.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Printer state as reported by the `gcode_state` telemetry field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterState {
    Idle,
    Preparing,
    Running,
    Paused,
    Finished,
    Failed,
    Error,
    Offline,
    #[default]
    Unknown,
}

impl PrinterState {
    /// Map a raw `gcode_state` value (any case) to a state.
    pub fn from_report(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "idle" | "standby" => Self::Idle,
            "prepare" | "preparing" | "slicing" => Self::Preparing,
            "running" | "printing" => Self::Running,
            "pause" | "paused" => Self::Paused,
            "finish" | "finished" | "completed" => Self::Finished,
            "failed" => Self::Failed,
            "offline" => Self::Offline,
            s if s.contains("error") => Self::Error,
            _ => Self::Unknown,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Preparing => "preparing",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Error => "error",
            Self::Offline => "offline",
            Self::Unknown => "unknown",
        }
    }

    /// States in which the printer accepts a new print.
    pub const fn accepts_print(self) -> bool {
        matches!(self, Self::Idle | Self::Finished | Self::Failed)
    }

    /// States that mean a print is underway on the machine.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Preparing | Self::Running | Self::Paused)
    }
}

impl fmt::Display for PrinterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Temperature readings in degrees Celsius.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Temperatures {
    pub nozzle: f64,
    pub bed: f64,
    pub chamber: f64,
}

/// The single current view of printer telemetry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrinterSnapshot {
    pub connected: bool,
    pub state: PrinterState,
    /// Only meaningful while `state` is running.
    pub progress: u8,
    pub remaining_minutes: u32,
    pub job_name: Option<String>,
    pub temperatures: Temperatures,
    pub last_update: Option<Timestamp>,
}

impl PrinterSnapshot {
    /// Connected and in a state that accepts a new print.
    pub fn is_ready(&self) -> bool {
        self.connected && self.state.accepts_print()
    }
}
