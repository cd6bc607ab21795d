//! Commands published to the printer's request topic.

use serde_json::json;

/// Options accepted when starting a print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintOptions {
    pub bed_leveling: bool,
    pub use_ams: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            bed_leveling: true,
            use_ams: false,
        }
    }
}

/// Command to send to the printer.
#[derive(Debug, Clone, PartialEq)]
pub enum PrinterCommand {
    /// Ask the printer to push its full status.
    PushAll,
    /// Start printing an uploaded 3MF project.
    PrintStart {
        /// Remote file name returned by the upload.
        file_name: String,
        options: PrintOptions,
    },
    Pause,
    Resume,
    Stop,
    /// Chamber light on or off.
    SetLight { on: bool },
}

impl PrinterCommand {
    /// Short name for logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PushAll => "pushall",
            Self::PrintStart { .. } => "project_file",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::SetLight { .. } => "ledctrl",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::PushAll => json!({
                "pushing": {
                    "sequence_id": "0",
                    "command": "pushall"
                }
            }),

            Self::PrintStart { file_name, options } => json!({
                "print": {
                    "sequence_id": "0",
                    "command": "project_file",
                    "param": "Metadata/plate_1.gcode",
                    "subtask_name": file_name.trim_end_matches(".3mf"),
                    "url": format!("ftp://{file_name}"),
                    "timelapse": false,
                    "bed_leveling": options.bed_leveling,
                    "flow_cali": false,
                    "vibration_cali": false,
                    "layer_inspect": false,
                    "use_ams": options.use_ams
                }
            }),

            Self::Pause => json!({
                "print": {
                    "sequence_id": "0",
                    "command": "pause"
                }
            }),

            Self::Resume => json!({
                "print": {
                    "sequence_id": "0",
                    "command": "resume"
                }
            }),

            Self::Stop => json!({
                "print": {
                    "sequence_id": "0",
                    "command": "stop"
                }
            }),

            Self::SetLight { on } => json!({
                "system": {
                    "sequence_id": "0",
                    "command": "ledctrl",
                    "led_node": "chamber_light",
                    "led_mode": if *on { "on" } else { "off" }
                }
            }),
        }
    }
}
