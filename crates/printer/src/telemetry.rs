//! Parsing of printer report messages into partial snapshot updates.

use printloop_core::printer::{PrinterSnapshot, PrinterState};
use printloop_core::types::Timestamp;

/// A report that could not be read at all.
#[derive(Debug, thiserror::Error)]
#[error("Malformed telemetry: {0}")]
pub struct MalformedTelemetry(String);

/// The recognised fields of one report; `None` means "not reported".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryUpdate {
    pub state: Option<PrinterState>,
    pub progress: Option<u8>,
    pub remaining_minutes: Option<u32>,
    pub job_name: Option<String>,
    pub nozzle_temp: Option<f64>,
    pub bed_temp: Option<f64>,
    pub chamber_temp: Option<f64>,
}

impl TelemetryUpdate {
    /// Parse a raw report payload.
    ///
    /// Only non-JSON input is an error. JSON without a `print` object, or
    /// with unrecognised fields only, yields an empty update.
    pub fn parse(raw: &[u8]) -> Result<Self, MalformedTelemetry> {
        let value: serde_json::Value =
            serde_json::from_slice(raw).map_err(|e| MalformedTelemetry(e.to_string()))?;
        Ok(Self::from_report(&value))
    }

    pub fn from_report(value: &serde_json::Value) -> Self {
        let Some(print) = value.get("print").and_then(|p| p.as_object()) else {
            return Self::default();
        };

        Self {
            state: print
                .get("gcode_state")
                .and_then(|v| v.as_str())
                .map(PrinterState::from_report),
            progress: print
                .get("mc_percent")
                .and_then(number)
                .map(|p| p.clamp(0.0, 100.0) as u8),
            // Reported in seconds; whole minutes are kept.
            remaining_minutes: print
                .get("mc_remaining_time")
                .and_then(number)
                .map(|secs| (secs.max(0.0) as u64 / 60).min(u64::from(u32::MAX)) as u32),
            job_name: print
                .get("subtask_name")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            nozzle_temp: print.get("nozzle_temper").and_then(number),
            bed_temp: print.get("bed_temper").and_then(number),
            chamber_temp: print.get("chamber_temper").and_then(number),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge present fields into `snapshot`. Returns whether anything
    /// was applied.
    pub fn apply(self, snapshot: &mut PrinterSnapshot, now: Timestamp) -> bool {
        if self.is_empty() {
            return false;
        }
        if let Some(v) = self.state {
            snapshot.state = v;
        }
        if let Some(v) = self.progress {
            snapshot.progress = v;
        }
        if let Some(v) = self.remaining_minutes {
            snapshot.remaining_minutes = v;
        }
        if let Some(v) = self.job_name {
            snapshot.job_name = Some(v);
        }
        if let Some(v) = self.nozzle_temp {
            snapshot.temperatures.nozzle = v;
        }
        if let Some(v) = self.bed_temp {
            snapshot.temperatures.bed = v;
        }
        if let Some(v) = self.chamber_temp {
            snapshot.temperatures.chamber = v;
        }
        snapshot.last_update = Some(now);
        true
    }
}

/// Numbers occasionally arrive as strings.
fn number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use printloop_core::printer::Temperatures;

    use super::*;

    #[test]
    fn full_report_is_parsed() {
        let update = TelemetryUpdate::parse(
            br#"{"print":{"gcode_state":"RUNNING","mc_percent":37,"mc_remaining_time":1830,
                "subtask_name":"dragon","nozzle_temper":219.5,"bed_temper":"55","chamber_temper":31}}"#,
        )
        .unwrap();

        assert_eq!(update.state, Some(PrinterState::Running));
        assert_eq!(update.progress, Some(37));
        assert_eq!(update.remaining_minutes, Some(30));
        assert_eq!(update.job_name.as_deref(), Some("dragon"));
        assert_eq!(update.nozzle_temp, Some(219.5));
        assert_eq!(update.bed_temp, Some(55.0));
        assert_eq!(update.chamber_temp, Some(31.0));
    }

    #[test]
    fn non_json_is_malformed() {
        assert!(TelemetryUpdate::parse(b"\x00\x01 not json").is_err());
    }

    #[test]
    fn json_without_print_is_empty() {
        assert!(TelemetryUpdate::parse(br#"{"info":{"command":"get_version"}}"#)
            .unwrap()
            .is_empty());
        assert!(TelemetryUpdate::parse(b"42").unwrap().is_empty());
    }

    #[test]
    fn apply_merges_only_present_fields() {
        let mut snapshot = PrinterSnapshot {
            connected: true,
            state: PrinterState::Idle,
            temperatures: Temperatures {
                nozzle: 25.0,
                bed: 24.0,
                chamber: 22.0,
            },
            ..Default::default()
        };
        let now = chrono::Utc::now();

        let applied = TelemetryUpdate {
            nozzle_temp: Some(200.0),
            ..Default::default()
        }
        .apply(&mut snapshot, now);

        assert!(applied);
        assert_eq!(snapshot.temperatures.nozzle, 200.0);
        assert_eq!(snapshot.temperatures.bed, 24.0);
        assert_eq!(snapshot.temperatures.chamber, 22.0);
        assert_eq!(snapshot.state, PrinterState::Idle);
        assert_eq!(snapshot.last_update, Some(now));
    }

    #[test]
    fn empty_update_changes_nothing() {
        let mut snapshot = PrinterSnapshot::default();
        assert!(!TelemetryUpdate::default().apply(&mut snapshot, chrono::Utc::now()));
        assert_eq!(snapshot, PrinterSnapshot::default());
    }
}
