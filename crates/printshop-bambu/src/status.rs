//! Printer status types and the partial-report merge.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Machine state as reported in `gcode_state`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MachineState {
    /// No report received yet.
    #[default]
    Offline,
    /// Idle.
    Idle,
    /// Getting ready to print.
    Prepare,
    /// Printing.
    Running,
    /// Paused.
    Pause,
    /// Print finished.
    Finish,
    /// Print failed.
    Failed,
    /// Last report is too old to trust.
    Unknown,
    /// A state this crate does not know.
    Other(String),
}

impl MachineState {
    /// Parse a `gcode_state` value.
    pub fn from_gcode_state(state: &str) -> Self {
        match state.trim().to_uppercase().as_str() {
            "IDLE" => Self::Idle,
            "PREPARE" | "SLICING" => Self::Prepare,
            "RUNNING" => Self::Running,
            "PAUSE" => Self::Pause,
            "FINISH" => Self::Finish,
            "FAILED" => Self::Failed,
            "OFFLINE" => Self::Offline,
            _ => Self::Other(state.to_string()),
        }
    }

    /// True while a print is underway.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Prepare | Self::Running | Self::Pause)
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Offline => "OFFLINE",
            Self::Idle => "IDLE",
            Self::Prepare => "PREPARE",
            Self::Running => "RUNNING",
            Self::Pause => "PAUSE",
            Self::Finish => "FINISH",
            Self::Failed => "FAILED",
            Self::Unknown => "UNKNOWN",
            Self::Other(s) => s.as_str(),
        };
        f.write_str(label)
    }
}

/// One inbound report. Only the fields present in the message are `Some`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusReport {
    /// `gcode_state`.
    pub state: Option<MachineState>,
    /// `mc_percent`.
    pub percent: Option<f64>,
    /// `mc_remaining_time`, in minutes.
    pub remaining_min: Option<u32>,
    /// `nozzle_temper`.
    pub nozzle_temp: Option<f64>,
    /// `bed_temper`.
    pub bed_temp: Option<f64>,
    /// `subtask_name`.
    pub job: Option<String>,
}

impl StatusReport {
    /// Read a report payload.
    ///
    /// Fields are taken from the `print` object when there is one, otherwise
    /// from the top level. Fields of the wrong type are ignored.
    pub fn from_payload(payload: &serde_json::Value) -> Self {
        let p = payload.get("print").unwrap_or(payload);
        Self {
            state: p
                .get("gcode_state")
                .and_then(|v| v.as_str())
                .map(MachineState::from_gcode_state),
            percent: p.get("mc_percent").and_then(number),
            remaining_min: p
                .get("mc_remaining_time")
                .and_then(number)
                .map(|m| m.max(0.0) as u32),
            nozzle_temp: p.get("nozzle_temper").and_then(number),
            bed_temp: p.get("bed_temper").and_then(number),
            job: p
                .get("subtask_name")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        }
    }

    /// Parse raw message bytes.
    pub fn parse(bytes: &[u8]) -> crate::Result<Self> {
        let payload: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| crate::TelemetryError::InvalidReport(e.to_string()))?;
        Ok(Self::from_payload(&payload))
    }

    /// True if the report carries none of the tracked fields.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// numbers sometimes arrive as strings
fn number(v: &serde_json::Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Last known state of a printer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterStatus {
    /// Machine state.
    pub state: MachineState,
    /// Progress percent.
    pub percent: f64,
    /// Remaining time in minutes.
    pub remaining_min: u32,
    /// Nozzle temperature (°C).
    pub nozzle_temp: f64,
    /// Bed temperature (°C).
    pub bed_temp: f64,
    /// Current job or subtask name.
    pub job: String,
}

impl Default for PrinterStatus {
    fn default() -> Self {
        Self {
            state: MachineState::Offline,
            percent: 0.0,
            remaining_min: 0,
            nozzle_temp: 0.0,
            bed_temp: 0.0,
            job: "No Job".to_string(),
        }
    }
}

impl PrinterStatus {
    /// Overwrite only the fields present in `report`.
    pub fn merge(&mut self, report: &StatusReport) {
        if let Some(state) = &report.state {
            self.state = state.clone();
        }
        if let Some(percent) = report.percent {
            self.percent = percent;
        }
        if let Some(remaining) = report.remaining_min {
            self.remaining_min = remaining;
        }
        if let Some(temp) = report.nozzle_temp {
            self.nozzle_temp = temp;
        }
        if let Some(temp) = report.bed_temp {
            self.bed_temp = temp;
        }
        if let Some(job) = &report.job {
            self.job = job.clone();
        }
    }

    /// Remaining time as `"2h 5m"`, or `"45m"` under an hour.
    pub fn time_left_label(&self) -> String {
        let hours = self.remaining_min / 60;
        let mins = self.remaining_min % 60;
        if hours > 0 {
            format!("{hours}h {mins}m")
        } else {
            format!("{mins}m")
        }
    }

    /// Job name without a trailing `.gcode`.
    pub fn job_label(&self) -> &str {
        self.job.strip_suffix(".gcode").unwrap_or(&self.job)
    }

    /// Temperatures as `"Nozzle: 220°C | Bed: 60°C"`.
    pub fn temps_label(&self) -> String {
        format!(
            "Nozzle: {}°C | Bed: {}°C",
            self.nozzle_temp.trunc(),
            self.bed_temp.trunc()
        )
    }
}
