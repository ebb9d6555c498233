//! Requests published to the printer.

use serde_json::json;

/// A message for the printer's request topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrinterRequest {
    /// Ask for a full status report.
    PushAll,
}

impl PrinterRequest {
    /// JSON payload carrying `sequence_id`.
    pub fn to_json(self, sequence_id: u64) -> serde_json::Value {
        match self {
            PrinterRequest::PushAll => json!({
                "pushing": {
                    "sequence_id": sequence_id.to_string(),
                    "command": "pushall"
                }
            }),
        }
    }
}

/// Increasing sequence ids for outgoing requests, starting at 1.
#[derive(Debug, Default)]
pub struct Sequence(u64);

impl Sequence {
    /// Next id.
    pub fn next_id(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}
