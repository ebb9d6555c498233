//! Error types for the printer bridge.

use thiserror::Error;

/// Errors from printer telemetry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TelemetryError {
    /// A required connection setting is empty.
    #[error("missing {0}")]
    MissingSetting(&'static str),

    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Broker refused the credentials.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// No answer from the broker in time.
    #[error("timeout: {0}")]
    Timeout(String),

    /// MQTT error.
    #[error("MQTT error: {0}")]
    MqttError(String),

    /// Report payload could not be read.
    #[error("invalid report: {0}")]
    InvalidReport(String),

    /// Background worker could not start.
    #[error("worker error: {0}")]
    Worker(String),
}

/// Result type for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;
