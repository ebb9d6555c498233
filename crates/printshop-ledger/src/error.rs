//! Error types for the inventory ledger.

use thiserror::Error;

use crate::spool::SpoolId;

/// Errors from ledger and record-store operations.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// No spool carries the given id.
    #[error("unknown spool: {0}")]
    UnknownSpool(SpoolId),

    /// A spool with this id already exists.
    #[error("duplicate spool id: {0}")]
    DuplicateId(SpoolId),

    /// Record collection could not be encoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backup archive could not be written.
    #[error("backup error: {0}")]
    Backup(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for LedgerError {
    fn from(err: zip::result::ZipError) -> Self {
        LedgerError::Backup(err.to_string())
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
