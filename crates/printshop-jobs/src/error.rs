//! Error types for the job lifecycle.

use printshop_ledger::LedgerError;
use thiserror::Error;

use crate::record::JobId;

/// Errors from queue, sale, and history operations.
#[derive(Error, Debug)]
pub enum JobError {
    /// No queue entry or history record has this id.
    #[error("job not found: {0}")]
    NotFound(JobId),

    /// The draft has no material lines.
    #[error("job has no materials")]
    EmptyDraft,

    /// A deduction failed after earlier lines were already applied.
    ///
    /// Applied lines are not rolled back.
    #[error("inventory update stopped after {applied} line(s): {source}")]
    Interrupted {
        /// Lines deducted before the failure.
        applied: usize,
        /// The failure.
        #[source]
        source: LedgerError,
    },

    /// Ledger or store failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for job operations.
pub type Result<T> = std::result::Result<T, JobError>;
