//! Error types for quote input handling.

use thiserror::Error;

/// Errors raised while turning operator input into job parameters.
///
/// The pricing calculation itself never fails.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    /// A quote field held text that is not a number.
    #[error("{field} must be a number, got {value:?}")]
    Input {
        /// Form field name.
        field: &'static str,
        /// Offending text.
        value: String,
    },

    /// A required field was left empty.
    #[error("{0} is required")]
    Missing(&'static str),
}

/// Result type for pricing input operations.
pub type Result<T> = std::result::Result<T, PricingError>;
