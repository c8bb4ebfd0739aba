//! Timing Errors

use thiserror::Error;

/// Result type for timing operations
pub type TimingResult<T> = Result<T, TimingError>;

/// Timing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimingError {
    /// Invalid timing configuration
    #[error("Invalid timing configuration: {0}")]
    InvalidConfig(String),
}
