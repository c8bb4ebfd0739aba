//! Error types for meshjack-core

use thiserror::Error;

/// Errors raised while parsing node identities and model names
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Node ID is not `!` followed by up to 8 hex digits
    #[error("Invalid node id: {0}")]
    InvalidNodeId(String),

    /// Hardware model is neither a known name nor a number
    #[error("Unknown hardware model: {0}")]
    UnknownHardwareModel(String),
}

/// Result type for meshjack-core operations
pub type CoreResult<T> = Result<T, CoreError>;
