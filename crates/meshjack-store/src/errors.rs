//! Store Error Types

use meshjack_core::{CoreError, NodeNumber};
use thiserror::Error;

/// Errors raised by store administration and persistence
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record for the node
    #[error("Node not found: {0}")]
    NodeNotFound(NodeNumber),

    /// Column name does not name an editable node field
    #[error("Unknown node field: {0}")]
    UnknownField(String),

    /// Value does not parse as the field's type
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Snapshot file could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file is not valid JSON
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Core error from meshjack-core
    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
