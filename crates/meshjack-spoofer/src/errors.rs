//! Spoofer Errors
//!
//! Error types for spoofing sessions, sniffing and the command-line tool.

use meshjack_client::ClientError;
use meshjack_core::CoreError;
use meshjack_protocol::ProtocolError;
use meshjack_store::StoreError;
use meshjack_timing::TimingError;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type for spoofer operations
pub type SpoofResult<T> = Result<T, SpoofError>;

/// Spoofer errors
#[derive(Error, Debug)]
pub enum SpoofError {
    /// Transport, send or dispatch failure
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Payload could not be built
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Bad node id or hardware model
    #[error("{0}")]
    Core(#[from] CoreError),

    /// Bad burst or interval settings
    #[error("Timing error: {0}")]
    Timing(#[from] TimingError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Unknown strategy name
    #[error("Unknown strategy: {0} (expected direct, reactive, periodic or hybrid)")]
    UnknownStrategy(String),

    /// Unknown sniffer port group
    #[error("Unknown port group: {0}")]
    UnknownPortGroup(String),

    /// Background task ended abnormally
    #[error("Task failed: {0}")]
    Task(String),
}
