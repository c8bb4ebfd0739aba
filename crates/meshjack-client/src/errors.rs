//! Client Errors
//!
//! Error types for the transport, send and dispatch paths.

use meshjack_protocol::ProtocolError;
use meshjack_store::StoreError;
use thiserror::Error;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// Broker has not accepted the connection
    #[error("Transport not ready")]
    NotReady,

    /// Transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Inbound stream ended while listening
    #[error("Inbound stream closed")]
    StreamClosed,

    /// Wire format or crypto failure
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
