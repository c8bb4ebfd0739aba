//! Protocol Error Types

use thiserror::Error;

/// Protocol errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Bytes did not decode as the expected protobuf message
    #[error("Decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Payload fields could not be built or read
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Altitude text could not be parsed
    #[error("Invalid altitude: {0}")]
    InvalidAltitude(String),

    /// Latitude or longitude outside the globe
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// Public key is not valid hex
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(#[from] hex::FromHexError),

    /// Crypto error from meshjack-crypto
    #[error("Crypto error: {0}")]
    Crypto(#[from] meshjack_crypto::CryptoError),

    /// Core error from meshjack-core
    #[error("Core error: {0}")]
    Core(#[from] meshjack_core::CoreError),
}

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;
