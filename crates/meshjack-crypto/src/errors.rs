//! Error types for meshjack-crypto

use thiserror::Error;

/// Errors that can occur in meshjack-crypto operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Channel key is not valid base64, or has an unusable length
    #[error("Invalid channel key: {0}")]
    KeyFormat(String),

    /// Packet could not be deciphered (no key, empty body)
    #[error("Decryption failed: {0}")]
    Decrypt(String),
}

/// Result type for meshjack-crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;
