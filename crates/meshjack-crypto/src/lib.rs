//! # Meshjack Crypto
//!
//! Channel-level cryptography for mesh traffic.
//!
//! ## Components
//!
//! - **Key material**: base64 channel keys, with the `AQ==` placeholder
//!   expanded to the default key
//! - **Channel hash**: one-byte channel short-code
//! - **Packet cipher**: AES-128/256 in CTR mode, nonce from packet identity

pub mod channel_hash;
pub mod cipher;
pub mod errors;
pub mod key;

pub use channel_hash::*;
pub use cipher::*;
pub use errors::*;
pub use key::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::channel_hash::*;
    pub use crate::cipher::*;
    pub use crate::errors::*;
    pub use crate::key::*;
}
