//! Channel Key Material
//!
//! Channel keys are exchanged as base64 text. Users commonly type the short
//! placeholder `AQ==` to mean "the default channel key"; it expands to the
//! canonical 128-bit key. An empty key means the channel is unencrypted.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use meshjack_core::{DEFAULT_KEY, DEFAULT_KEY_PLACEHOLDER};

use crate::errors::{CryptoError, CryptoResult};

/// Right-pad with `=` to a multiple of 4 and map the URL-safe alphabet
fn pad_and_standardize(value: &str) -> String {
    let mut padded: String = value
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }
    padded
}

/// Normalize a user-supplied key string
///
/// Returns the base64 text that will actually be decoded: the canonical key
/// for the placeholder, otherwise the padded standard-alphabet form. Empty
/// input stays empty.
pub fn normalize_key_text(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let padded = pad_and_standardize(trimmed);
    if padded.eq_ignore_ascii_case(DEFAULT_KEY_PLACEHOLDER) {
        DEFAULT_KEY.to_string()
    } else {
        padded
    }
}

/// Normalized channel key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelKey {
    /// Channel carries plaintext `Data` blocks
    Unencrypted,
    /// Raw key bytes
    Key(Vec<u8>),
}

impl ChannelKey {
    /// Parse and normalize a base64 channel key
    ///
    /// # Arguments
    /// * `key` - base64 text, the `AQ==` placeholder, or empty
    ///
    /// # Returns
    /// The decoded key, or `KeyFormat` if the text is not base64
    pub fn parse(key: &str) -> CryptoResult<Self> {
        let text = normalize_key_text(key);
        if text.is_empty() {
            return Ok(ChannelKey::Unencrypted);
        }
        let bytes = BASE64
            .decode(text.as_bytes())
            .map_err(|e| CryptoError::KeyFormat(format!("{}: {}", key.trim(), e)))?;
        if bytes.is_empty() {
            return Ok(ChannelKey::Unencrypted);
        }
        Ok(ChannelKey::Key(bytes))
    }

    /// The canonical default channel key
    pub fn default_key() -> Self {
        // DEFAULT_KEY is a fixed valid literal
        match BASE64.decode(DEFAULT_KEY) {
            Ok(bytes) => ChannelKey::Key(bytes),
            Err(_) => ChannelKey::Unencrypted,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, ChannelKey::Key(_))
    }

    /// Raw key bytes; empty when unencrypted
    pub fn bytes(&self) -> &[u8] {
        match self {
            ChannelKey::Unencrypted => &[],
            ChannelKey::Key(bytes) => bytes,
        }
    }

    /// Standard base64 form, empty when unencrypted
    pub fn to_base64(&self) -> String {
        match self {
            ChannelKey::Unencrypted => String::new(),
            ChannelKey::Key(bytes) => BASE64.encode(bytes),
        }
    }
}

impl std::str::FromStr for ChannelKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
