//! Channel Hash
//!
//! One-byte channel short-code carried in every mesh packet:
//!
//! ```text
//! hash = xor(name bytes) ^ xor(key bytes)
//! ```
//!
//! Collisions are expected; receivers use it only to pick candidate keys.

use crate::key::ChannelKey;

/// XOR-fold a byte slice into one byte (0 for empty input)
#[inline]
pub fn xor_fold(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc ^ b)
}

/// Compute the channel hash for a channel name and normalized key
pub fn channel_hash(name: &str, key: &ChannelKey) -> u32 {
    (xor_fold(name.as_bytes()) ^ xor_fold(key.bytes())) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_channel_hash() {
        // LongFast with the default key is the well-known slot 8
        let key = ChannelKey::parse("AQ==").unwrap();
        assert_eq!(channel_hash("LongFast", &key), 8);
    }

    #[test]
    fn test_fold_is_order_independent() {
        let forward = b"MediumSlow";
        let mut reversed = forward.to_vec();
        reversed.reverse();
        assert_eq!(xor_fold(forward), xor_fold(&reversed));
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(xor_fold(&[]), 0);
        assert_eq!(channel_hash("", &ChannelKey::Unencrypted), 0);
        assert_eq!(
            channel_hash("LongFast", &ChannelKey::Unencrypted),
            xor_fold(b"LongFast") as u32
        );
    }
}
