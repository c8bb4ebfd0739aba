//! AES-CTR Packet Cipher
//!
//! Mesh payloads are enciphered with AES in counter mode. The 128-bit
//! initial counter block is derived from the packet identity:
//!
//! ```text
//! nonce = LE64(packet_id) || LE64(from_node)
//! ```
//!
//! The key length picks AES-128 or AES-256. Encryption and decryption are
//! the same keystream transform.

use aes::{Aes128, Aes256};
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;

use crate::errors::{CryptoError, CryptoResult};
use crate::key::ChannelKey;

/// Counter block size (128 bits)
pub const NONCE_SIZE: usize = 16;

type Aes128Ctr = Ctr128BE<Aes128>;
type Aes256Ctr = Ctr128BE<Aes256>;

/// Build the counter block for a packet
pub fn packet_nonce(packet_id: u32, from_node: u32) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    nonce[0..8].copy_from_slice(&(packet_id as u64).to_le_bytes());
    nonce[8..16].copy_from_slice(&(from_node as u64).to_le_bytes());
    nonce
}

#[derive(Clone)]
enum CipherKey {
    Aes128([u8; 16]),
    Aes256([u8; 32]),
}

/// Packet Cipher - AES-CTR keyed by a channel key
#[derive(Clone)]
pub struct PacketCipher {
    key: CipherKey,
}

impl std::fmt::Debug for PacketCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bits = match self.key {
            CipherKey::Aes128(_) => 128,
            CipherKey::Aes256(_) => 256,
        };
        f.debug_struct("PacketCipher").field("bits", &bits).finish()
    }
}

impl PacketCipher {
    /// Create a cipher from raw key bytes
    ///
    /// # Arguments
    /// * `key` - 16 or 32 bytes
    ///
    /// # Returns
    /// `KeyFormat` for any other length
    pub fn new(key: &[u8]) -> CryptoResult<Self> {
        let key = match key.len() {
            16 => {
                let mut k = [0u8; 16];
                k.copy_from_slice(key);
                CipherKey::Aes128(k)
            }
            32 => {
                let mut k = [0u8; 32];
                k.copy_from_slice(key);
                CipherKey::Aes256(k)
            }
            other => {
                return Err(CryptoError::KeyFormat(format!(
                    "key must be 16 or 32 bytes, got {}",
                    other
                )))
            }
        };
        Ok(Self { key })
    }

    /// Create a cipher for a channel key; `None` when the channel is unencrypted
    pub fn for_channel(key: &ChannelKey) -> CryptoResult<Option<Self>> {
        match key {
            ChannelKey::Unencrypted => Ok(None),
            ChannelKey::Key(bytes) => Self::new(bytes).map(Some),
        }
    }

    /// Apply the keystream for a packet in place
    pub fn apply(&self, packet_id: u32, from_node: u32, data: &mut [u8]) -> CryptoResult<()> {
        let nonce = packet_nonce(packet_id, from_node);
        match &self.key {
            CipherKey::Aes128(key) => {
                let mut cipher = Aes128Ctr::new_from_slices(key, &nonce)
                    .map_err(|e| CryptoError::KeyFormat(e.to_string()))?;
                cipher.apply_keystream(data);
            }
            CipherKey::Aes256(key) => {
                let mut cipher = Aes256Ctr::new_from_slices(key, &nonce)
                    .map_err(|e| CryptoError::KeyFormat(e.to_string()))?;
                cipher.apply_keystream(data);
            }
        }
        Ok(())
    }

    /// Encrypt a serialized `Data` block
    pub fn encrypt(&self, packet_id: u32, from_node: u32, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let mut buf = plaintext.to_vec();
        self.apply(packet_id, from_node, &mut buf)?;
        Ok(buf)
    }

    /// Decrypt an encrypted block back into serialized `Data` bytes
    pub fn decrypt(&self, packet_id: u32, from_node: u32, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        self.encrypt(packet_id, from_node, ciphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_bytes(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(29).wrapping_add(7)).collect()
    }

    #[test]
    fn test_nonce_layout() {
        let nonce = packet_nonce(0x0102_0304, 0xa1b2_c3d4);
        assert_eq!(&nonce[0..8], &[0x04, 0x03, 0x02, 0x01, 0, 0, 0, 0]);
        assert_eq!(&nonce[8..16], &[0xd4, 0xc3, 0xb2, 0xa1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_roundtrip_128_and_256() {
        for key_len in [16, 32] {
            let cipher = PacketCipher::new(&key_bytes(key_len)).unwrap();
            for len in [0usize, 1, 15, 16, 17, 64, 237] {
                let plaintext: Vec<u8> = (0..len).map(|i| i as u8).collect();
                let ct = cipher.encrypt(1234, 0xdead_beef, &plaintext).unwrap();
                assert_eq!(ct.len(), plaintext.len());
                let pt = cipher.decrypt(1234, 0xdead_beef, &ct).unwrap();
                assert_eq!(pt, plaintext);
            }
        }
    }

    #[test]
    fn test_nonce_changes_keystream() {
        let cipher = PacketCipher::new(&key_bytes(16)).unwrap();
        let plaintext = [0u8; 32];
        let a = cipher.encrypt(1, 42, &plaintext).unwrap();
        let b = cipher.encrypt(2, 42, &plaintext).unwrap();
        let c = cipher.encrypt(1, 43, &plaintext).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_rejects_bad_key_length() {
        assert!(matches!(PacketCipher::new(&[1u8]), Err(CryptoError::KeyFormat(_))));
        assert!(matches!(PacketCipher::new(&[0u8; 24]), Err(CryptoError::KeyFormat(_))));
    }

    #[test]
    fn test_for_channel() {
        assert!(PacketCipher::for_channel(&ChannelKey::Unencrypted).unwrap().is_none());
        assert!(PacketCipher::for_channel(&ChannelKey::default_key()).unwrap().is_some());
        // The bare placeholder byte is never used as a key
        assert!(PacketCipher::for_channel(&ChannelKey::Key(vec![1])).is_err());
    }
}
