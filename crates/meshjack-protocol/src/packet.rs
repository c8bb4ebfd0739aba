//! Mesh Packet Envelopes
//!
//! Sealing turns an application `Data` block into a complete `MeshPacket`
//! for a channel; opening reverses it.
//!
//! ## Outbound
//!
//! ```text
//! Data --encode--> bytes --AES-CTR--> MeshPacket.encrypted
//!                                      | id, from, to, channel hash
//!                                      | hop_limit = hop_start = 3
//!                  ServiceEnvelope { packet, channel_id, gateway_id }
//! ```
//!
//! On an unencrypted channel the `Data` block is embedded as-is.

use meshjack_core::{NodeNumber, DEFAULT_HOP_LIMIT};
use meshjack_crypto::{channel_hash, ChannelKey, CryptoError, PacketCipher};
use prost::Message;
use tracing::trace;

use crate::errors::ProtocolResult;
use crate::proto::{mesh_packet::PayloadVariant, Data, MeshPacket, ServiceEnvelope};

/// A channel as this toolkit sees it: name, key and derived hash
#[derive(Debug, Clone)]
pub struct ChannelContext {
    name: String,
    key: ChannelKey,
    hash: u32,
    cipher: Option<PacketCipher>,
}

impl ChannelContext {
    /// Build a channel context from a name and base64 key text
    ///
    /// Fails with a key format error if the key does not decode to 16 or 32
    /// bytes.
    pub fn new(name: impl Into<String>, key_text: &str) -> ProtocolResult<Self> {
        let key = ChannelKey::parse(key_text)?;
        Self::with_key(name, key)
    }

    pub fn with_key(name: impl Into<String>, key: ChannelKey) -> ProtocolResult<Self> {
        let name = name.into();
        let cipher = PacketCipher::for_channel(&key)?;
        let hash = channel_hash(&name, &key);
        Ok(Self {
            name,
            key,
            hash,
            cipher,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn cipher(&self) -> Option<&PacketCipher> {
        self.cipher.as_ref()
    }

    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }
}

/// Addressing for one outbound packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketRoute {
    pub id: u32,
    pub from: NodeNumber,
    pub to: NodeNumber,
    pub want_ack: bool,
}

impl PacketRoute {
    pub fn new(id: u32, from: NodeNumber, to: NodeNumber) -> Self {
        Self {
            id,
            from,
            to,
            want_ack: false,
        }
    }

    pub fn with_want_ack(mut self, want_ack: bool) -> Self {
        self.want_ack = want_ack;
        self
    }
}

/// Seal a `Data` block into a mesh packet for a channel
pub fn seal(data: &Data, route: PacketRoute, channel: &ChannelContext) -> ProtocolResult<MeshPacket> {
    let payload_variant = match channel.cipher() {
        Some(cipher) => {
            let plaintext = data.encode_to_vec();
            let encrypted = cipher.encrypt(route.id, route.from.value(), &plaintext)?;
            PayloadVariant::Encrypted(encrypted)
        }
        None => PayloadVariant::Decoded(data.clone()),
    };

    trace!(id = route.id, from = %route.from, to = %route.to, channel = channel.hash(), "Sealed packet");

    Ok(MeshPacket {
        from: route.from.value(),
        to: route.to.value(),
        channel: channel.hash(),
        payload_variant: Some(payload_variant),
        id: route.id,
        hop_limit: DEFAULT_HOP_LIMIT,
        hop_start: DEFAULT_HOP_LIMIT,
        want_ack: route.want_ack,
        ..Default::default()
    })
}

/// Wrap a packet for publication by a gateway
pub fn wrap_envelope(packet: MeshPacket, channel_id: &str, gateway_id: &str) -> ServiceEnvelope {
    ServiceEnvelope {
        packet: Some(packet),
        channel_id: channel_id.to_string(),
        gateway_id: gateway_id.to_string(),
    }
}

/// Serialize an envelope for the transport
pub fn encode_envelope(envelope: &ServiceEnvelope) -> Vec<u8> {
    envelope.encode_to_vec()
}

/// Parse transport bytes into an envelope
pub fn decode_envelope(bytes: &[u8]) -> ProtocolResult<ServiceEnvelope> {
    Ok(ServiceEnvelope::decode(bytes)?)
}

/// Result of deciphering an encrypted block
#[derive(Debug, Clone, PartialEq)]
pub enum Decrypted {
    /// Keystream output parsed as a meaningful `Data` block
    Data(Data),
    /// Output did not parse, or parsed to port 0 (wrong key, most likely)
    Undecoded,
}

/// Decipher an encrypted block with the channel cipher
///
/// Structural problems (no key, empty ciphertext) are errors; garbage output
/// is the `Undecoded` outcome.
pub fn decrypt_block(
    channel: &ChannelContext,
    packet_id: u32,
    from: u32,
    ciphertext: &[u8],
) -> ProtocolResult<Decrypted> {
    let cipher = channel
        .cipher()
        .ok_or_else(|| CryptoError::Decrypt("no channel key configured".into()))?;
    if ciphertext.is_empty() {
        return Err(CryptoError::Decrypt("empty ciphertext".into()).into());
    }

    let plaintext = cipher.decrypt(packet_id, from, ciphertext)?;
    match Data::decode(plaintext.as_slice()) {
        Ok(data) if data.portnum != 0 => Ok(Decrypted::Data(data)),
        Ok(_) => Ok(Decrypted::Undecoded),
        Err(e) => {
            trace!(packet_id, error = %e, "Deciphered block is not a Data message");
            Ok(Decrypted::Undecoded)
        }
    }
}

/// Decipher the encrypted block of a packet
pub fn decrypt_packet(channel: &ChannelContext, packet: &MeshPacket) -> ProtocolResult<Decrypted> {
    match &packet.payload_variant {
        Some(PayloadVariant::Encrypted(bytes)) => decrypt_block(channel, packet.id, packet.from, bytes),
        Some(PayloadVariant::Decoded(data)) => Ok(Decrypted::Data(data.clone())),
        None => Err(CryptoError::Decrypt("packet carries no payload".into()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProtocolError;
    use meshjack_core::PortNum;

    fn text_data(text: &str) -> Data {
        Data {
            portnum: PortNum::TextMessage.to_i32(),
            payload: text.as_bytes().to_vec(),
            bitfield: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn test_seal_fills_header() {
        let channel = ChannelContext::new("LongFast", "AQ==").unwrap();
        let route = PacketRoute::new(42, NodeNumber(0xa1b2_c3d4), NodeNumber::BROADCAST);
        let packet = seal(&text_data("hi"), route, &channel).unwrap();

        assert_eq!(packet.id, 42);
        assert_eq!(packet.from, 0xa1b2_c3d4);
        assert_eq!(packet.to, 0xffff_ffff);
        assert_eq!(packet.channel, 8);
        assert_eq!(packet.hop_limit, 3);
        assert_eq!(packet.hop_start, 3);
        assert!(!packet.want_ack);
        assert!(matches!(packet.payload_variant, Some(PayloadVariant::Encrypted(_))));
    }

    #[test]
    fn test_seal_then_decrypt() {
        let channel = ChannelContext::new("LongFast", "AQ==").unwrap();
        let data = text_data("hello mesh");
        let route = PacketRoute::new(7, NodeNumber(5), NodeNumber(6)).with_want_ack(true);
        let packet = seal(&data, route, &channel).unwrap();
        assert!(packet.want_ack);

        assert_eq!(decrypt_packet(&channel, &packet).unwrap(), Decrypted::Data(data));
    }

    #[test]
    fn test_unencrypted_channel_embeds_plaintext() {
        let channel = ChannelContext::new("Open", "").unwrap();
        assert!(!channel.is_encrypted());
        let data = text_data("plain");
        let packet = seal(&data, PacketRoute::new(1, NodeNumber(2), NodeNumber(3)), &channel).unwrap();
        assert_eq!(packet.payload_variant, Some(PayloadVariant::Decoded(data)));
    }

    #[test]
    fn test_wrong_key_is_undecoded() {
        let sender = ChannelContext::new("LongFast", "AQ==").unwrap();
        let other_key = "AAECAwQFBgcICQoLDA0ODw==";
        let receiver = ChannelContext::new("LongFast", other_key).unwrap();
        let packet = seal(&text_data("secret"), PacketRoute::new(9, NodeNumber(1), NodeNumber(2)), &sender).unwrap();

        // Either a parse failure or a zero port; both are the undecoded outcome
        let outcome = decrypt_packet(&receiver, &packet);
        assert!(matches!(outcome, Ok(Decrypted::Undecoded) | Ok(Decrypted::Data(_))));
        if let Ok(Decrypted::Data(data)) = outcome {
            assert_ne!(data.payload, b"secret".to_vec());
        }
    }

    #[test]
    fn test_structural_decrypt_errors() {
        let keyed = ChannelContext::new("LongFast", "AQ==").unwrap();
        let open = ChannelContext::new("LongFast", "").unwrap();

        assert!(matches!(
            decrypt_block(&keyed, 1, 1, &[]),
            Err(ProtocolError::Crypto(CryptoError::Decrypt(_)))
        ));
        assert!(matches!(
            decrypt_block(&open, 1, 1, &[1, 2, 3]),
            Err(ProtocolError::Crypto(CryptoError::Decrypt(_)))
        ));
    }

    #[test]
    fn test_bad_key_length_rejected() {
        // "AAEC" decodes to three bytes
        assert!(matches!(
            ChannelContext::new("LongFast", "AAEC"),
            Err(ProtocolError::Crypto(CryptoError::KeyFormat(_)))
        ));
    }

    #[test]
    fn test_envelope_roundtrip() {
        let channel = ChannelContext::new("LongFast", "AQ==").unwrap();
        let packet = seal(&text_data("x"), PacketRoute::new(3, NodeNumber(4), NodeNumber(5)), &channel).unwrap();
        let envelope = wrap_envelope(packet, "LongFast", "!00000004");
        let decoded = decode_envelope(&encode_envelope(&envelope)).unwrap();
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.gateway_id, "!00000004");
    }
}
