//! Effective Spoof Parameters
//!
//! The identity and position a session asserts, resolved once at session
//! start. Each value comes from the first source that has one:
//!
//! ```text
//! explicit override (non-empty) -> stored record of the target -> default
//! ```

use meshjack_client::PacketEvent;
use meshjack_core::DEFAULT_HW_MODEL;
use meshjack_protocol::{degrees_to_fixed, Altitude, DecodedPayload, NodeIdentity, OutboundPayload};
use meshjack_store::NodeRecord;

/// Values given explicitly for a session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpoofOverrides {
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub hw_model: Option<u32>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt: Option<Altitude>,
    /// Public key as hex text
    pub pubkey: Option<String>,
}

/// Resolved session parameters
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveParams {
    pub short_name: String,
    pub long_name: String,
    pub hw_model: u32,
    pub lat: f64,
    pub lon: f64,
    pub alt: Altitude,
    pub pubkey: Option<String>,
}

impl Default for EffectiveParams {
    fn default() -> Self {
        Self {
            short_name: String::new(),
            long_name: String::new(),
            hw_model: DEFAULT_HW_MODEL,
            lat: 0.0,
            lon: 0.0,
            alt: Altitude(0.0),
            pubkey: None,
        }
    }
}

fn text(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

fn stored_text<F>(stored: Option<&NodeRecord>, pick: F) -> Option<String>
where
    F: Fn(&NodeRecord) -> &Option<String>,
{
    stored.and_then(|record| text(pick(record)))
}

/// Public keys travel as lowercase hex without padding
fn key_text(value: Option<String>) -> Option<String> {
    value.map(|key| key.trim().to_ascii_lowercase())
}

impl EffectiveParams {
    /// Resolve from overrides, then the stored record, then defaults
    pub fn resolve(overrides: &SpoofOverrides, stored: Option<&NodeRecord>) -> Self {
        let defaults = Self::default();
        Self {
            short_name: text(&overrides.short_name)
                .or_else(|| stored_text(stored, |r| &r.short_name))
                .unwrap_or(defaults.short_name),
            long_name: text(&overrides.long_name)
                .or_else(|| stored_text(stored, |r| &r.long_name))
                .unwrap_or(defaults.long_name),
            hw_model: overrides
                .hw_model
                .or_else(|| stored.and_then(|r| r.hw_model))
                .unwrap_or(defaults.hw_model),
            lat: overrides
                .lat
                .or_else(|| stored.and_then(|r| r.lat))
                .unwrap_or(defaults.lat),
            lon: overrides
                .lon
                .or_else(|| stored.and_then(|r| r.lon))
                .unwrap_or(defaults.lon),
            alt: overrides
                .alt
                .or_else(|| stored.and_then(|r| r.alt).map(|alt| Altitude(f64::from(alt))))
                .unwrap_or(defaults.alt),
            pubkey: key_text(text(&overrides.pubkey).or_else(|| stored_text(stored, |r| &r.pubkey))),
        }
    }

    pub fn identity(&self) -> NodeIdentity {
        NodeIdentity {
            long_name: self.long_name.clone(),
            short_name: self.short_name.clone(),
            hw_model: self.hw_model,
            public_key: self.pubkey.clone(),
        }
    }

    pub fn nodeinfo_payload(&self, want_response: bool) -> OutboundPayload {
        OutboundPayload::NodeInfo {
            identity: self.identity(),
            want_response,
        }
    }

    pub fn position_payload(&self) -> OutboundPayload {
        OutboundPayload::Position {
            lat: self.lat,
            lon: self.lon,
            alt: self.alt,
        }
    }

    /// Whether an observed announcement contradicts these values
    ///
    /// Positions are compared at wire precision. Events that are neither
    /// identity nor position never differ.
    pub fn differs_from(&self, event: &PacketEvent) -> bool {
        match &event.payload {
            DecodedPayload::NodeInfo(info) => {
                info.short_name != self.short_name
                    || info.long_name != self.long_name
                    || info.hw_model != self.hw_model
                    || info.public_key.as_deref().map(str::to_ascii_lowercase) != self.pubkey
            }
            DecodedPayload::Position(position) => {
                degrees_to_fixed(position.lat) != degrees_to_fixed(self.lat)
                    || degrees_to_fixed(position.lon) != degrees_to_fixed(self.lon)
                    || position.alt != self.alt.meters().round() as i32
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshjack_core::{NodeNumber, PortNum};
    use meshjack_protocol::{NodeInfoFields, PositionFields};
    use meshjack_store::NodeUpdate;

    fn stored() -> NodeRecord {
        let mut record = NodeRecord::new(NodeNumber(0xa1b2_c3d4));
        record.short_name = Some("BC".into());
        record.long_name = Some("Base Camp".into());
        record.hw_model = Some(9);
        record.lat = Some(10.5);
        record.lon = Some(20.25);
        record.alt = Some(100);
        record
    }

    fn event(payload: DecodedPayload, portnum: PortNum) -> PacketEvent {
        PacketEvent {
            packet_id: 1,
            from: NodeNumber(0xa1b2_c3d4),
            to: NodeNumber::BROADCAST,
            from_short_name: None,
            from_long_name: None,
            gateway_id: None,
            channel_id: "LongFast".into(),
            portnum: portnum.to_i32(),
            payload,
            update: NodeUpdate::default(),
            want_ack: false,
            rx_rssi: None,
            rx_snr: None,
        }
    }

    #[test]
    fn test_stored_value_used_without_override() {
        let params = EffectiveParams::resolve(&SpoofOverrides::default(), Some(&stored()));
        assert_eq!(params.lat, 10.5);
        assert_eq!(params.long_name, "Base Camp");
        assert_eq!(params.hw_model, 9);
        assert_eq!(params.alt, Altitude(100.0));
    }

    #[test]
    fn test_override_wins() {
        let overrides = SpoofOverrides {
            lat: Some(-5.0),
            short_name: Some("EVIL".into()),
            ..Default::default()
        };
        let params = EffectiveParams::resolve(&overrides, Some(&stored()));
        assert_eq!(params.lat, -5.0);
        assert_eq!(params.short_name, "EVIL");
        assert_eq!(params.lon, 20.25);
    }

    #[test]
    fn test_empty_text_override_ignored() {
        let overrides = SpoofOverrides {
            long_name: Some("  ".into()),
            ..Default::default()
        };
        let params = EffectiveParams::resolve(&overrides, Some(&stored()));
        assert_eq!(params.long_name, "Base Camp");
    }

    #[test]
    fn test_defaults_without_record() {
        let params = EffectiveParams::resolve(&SpoofOverrides::default(), None);
        assert_eq!(params, EffectiveParams::default());
        assert_eq!(params.hw_model, 43);
        assert!(params.pubkey.is_none());
    }

    #[test]
    fn test_differs_from_nodeinfo() {
        let params = EffectiveParams::resolve(&SpoofOverrides::default(), Some(&stored()));
        let same = NodeInfoFields {
            short_name: "BC".into(),
            long_name: "Base Camp".into(),
            hw_model: 9,
            public_key: None,
        };
        assert!(!params.differs_from(&event(DecodedPayload::NodeInfo(same.clone()), PortNum::NodeInfo)));

        let renamed = NodeInfoFields {
            long_name: "Real Name".into(),
            ..same
        };
        assert!(params.differs_from(&event(DecodedPayload::NodeInfo(renamed), PortNum::NodeInfo)));
    }

    #[test]
    fn test_announced_key_differs_from_keyless_identity() {
        let params = EffectiveParams::resolve(&SpoofOverrides::default(), Some(&stored()));
        assert!(params.pubkey.is_none());
        let keyed = NodeInfoFields {
            short_name: "BC".into(),
            long_name: "Base Camp".into(),
            hw_model: 9,
            public_key: Some("abcd".into()),
        };
        assert!(params.differs_from(&event(DecodedPayload::NodeInfo(keyed), PortNum::NodeInfo)));

        let overrides = SpoofOverrides {
            pubkey: Some("abcd".into()),
            ..Default::default()
        };
        let keyed_params = EffectiveParams::resolve(&overrides, Some(&stored()));
        let keyless = NodeInfoFields {
            short_name: "BC".into(),
            long_name: "Base Camp".into(),
            hw_model: 9,
            public_key: None,
        };
        assert!(keyed_params.differs_from(&event(DecodedPayload::NodeInfo(keyless), PortNum::NodeInfo)));
    }

    #[test]
    fn test_pubkey_normalised_to_wire_form() {
        let overrides = SpoofOverrides {
            pubkey: Some(" 0A0B0C ".into()),
            ..Default::default()
        };
        let params = EffectiveParams::resolve(&overrides, Some(&stored()));
        assert_eq!(params.pubkey.as_deref(), Some("0a0b0c"));

        let echo = NodeInfoFields {
            short_name: "BC".into(),
            long_name: "Base Camp".into(),
            hw_model: 9,
            public_key: Some("0a0b0c".into()),
        };
        assert!(!params.differs_from(&event(DecodedPayload::NodeInfo(echo), PortNum::NodeInfo)));

        let mut padded = stored();
        padded.pubkey = Some("ABCD\n".into());
        let params = EffectiveParams::resolve(&SpoofOverrides::default(), Some(&padded));
        assert_eq!(params.pubkey.as_deref(), Some("abcd"));
    }

    #[test]
    fn test_differs_from_position() {
        let params = EffectiveParams::resolve(&SpoofOverrides::default(), Some(&stored()));
        let here = PositionFields {
            lat: 10.5,
            lon: 20.25,
            alt: 100,
        };
        assert!(!params.differs_from(&event(DecodedPayload::Position(here), PortNum::Position)));

        let moved = PositionFields { lat: 10.6, ..here };
        assert!(params.differs_from(&event(DecodedPayload::Position(moved), PortNum::Position)));

        let text = event(DecodedPayload::Text("hi".into()), PortNum::TextMessage);
        assert!(!params.differs_from(&text));
    }
}
