//! Mesh Wire Messages
//!
//! Protobuf messages exchanged on the MQTT bridge, declared with `prost`
//! derives. Only the fields this toolkit reads or writes are declared;
//! unknown fields are skipped on decode.

/// Application data block, the plaintext inside every mesh packet
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Data {
    #[prost(int32, tag = "1")]
    pub portnum: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
    #[prost(bool, tag = "3")]
    pub want_response: bool,
    #[prost(fixed32, tag = "4")]
    pub dest: u32,
    #[prost(fixed32, tag = "5")]
    pub source: u32,
    #[prost(fixed32, tag = "6")]
    pub request_id: u32,
    #[prost(fixed32, tag = "7")]
    pub reply_id: u32,
    #[prost(fixed32, tag = "8")]
    pub emoji: u32,
    #[prost(uint32, optional, tag = "9")]
    pub bitfield: Option<u32>,
}

/// A single mesh packet as relayed by a gateway
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MeshPacket {
    #[prost(fixed32, tag = "1")]
    pub from: u32,
    #[prost(fixed32, tag = "2")]
    pub to: u32,
    #[prost(uint32, tag = "3")]
    pub channel: u32,
    #[prost(oneof = "mesh_packet::PayloadVariant", tags = "4, 5")]
    pub payload_variant: Option<mesh_packet::PayloadVariant>,
    #[prost(fixed32, tag = "6")]
    pub id: u32,
    #[prost(fixed32, tag = "7")]
    pub rx_time: u32,
    #[prost(float, tag = "8")]
    pub rx_snr: f32,
    #[prost(uint32, tag = "9")]
    pub hop_limit: u32,
    #[prost(bool, tag = "10")]
    pub want_ack: bool,
    #[prost(int32, tag = "11")]
    pub priority: i32,
    #[prost(int32, tag = "12")]
    pub rx_rssi: i32,
    #[prost(bool, tag = "14")]
    pub via_mqtt: bool,
    #[prost(uint32, tag = "15")]
    pub hop_start: u32,
    #[prost(bytes = "vec", tag = "16")]
    pub public_key: Vec<u8>,
    #[prost(bool, tag = "17")]
    pub pki_encrypted: bool,
}

pub mod mesh_packet {
    /// Either plaintext or enciphered `Data`
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum PayloadVariant {
        #[prost(message, tag = "4")]
        Decoded(super::Data),
        #[prost(bytes, tag = "5")]
        Encrypted(Vec<u8>),
    }
}

/// MQTT wrapper around a mesh packet
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServiceEnvelope {
    #[prost(message, optional, tag = "1")]
    pub packet: Option<MeshPacket>,
    #[prost(string, tag = "2")]
    pub channel_id: String,
    #[prost(string, tag = "3")]
    pub gateway_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Position {
    #[prost(sfixed32, optional, tag = "1")]
    pub latitude_i: Option<i32>,
    #[prost(sfixed32, optional, tag = "2")]
    pub longitude_i: Option<i32>,
    #[prost(int32, optional, tag = "3")]
    pub altitude: Option<i32>,
    #[prost(fixed32, tag = "4")]
    pub time: u32,
}

/// Node identity announcement
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct User {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub long_name: String,
    #[prost(string, tag = "3")]
    pub short_name: String,
    #[prost(bytes = "vec", tag = "4")]
    pub macaddr: Vec<u8>,
    #[prost(int32, tag = "5")]
    pub hw_model: i32,
    #[prost(bool, tag = "6")]
    pub is_licensed: bool,
    #[prost(int32, tag = "7")]
    pub role: i32,
    #[prost(bytes = "vec", tag = "8")]
    pub public_key: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RouteDiscovery {
    #[prost(fixed32, repeated, tag = "1")]
    pub route: Vec<u32>,
    #[prost(int32, repeated, tag = "2")]
    pub snr_towards: Vec<i32>,
    #[prost(fixed32, repeated, tag = "3")]
    pub route_back: Vec<u32>,
    #[prost(int32, repeated, tag = "4")]
    pub snr_back: Vec<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Routing {
    #[prost(oneof = "routing::Variant", tags = "1, 2, 3")]
    pub variant: Option<routing::Variant>,
}

pub mod routing {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Variant {
        #[prost(message, tag = "1")]
        RouteRequest(super::RouteDiscovery),
        #[prost(message, tag = "2")]
        RouteReply(super::RouteDiscovery),
        #[prost(int32, tag = "3")]
        ErrorReason(i32),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeviceMetrics {
    #[prost(uint32, optional, tag = "1")]
    pub battery_level: Option<u32>,
    #[prost(float, optional, tag = "2")]
    pub voltage: Option<f32>,
    #[prost(float, optional, tag = "3")]
    pub channel_utilization: Option<f32>,
    #[prost(float, optional, tag = "4")]
    pub air_util_tx: Option<f32>,
    #[prost(uint32, optional, tag = "5")]
    pub uptime_seconds: Option<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EnvironmentMetrics {
    #[prost(float, optional, tag = "1")]
    pub temperature: Option<f32>,
    #[prost(float, optional, tag = "2")]
    pub relative_humidity: Option<f32>,
    #[prost(float, optional, tag = "3")]
    pub barometric_pressure: Option<f32>,
    #[prost(float, optional, tag = "4")]
    pub gas_resistance: Option<f32>,
    #[prost(float, optional, tag = "5")]
    pub voltage: Option<f32>,
    #[prost(float, optional, tag = "6")]
    pub current: Option<f32>,
    #[prost(uint32, optional, tag = "7")]
    pub iaq: Option<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Telemetry {
    #[prost(fixed32, tag = "1")]
    pub time: u32,
    #[prost(oneof = "telemetry::Variant", tags = "2, 3")]
    pub variant: Option<telemetry::Variant>,
}

pub mod telemetry {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Variant {
        #[prost(message, tag = "2")]
        DeviceMetrics(super::DeviceMetrics),
        #[prost(message, tag = "3")]
        EnvironmentMetrics(super::EnvironmentMetrics),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_routing_ack_bytes() {
        let routing = Routing {
            variant: Some(routing::Variant::ErrorReason(0)),
        };
        assert_eq!(routing.encode_to_vec(), vec![0x18, 0x00]);
        let decoded = Routing::decode([0x18u8, 0x00].as_slice()).unwrap();
        assert_eq!(decoded.variant, Some(routing::Variant::ErrorReason(0)));
    }

    #[test]
    fn test_envelope_decode() {
        let envelope = ServiceEnvelope {
            packet: Some(MeshPacket {
                from: 0xa1b2_c3d4,
                to: 0xffff_ffff,
                id: 99,
                payload_variant: Some(mesh_packet::PayloadVariant::Encrypted(vec![1, 2, 3])),
                ..Default::default()
            }),
            channel_id: "LongFast".into(),
            gateway_id: "!a1b2c3d4".into(),
        };
        let bytes = envelope.encode_to_vec();
        let decoded = ServiceEnvelope::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(ServiceEnvelope::decode([0xffu8, 0xff, 0xff].as_slice()).is_err());
    }
}
