//! Application Payload Codec
//!
//! Builders for the outbound payloads this toolkit crafts, and parsers that
//! normalize inbound payloads into plain records.
//!
//! | Port       | Outbound                     | Inbound                         |
//! |------------|------------------------------|---------------------------------|
//! | TEXT       | UTF-8 text                   | text                            |
//! | POSITION   | lat/lon x1e7, alt (m), time  | lat/lon /1e7, alt               |
//! | NODEINFO   | `User`                       | names, hw model, pubkey (hex)   |
//! | TRACEROUTE | empty, want_response         | route list                      |
//! | ROUTING    | ack (`18 00`)                | error reason                    |
//! | TELEMETRY  | -                            | device or environment metrics   |
//! | RANGE_TEST | -                            | text                            |

use std::fmt;
use std::str::FromStr;

use meshjack_core::{NodeNumber, PortNum, COORDINATE_SCALE, DATA_BITFIELD, FEET_PER_METER};
use prost::Message;
use tracing::warn;

use crate::errors::{ProtocolError, ProtocolResult};
use crate::proto::{
    routing, telemetry, Data, DeviceMetrics, EnvironmentMetrics, Position, RouteDiscovery, Routing,
    Telemetry, User,
};

/// Serialized `Routing { error_reason: NONE }`
pub const ROUTING_ACK_PAYLOAD: [u8; 2] = [0x18, 0x00];

// =============================================================================
// ALTITUDE
// =============================================================================

/// Altitude in meters, parsed from text that may carry a unit marker
///
/// `"520"` and `"520m"` are meters; `"1706ft"` is converted from feet.
/// The sign is preserved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Altitude(pub f64);

impl Altitude {
    pub fn meters(self) -> f64 {
        self.0
    }
}

impl FromStr for Altitude {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().to_ascii_lowercase();
        let (number, factor) = if let Some(feet) = text.strip_suffix("ft") {
            (feet, 1.0 / FEET_PER_METER)
        } else if let Some(meters) = text.strip_suffix('m') {
            (meters, 1.0)
        } else {
            (text.as_str(), 1.0)
        };
        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| ProtocolError::InvalidAltitude(s.to_string()))?;
        if !value.is_finite() {
            return Err(ProtocolError::InvalidAltitude(s.to_string()));
        }
        Ok(Altitude(value * factor))
    }
}

impl fmt::Display for Altitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.0)
    }
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// Identity announced in a NodeInfo packet
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeIdentity {
    pub long_name: String,
    pub short_name: String,
    pub hw_model: u32,
    /// Public key as hex text
    pub public_key: Option<String>,
}

/// Outbound application payloads
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundPayload {
    Text(String),
    Position { lat: f64, lon: f64, alt: Altitude },
    NodeInfo { identity: NodeIdentity, want_response: bool },
    Traceroute,
    Ack { request_id: u32 },
}

impl OutboundPayload {
    pub fn portnum(&self) -> PortNum {
        match self {
            OutboundPayload::Text(_) => PortNum::TextMessage,
            OutboundPayload::Position { .. } => PortNum::Position,
            OutboundPayload::NodeInfo { .. } => PortNum::NodeInfo,
            OutboundPayload::Traceroute => PortNum::Traceroute,
            OutboundPayload::Ack { .. } => PortNum::Routing,
        }
    }

    /// Build the `Data` block
    ///
    /// # Arguments
    /// * `from` - sending node (NodeInfo embeds its id)
    /// * `now` - Unix time stamped into position payloads
    pub fn to_data(&self, from: NodeNumber, now: u32) -> ProtocolResult<Data> {
        match self {
            OutboundPayload::Text(text) => Ok(text_data(text)),
            OutboundPayload::Position { lat, lon, alt } => {
                check_coordinates(*lat, *lon)?;
                Ok(position_data(*lat, *lon, *alt, now))
            }
            OutboundPayload::NodeInfo {
                identity,
                want_response,
            } => nodeinfo_data(from, identity, *want_response),
            OutboundPayload::Traceroute => Ok(traceroute_data()),
            OutboundPayload::Ack { request_id } => Ok(ack_data(*request_id)),
        }
    }
}

pub fn text_data(text: &str) -> Data {
    Data {
        portnum: PortNum::TextMessage.to_i32(),
        payload: text.as_bytes().to_vec(),
        bitfield: Some(DATA_BITFIELD),
        ..Default::default()
    }
}

/// Latitude within ±90 and longitude within ±180 degrees
pub fn check_coordinates(lat: f64, lon: f64) -> ProtocolResult<()> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(ProtocolError::InvalidCoordinate(format!("latitude {}", lat)));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(ProtocolError::InvalidCoordinate(format!("longitude {}", lon)));
    }
    Ok(())
}

/// Scale degrees to the wire's fixed-point integer
pub fn degrees_to_fixed(degrees: f64) -> i32 {
    (degrees * COORDINATE_SCALE).round() as i32
}

pub fn fixed_to_degrees(fixed: i32) -> f64 {
    fixed as f64 / COORDINATE_SCALE
}

pub fn position_data(lat: f64, lon: f64, alt: Altitude, now: u32) -> Data {
    let position = Position {
        latitude_i: Some(degrees_to_fixed(lat)),
        longitude_i: Some(degrees_to_fixed(lon)),
        altitude: Some(alt.meters().round() as i32),
        time: now,
    };
    Data {
        portnum: PortNum::Position.to_i32(),
        payload: position.encode_to_vec(),
        want_response: true,
        bitfield: Some(DATA_BITFIELD),
        ..Default::default()
    }
}

pub fn nodeinfo_data(from: NodeNumber, identity: &NodeIdentity, want_response: bool) -> ProtocolResult<Data> {
    let public_key = match identity.public_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => hex::decode(key)?,
        _ => Vec::new(),
    };
    let node_id = from.to_node_id();
    let user = User {
        id: node_id.trim_start_matches('!').to_string(),
        long_name: identity.long_name.clone(),
        short_name: identity.short_name.clone(),
        hw_model: identity.hw_model as i32,
        public_key,
        ..Default::default()
    };
    Ok(Data {
        portnum: PortNum::NodeInfo.to_i32(),
        payload: user.encode_to_vec(),
        want_response,
        bitfield: Some(DATA_BITFIELD),
        ..Default::default()
    })
}

pub fn traceroute_data() -> Data {
    Data {
        portnum: PortNum::Traceroute.to_i32(),
        want_response: true,
        bitfield: Some(DATA_BITFIELD),
        ..Default::default()
    }
}

pub fn ack_data(request_id: u32) -> Data {
    Data {
        portnum: PortNum::Routing.to_i32(),
        payload: ROUTING_ACK_PAYLOAD.to_vec(),
        request_id,
        ..Default::default()
    }
}

// =============================================================================
// INBOUND
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeInfoFields {
    pub short_name: String,
    pub long_name: String,
    pub hw_model: u32,
    pub public_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionFields {
    pub lat: f64,
    pub lon: f64,
    pub alt: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeviceFields {
    pub battery_level: Option<u32>,
    pub voltage: Option<f64>,
    pub channel_utilization: Option<f64>,
    pub air_util_tx: Option<f64>,
    pub uptime_seconds: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnvironmentFields {
    pub temperature: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub barometric_pressure: Option<f64>,
    pub gas_resistance: Option<f64>,
    pub iaq: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryFields {
    Device(DeviceFields),
    Environment(EnvironmentFields),
    /// Undecodable, or a telemetry variant we do not track
    Empty,
}

/// Normalized inbound payload
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedPayload {
    NodeInfo(NodeInfoFields),
    Position(PositionFields),
    Telemetry(TelemetryFields),
    Text(String),
    RangeTest(String),
    Traceroute(Vec<u32>),
    Routing { error_reason: Option<i32> },
    /// A known port whose payload did not parse
    Malformed { portnum: i32 },
    /// Port we do not decode
    Other { portnum: i32, size: usize },
}

impl DecodedPayload {
    /// Short tag for logs
    pub fn kind(&self) -> &'static str {
        match self {
            DecodedPayload::NodeInfo(_) => "nodeinfo",
            DecodedPayload::Position(_) => "position",
            DecodedPayload::Telemetry(_) => "telemetry",
            DecodedPayload::Text(_) => "text",
            DecodedPayload::RangeTest(_) => "range_test",
            DecodedPayload::Traceroute(_) => "traceroute",
            DecodedPayload::Routing { .. } => "routing",
            DecodedPayload::Malformed { .. } => "malformed",
            DecodedPayload::Other { .. } => "other",
        }
    }
}

/// Round to two decimals, treating zero as absent
fn metric(value: Option<f32>) -> Option<f64> {
    value
        .filter(|v| *v != 0.0)
        .map(|v| (v as f64 * 100.0).round() / 100.0)
}

fn nonzero(value: Option<u32>) -> Option<u32> {
    value.filter(|v| *v != 0)
}

pub fn parse_nodeinfo(payload: &[u8]) -> ProtocolResult<NodeInfoFields> {
    let user = User::decode(payload)?;
    Ok(NodeInfoFields {
        short_name: user.short_name,
        long_name: user.long_name,
        hw_model: user.hw_model.max(0) as u32,
        public_key: if user.public_key.is_empty() {
            None
        } else {
            Some(hex::encode(&user.public_key))
        },
    })
}

pub fn parse_position(payload: &[u8]) -> ProtocolResult<PositionFields> {
    let position = Position::decode(payload)?;
    Ok(PositionFields {
        lat: fixed_to_degrees(position.latitude_i.unwrap_or(0)),
        lon: fixed_to_degrees(position.longitude_i.unwrap_or(0)),
        alt: position.altitude.unwrap_or(0),
    })
}

/// Parse telemetry; failures yield `Empty`
pub fn parse_telemetry(payload: &[u8]) -> TelemetryFields {
    let telemetry = match Telemetry::decode(payload) {
        Ok(telemetry) => telemetry,
        Err(e) => {
            warn!(error = %e, "Telemetry failed to decode");
            return TelemetryFields::Empty;
        }
    };
    match telemetry.variant {
        Some(telemetry::Variant::DeviceMetrics(m)) => TelemetryFields::Device(device_fields(&m)),
        Some(telemetry::Variant::EnvironmentMetrics(m)) => {
            TelemetryFields::Environment(environment_fields(&m))
        }
        None => TelemetryFields::Empty,
    }
}

fn device_fields(m: &DeviceMetrics) -> DeviceFields {
    DeviceFields {
        battery_level: m.battery_level,
        voltage: metric(m.voltage),
        channel_utilization: metric(m.channel_utilization),
        air_util_tx: metric(m.air_util_tx),
        uptime_seconds: m.uptime_seconds,
    }
}

fn environment_fields(m: &EnvironmentMetrics) -> EnvironmentFields {
    EnvironmentFields {
        temperature: metric(m.temperature),
        relative_humidity: metric(m.relative_humidity),
        barometric_pressure: metric(m.barometric_pressure),
        gas_resistance: metric(m.gas_resistance),
        iaq: nonzero(m.iaq),
    }
}

pub fn parse_traceroute(payload: &[u8]) -> ProtocolResult<Vec<u32>> {
    Ok(RouteDiscovery::decode(payload)?.route)
}

pub fn parse_routing(payload: &[u8]) -> ProtocolResult<Option<i32>> {
    let routing = Routing::decode(payload)?;
    Ok(match routing.variant {
        Some(routing::Variant::ErrorReason(reason)) => Some(reason),
        _ => None,
    })
}

/// Parse a `Data` block's payload by port
///
/// Parse failures are logged and reported as `Malformed`; they never abort
/// processing of the packet.
pub fn parse_payload(data: &Data) -> DecodedPayload {
    let payload = data.payload.as_slice();
    let malformed = |e: ProtocolError| {
        warn!(portnum = data.portnum, error = %e, "Payload failed to decode");
        DecodedPayload::Malformed {
            portnum: data.portnum,
        }
    };

    match PortNum::from_i32(data.portnum) {
        Some(PortNum::NodeInfo) => parse_nodeinfo(payload).map(DecodedPayload::NodeInfo).unwrap_or_else(malformed),
        Some(PortNum::Position) => parse_position(payload).map(DecodedPayload::Position).unwrap_or_else(malformed),
        Some(PortNum::Telemetry) => DecodedPayload::Telemetry(parse_telemetry(payload)),
        Some(PortNum::TextMessage) => DecodedPayload::Text(String::from_utf8_lossy(payload).into_owned()),
        Some(PortNum::RangeTest) => DecodedPayload::RangeTest(String::from_utf8_lossy(payload).into_owned()),
        Some(PortNum::Traceroute) => parse_traceroute(payload).map(DecodedPayload::Traceroute).unwrap_or_else(malformed),
        Some(PortNum::Routing) => parse_routing(payload)
            .map(|error_reason| DecodedPayload::Routing { error_reason })
            .unwrap_or_else(malformed),
        _ => DecodedPayload::Other {
            portnum: data.portnum,
            size: payload.len(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_altitude_units() {
        assert_eq!("520".parse::<Altitude>().unwrap(), Altitude(520.0));
        assert_eq!("520m".parse::<Altitude>().unwrap(), Altitude(520.0));
        let feet: Altitude = "1706ft".parse().unwrap();
        assert!((feet.meters() - 520.0).abs() < 0.05);
        let below: Altitude = "-10ft".parse().unwrap();
        assert!(below.meters() < 0.0);
        assert!("high".parse::<Altitude>().is_err());
    }

    #[test]
    fn test_position_roundtrip() {
        let data = position_data(-33.4489, -70.6693, Altitude(520.0), 1_700_000_000);
        assert_eq!(data.portnum, PortNum::Position.to_i32());
        assert!(data.want_response);
        assert_eq!(data.bitfield, Some(1));

        let fields = parse_position(&data.payload).unwrap();
        assert!((fields.lat - -33.4489).abs() < 1e-6);
        assert!((fields.lon - -70.6693).abs() < 1e-6);
        assert_eq!(fields.alt, 520);

        let raw = Position::decode(data.payload.as_slice()).unwrap();
        assert_eq!(raw.time, 1_700_000_000);
    }

    #[test]
    fn test_nodeinfo_build_and_parse() {
        let identity = NodeIdentity {
            long_name: "Base Camp".into(),
            short_name: "BC".into(),
            hw_model: 43,
            public_key: Some("0a0b0c".into()),
        };
        let data = nodeinfo_data(NodeNumber(0xa1b2_c3d4), &identity, true).unwrap();
        assert!(data.want_response);

        let user = User::decode(data.payload.as_slice()).unwrap();
        assert_eq!(user.id, "a1b2c3d4");
        assert_eq!(user.public_key, vec![0x0a, 0x0b, 0x0c]);

        let fields = parse_nodeinfo(&data.payload).unwrap();
        assert_eq!(fields.long_name, "Base Camp");
        assert_eq!(fields.short_name, "BC");
        assert_eq!(fields.hw_model, 43);
        assert_eq!(fields.public_key.as_deref(), Some("0a0b0c"));
    }

    #[test]
    fn test_nodeinfo_without_pubkey() {
        let identity = NodeIdentity {
            hw_model: 9,
            ..Default::default()
        };
        let data = nodeinfo_data(NodeNumber(1), &identity, false).unwrap();
        assert!(!data.want_response);
        assert_eq!(parse_nodeinfo(&data.payload).unwrap().public_key, None);
    }

    #[test]
    fn test_nodeinfo_bad_pubkey() {
        let identity = NodeIdentity {
            public_key: Some("zz".into()),
            ..Default::default()
        };
        assert!(matches!(
            nodeinfo_data(NodeNumber(1), &identity, false),
            Err(ProtocolError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_position_outside_globe_rejected() {
        let position = |lat, lon| OutboundPayload::Position {
            lat,
            lon,
            alt: Altitude(0.0),
        };
        for (lat, lon) in [(91.0, 0.0), (-90.5, 0.0), (0.0, 181.0), (0.0, -181.0), (f64::NAN, 0.0)] {
            assert!(matches!(
                position(lat, lon).to_data(NodeNumber(1), 0),
                Err(ProtocolError::InvalidCoordinate(_))
            ));
        }
        assert!(position(90.0, -180.0).to_data(NodeNumber(1), 0).is_ok());
        assert!(check_coordinates(-33.4489, -70.6693).is_ok());
    }

    #[test]
    fn test_ack_and_traceroute() {
        let ack = ack_data(1234);
        assert_eq!(ack.portnum, PortNum::Routing.to_i32());
        assert_eq!(ack.request_id, 1234);
        assert_eq!(ack.payload, vec![0x18, 0x00]);
        assert_eq!(parse_routing(&ack.payload).unwrap(), Some(0));

        let trace = traceroute_data();
        assert!(trace.payload.is_empty());
        assert!(trace.want_response);
        assert_eq!(trace.bitfield, Some(1));
    }

    #[test]
    fn test_telemetry_device_rounding() {
        let payload = Telemetry {
            time: 1,
            variant: Some(telemetry::Variant::DeviceMetrics(DeviceMetrics {
                battery_level: Some(87),
                voltage: Some(4.1234),
                channel_utilization: Some(0.0),
                air_util_tx: Some(1.005),
                uptime_seconds: Some(3600),
            })),
        }
        .encode_to_vec();

        match parse_telemetry(&payload) {
            TelemetryFields::Device(d) => {
                assert_eq!(d.battery_level, Some(87));
                assert_eq!(d.voltage, Some(4.12));
                assert_eq!(d.channel_utilization, None);
                assert!(d.air_util_tx.is_some());
                assert_eq!(d.uptime_seconds, Some(3600));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_telemetry_environment() {
        let payload = Telemetry {
            time: 1,
            variant: Some(telemetry::Variant::EnvironmentMetrics(EnvironmentMetrics {
                temperature: Some(21.456),
                relative_humidity: Some(40.0),
                iaq: Some(0),
                ..Default::default()
            })),
        }
        .encode_to_vec();

        match parse_telemetry(&payload) {
            TelemetryFields::Environment(e) => {
                assert_eq!(e.temperature, Some(21.46));
                assert_eq!(e.relative_humidity, Some(40.0));
                assert_eq!(e.barometric_pressure, None);
                assert_eq!(e.iaq, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_telemetry_garbage_is_empty() {
        assert_eq!(parse_telemetry(&[0xff, 0xff, 0xff]), TelemetryFields::Empty);
        assert_eq!(parse_telemetry(&[]), TelemetryFields::Empty);
    }

    #[test]
    fn test_parse_payload_dispatch() {
        assert_eq!(parse_payload(&text_data("hola")), DecodedPayload::Text("hola".into()));

        let route = RouteDiscovery {
            route: vec![1, 2, 3],
            ..Default::default()
        };
        let data = Data {
            portnum: PortNum::Traceroute.to_i32(),
            payload: route.encode_to_vec(),
            ..Default::default()
        };
        assert_eq!(parse_payload(&data), DecodedPayload::Traceroute(vec![1, 2, 3]));

        let opaque = Data {
            portnum: PortNum::Waypoint.to_i32(),
            payload: vec![1, 2, 3, 4],
            ..Default::default()
        };
        assert_eq!(parse_payload(&opaque), DecodedPayload::Other { portnum: 8, size: 4 });

        let broken = Data {
            portnum: PortNum::NodeInfo.to_i32(),
            payload: vec![0xff, 0xff, 0xff],
            ..Default::default()
        };
        assert_eq!(parse_payload(&broken), DecodedPayload::Malformed { portnum: 4 });
    }

    #[test]
    fn test_outbound_portnums() {
        assert_eq!(OutboundPayload::Traceroute.portnum(), PortNum::Traceroute);
        assert_eq!(OutboundPayload::Ack { request_id: 1 }.portnum(), PortNum::Routing);
        let data = OutboundPayload::Text("x".into()).to_data(NodeNumber(1), 0).unwrap();
        assert_eq!(data.portnum, 1);
    }
}
