//! Mesh Constants
//!
//! Port numbers, routing error codes, defaults and wire parameters shared by
//! every meshjack crate.

// =============================================================================
// ADDRESSING
// =============================================================================

/// Node number addressing every node on the mesh
pub const BROADCAST_NUM: u32 = 0xffff_ffff;

/// Node ID form of the broadcast address
pub const BROADCAST_ID: &str = "!ffffffff";

/// Hop limit (and hop start) stamped on every crafted packet
pub const DEFAULT_HOP_LIMIT: u32 = 3;

// =============================================================================
// CHANNEL DEFAULTS
// =============================================================================

/// Name of the default primary channel
pub const DEFAULT_CHANNEL: &str = "LongFast";

/// Default MQTT root topic (region, protocol version and encrypted subtree)
pub const DEFAULT_ROOT_TOPIC: &str = "msh/US/2/e/";

/// Single-byte placeholder users type for "the default key"
pub const DEFAULT_KEY_PLACEHOLDER: &str = "AQ==";

/// Canonical AES-128 key the placeholder expands to
pub const DEFAULT_KEY: &str = "1PG7OiApB1nwvP+rz05pAQ==";

// =============================================================================
// PAYLOAD SCALING
// =============================================================================

/// Latitude/longitude fixed-point scale (degrees * 1e7)
pub const COORDINATE_SCALE: f64 = 1e7;

/// Feet per meter, used when an altitude is given in feet
pub const FEET_PER_METER: f64 = 3.28084;

/// Presence bitfield set on every crafted `Data` block
pub const DATA_BITFIELD: u32 = 1;

// =============================================================================
// PORT NUMBERS
// =============================================================================

/// Application port numbers
///
/// Only a handful are decoded; the rest are carried so that logs and
/// activity records show a readable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(i32)]
pub enum PortNum {
    Unknown = 0,
    TextMessage = 1,
    RemoteHardware = 2,
    Position = 3,
    NodeInfo = 4,
    Routing = 5,
    Admin = 6,
    TextMessageCompressed = 7,
    Waypoint = 8,
    Audio = 9,
    DetectionSensor = 10,
    Reply = 32,
    IpTunnel = 33,
    Paxcounter = 34,
    Serial = 64,
    StoreForward = 65,
    RangeTest = 66,
    Telemetry = 67,
    Zps = 68,
    Simulator = 69,
    Traceroute = 70,
    NeighborInfo = 71,
    AtakPlugin = 72,
    MapReport = 73,
    Private = 256,
    AtakForwarder = 257,
}

impl PortNum {
    /// Every known port, in numeric order
    pub const ALL: [PortNum; 26] = [
        PortNum::Unknown,
        PortNum::TextMessage,
        PortNum::RemoteHardware,
        PortNum::Position,
        PortNum::NodeInfo,
        PortNum::Routing,
        PortNum::Admin,
        PortNum::TextMessageCompressed,
        PortNum::Waypoint,
        PortNum::Audio,
        PortNum::DetectionSensor,
        PortNum::Reply,
        PortNum::IpTunnel,
        PortNum::Paxcounter,
        PortNum::Serial,
        PortNum::StoreForward,
        PortNum::RangeTest,
        PortNum::Telemetry,
        PortNum::Zps,
        PortNum::Simulator,
        PortNum::Traceroute,
        PortNum::NeighborInfo,
        PortNum::AtakPlugin,
        PortNum::MapReport,
        PortNum::Private,
        PortNum::AtakForwarder,
    ];

    pub fn from_i32(value: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|port| port.to_i32() == value)
    }

    pub fn to_i32(self) -> i32 {
        self as i32
    }

    /// Wire name as used by the firmware (`NODEINFO_APP`, ...)
    pub fn name(self) -> &'static str {
        match self {
            PortNum::Unknown => "UNKNOWN_APP",
            PortNum::TextMessage => "TEXT_MESSAGE_APP",
            PortNum::RemoteHardware => "REMOTE_HARDWARE_APP",
            PortNum::Position => "POSITION_APP",
            PortNum::NodeInfo => "NODEINFO_APP",
            PortNum::Routing => "ROUTING_APP",
            PortNum::Admin => "ADMIN_APP",
            PortNum::TextMessageCompressed => "TEXT_MESSAGE_COMPRESSED_APP",
            PortNum::Waypoint => "WAYPOINT_APP",
            PortNum::Audio => "AUDIO_APP",
            PortNum::DetectionSensor => "DETECTION_SENSOR_APP",
            PortNum::Reply => "REPLY_APP",
            PortNum::IpTunnel => "IP_TUNNEL_APP",
            PortNum::Paxcounter => "PAXCOUNTER_APP",
            PortNum::Serial => "SERIAL_APP",
            PortNum::StoreForward => "STORE_FORWARD_APP",
            PortNum::RangeTest => "RANGE_TEST_APP",
            PortNum::Telemetry => "TELEMETRY_APP",
            PortNum::Zps => "ZPS_APP",
            PortNum::Simulator => "SIMULATOR_APP",
            PortNum::Traceroute => "TRACEROUTE_APP",
            PortNum::NeighborInfo => "NEIGHBORINFO_APP",
            PortNum::AtakPlugin => "ATAK_PLUGIN",
            PortNum::MapReport => "MAP_REPORT_APP",
            PortNum::Private => "PRIVATE_APP",
            PortNum::AtakForwarder => "ATAK_FORWARDER",
        }
    }
}

impl std::fmt::Display for PortNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Readable label for a raw port number, falling back to the number itself
pub fn port_label(value: i32) -> String {
    match PortNum::from_i32(value) {
        Some(port) => port.name().to_string(),
        None => value.to_string(),
    }
}

// =============================================================================
// ROUTING ERRORS
// =============================================================================

/// Error reason carried by a routing payload; `None` means acknowledged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum RoutingError {
    None = 0,
    NoRoute = 1,
    GotNak = 2,
    Timeout = 3,
    NoInterface = 4,
    MaxRetransmit = 5,
    NoChannel = 6,
    TooLarge = 7,
    NoResponse = 8,
    DutyCycleLimit = 9,
    BadRequest = 32,
    NotAuthorized = 33,
    PkiFailed = 34,
    PkiUnknownPubkey = 35,
}

impl RoutingError {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(RoutingError::None),
            1 => Some(RoutingError::NoRoute),
            2 => Some(RoutingError::GotNak),
            3 => Some(RoutingError::Timeout),
            4 => Some(RoutingError::NoInterface),
            5 => Some(RoutingError::MaxRetransmit),
            6 => Some(RoutingError::NoChannel),
            7 => Some(RoutingError::TooLarge),
            8 => Some(RoutingError::NoResponse),
            9 => Some(RoutingError::DutyCycleLimit),
            32 => Some(RoutingError::BadRequest),
            33 => Some(RoutingError::NotAuthorized),
            34 => Some(RoutingError::PkiFailed),
            35 => Some(RoutingError::PkiUnknownPubkey),
            _ => None,
        }
    }

    pub fn to_i32(self) -> i32 {
        self as i32
    }
}
