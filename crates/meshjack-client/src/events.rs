//! Dispatch Events
//!
//! The normalized view of one inbound packet handed to observers after the
//! store has been updated.

use std::error::Error;
use std::fmt;

use meshjack_core::{port_label, NodeNumber, PortNum};
use meshjack_protocol::DecodedPayload;
use meshjack_store::NodeUpdate;

/// One dispatched packet
#[derive(Debug, Clone, PartialEq)]
pub struct PacketEvent {
    pub packet_id: u32,
    pub from: NodeNumber,
    pub to: NodeNumber,
    /// Sender names as known before this packet
    pub from_short_name: Option<String>,
    pub from_long_name: Option<String>,
    pub gateway_id: Option<String>,
    pub channel_id: String,
    pub portnum: i32,
    pub payload: DecodedPayload,
    /// Node fields derived from the payload
    pub update: NodeUpdate,
    pub want_ack: bool,
    pub rx_rssi: Option<i32>,
    pub rx_snr: Option<f32>,
}

impl PacketEvent {
    pub fn port(&self) -> Option<PortNum> {
        PortNum::from_i32(self.portnum)
    }

    pub fn is_nodeinfo(&self) -> bool {
        matches!(self.payload, DecodedPayload::NodeInfo(_))
    }

    pub fn is_position(&self) -> bool {
        matches!(self.payload, DecodedPayload::Position(_))
    }

    /// Acknowledgement with no routing error
    pub fn is_ack(&self) -> bool {
        matches!(self.payload, DecodedPayload::Routing { error_reason: Some(0) })
    }

    /// Port name for logging
    pub fn name(&self) -> String {
        port_label(self.portnum)
    }
}

impl fmt::Display for PacketEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.from)?;
        if let Some(short) = &self.from_short_name {
            write!(f, " ({})", short)?;
        }
        write!(f, " -> {} [{}] ", self.to, self.name())?;
        match &self.payload {
            DecodedPayload::NodeInfo(info) => {
                write!(f, "{} / {} hw={}", info.long_name, info.short_name, info.hw_model)
            }
            DecodedPayload::Position(p) => write!(f, "{:.7}, {:.7} alt={}m", p.lat, p.lon, p.alt),
            DecodedPayload::Text(text) | DecodedPayload::RangeTest(text) => write!(f, "{:?}", text),
            DecodedPayload::Traceroute(route) => {
                let hops: Vec<String> = route.iter().map(|n| NodeNumber(*n).to_string()).collect();
                write!(f, "route [{}]", hops.join(", "))
            }
            DecodedPayload::Routing { error_reason } => match error_reason {
                Some(reason) => write!(f, "error_reason={} request={}", reason, self.packet_id),
                None => write!(f, "routing"),
            },
            DecodedPayload::Telemetry(_) => write!(f, "telemetry"),
            DecodedPayload::Malformed { .. } => write!(f, "malformed payload"),
            DecodedPayload::Other { size, .. } => write!(f, "{} bytes", size),
        }
    }
}

/// Error type observers may return
pub type ObserverError = Box<dyn Error + Send + Sync>;

/// Receives dispatched packets
///
/// Failures and panics are caught by the dispatcher and logged.
pub trait Observer: Send + Sync {
    fn observe(&self, event: &PacketEvent) -> Result<(), ObserverError>;
}

impl<F> Observer for F
where
    F: Fn(&PacketEvent) -> Result<(), ObserverError> + Send + Sync,
{
    fn observe(&self, event: &PacketEvent) -> Result<(), ObserverError> {
        self(event)
    }
}
