//! Store Records
//!
//! Plain data kept about observed nodes, channels and packets.

use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use meshjack_core::NodeNumber;
use serde::{Deserialize, Serialize};

/// Current Unix time in seconds
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Last-known state of a mesh node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node_number: NodeNumber,
    pub node_id: String,
    pub node_mac: String,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub hw_model: Option<u32>,
    /// Public key as hex text
    pub pubkey: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt: Option<i32>,

    // Device metrics
    pub battery_level: Option<u32>,
    pub voltage: Option<f64>,
    pub channel_utilization: Option<f64>,
    pub air_util_tx: Option<f64>,
    pub uptime_seconds: Option<u32>,

    // Environment metrics
    pub temperature: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub barometric_pressure: Option<f64>,
    pub gas_resistance: Option<f64>,
    pub iaq: Option<u32>,

    pub rssi: Option<i32>,
    pub snr: Option<f64>,
    /// Unix seconds
    pub last_seen: Option<u64>,
    /// Observed traffic may not modify this record while set
    pub freeze: bool,
}

impl NodeRecord {
    /// Empty record for a node, with derived ID and MAC
    pub fn new(node_number: NodeNumber) -> Self {
        Self {
            node_number,
            node_id: node_number.to_node_id(),
            node_mac: node_number.to_mac(),
            short_name: None,
            long_name: None,
            hw_model: None,
            pubkey: None,
            lat: None,
            lon: None,
            alt: None,
            battery_level: None,
            voltage: None,
            channel_utilization: None,
            air_util_tx: None,
            uptime_seconds: None,
            temperature: None,
            relative_humidity: None,
            barometric_pressure: None,
            gas_resistance: None,
            iaq: None,
            rssi: None,
            snr: None,
            last_seen: None,
            freeze: false,
        }
    }
}

/// Partial update of a node record; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeUpdate {
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub hw_model: Option<u32>,
    pub pubkey: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt: Option<i32>,
    pub battery_level: Option<u32>,
    pub voltage: Option<f64>,
    pub channel_utilization: Option<f64>,
    pub air_util_tx: Option<f64>,
    pub uptime_seconds: Option<u32>,
    pub temperature: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub barometric_pressure: Option<f64>,
    pub gas_resistance: Option<f64>,
    pub iaq: Option<u32>,
    pub rssi: Option<i32>,
    pub snr: Option<f64>,
    pub last_seen: Option<u64>,
    pub freeze: Option<bool>,
}

macro_rules! merge {
    ($record:expr, $update:expr, $($field:ident),* $(,)?) => {
        $(
            if let Some(value) = &$update.$field {
                $record.$field = Some(value.clone());
            }
        )*
    };
}

impl NodeUpdate {
    /// Update that only refreshes last-seen
    pub fn seen_at(timestamp: u64) -> Self {
        Self {
            last_seen: Some(timestamp),
            ..Default::default()
        }
    }

    pub fn with_last_seen(mut self, timestamp: u64) -> Self {
        self.last_seen = Some(timestamp);
        self
    }

    /// True when the update carries no field other than `freeze`
    pub fn is_freeze_only(&self) -> bool {
        let without_freeze = NodeUpdate {
            freeze: None,
            ..self.clone()
        };
        without_freeze == NodeUpdate::default()
    }

    /// Apply to a record; a frozen record only accepts the freeze flag
    ///
    /// # Returns
    /// `true` if non-freeze fields were written
    pub fn apply(&self, record: &mut NodeRecord) -> bool {
        let was_frozen = record.freeze;
        if let Some(freeze) = self.freeze {
            record.freeze = freeze;
        }
        if was_frozen {
            return false;
        }
        merge!(
            record,
            self,
            short_name,
            long_name,
            hw_model,
            pubkey,
            lat,
            lon,
            alt,
            battery_level,
            voltage,
            channel_utilization,
            air_util_tx,
            uptime_seconds,
            temperature,
            relative_humidity,
            barometric_pressure,
            gas_resistance,
            iaq,
            rssi,
            snr,
            last_seen,
        );
        !self.is_freeze_only()
    }
}

/// A channel observed on the bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    /// Channel hash
    pub channel_num: u32,
    /// Channel name from the envelope
    pub channel_id: Option<String>,
    /// Base64 key, when known
    pub key: Option<String>,
    /// NodeIDs seen on the channel; only ever grows
    pub members: BTreeSet<String>,
}

impl ChannelRecord {
    pub fn new(channel_num: u32) -> Self {
        Self {
            channel_num,
            channel_id: None,
            key: None,
            members: BTreeSet::new(),
        }
    }
}

/// One observed or sent packet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketActivity {
    /// Unix seconds
    pub timestamp: u64,
    pub from_node_id: String,
    pub gateway_node_id: Option<String>,
    pub to_node_id: String,
    /// Port name, or `ENCRYPTED` / `PKI_ENCRYPTED` / `UNDECODED`
    pub packet_type: String,
    pub payload_size: Option<usize>,
    /// `Some(false)` while an ack is awaited, `Some(true)` once acked
    pub success: Option<bool>,
    pub channel_id: Option<String>,
    pub packet_id: Option<u32>,
    pub rx_rssi: Option<i32>,
    pub rx_snr: Option<f32>,
    pub rx_time: Option<u32>,
    pub hop_start: Option<u32>,
    pub hop_limit: Option<u32>,
}

impl PacketActivity {
    /// Activity entry with only the addressing filled in
    pub fn new(
        from_node_id: impl Into<String>,
        to_node_id: impl Into<String>,
        packet_type: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: unix_now(),
            from_node_id: from_node_id.into(),
            gateway_node_id: None,
            to_node_id: to_node_id.into(),
            packet_type: packet_type.into(),
            payload_size: None,
            success: None,
            channel_id: None,
            packet_id: None,
            rx_rssi: None,
            rx_snr: None,
            rx_time: None,
            hop_start: None,
            hop_limit: None,
        }
    }

    pub fn involves(&self, node_id: &str) -> bool {
        self.from_node_id == node_id || self.to_node_id == node_id
    }
}
