//! Packet Dispatcher
//!
//! Turns one inbound transport message into store updates and an observer
//! event.
//!
//! ```text
//! envelope -> packet -> sender filter -> decrypt -> port filter -> parse
//!          -> ack correlation -> node upsert -> channel upsert -> activity -> observer
//! ```
//!
//! Filtered packets leave no trace: nothing is written and the observer is
//! not called.

use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use meshjack_core::{port_label, NodeNumber, PortNum};
use meshjack_protocol::proto::mesh_packet::PayloadVariant;
use meshjack_protocol::proto::MeshPacket;
use meshjack_protocol::{
    decode_envelope, decrypt_block, parse_payload, ChannelContext, DecodedPayload, Decrypted,
    TelemetryFields,
};
use meshjack_store::{unix_now, NodeStore, NodeUpdate, PacketActivity};
use tracing::{debug, info, trace, warn};

use crate::events::{Observer, PacketEvent};
use crate::transport::InboundMessage;

/// Activity type for packets that could not be deciphered
pub const ENCRYPTED_TYPE: &str = "ENCRYPTED";
/// Activity type for per-node public-key packets
pub const PKI_ENCRYPTED_TYPE: &str = "PKI_ENCRYPTED";
/// Activity type for encrypted blocks that failed structurally
pub const UNDECODED_TYPE: &str = "UNDECODED";

/// Which packets the dispatcher processes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchFilter {
    /// Only packets from this node
    pub sender: Option<NodeNumber>,
    /// Only these ports; `None` admits every port
    pub ports: Option<BTreeSet<i32>>,
}

impl DispatchFilter {
    /// Admit everything
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from_sender(mut self, sender: NodeNumber) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_ports(mut self, ports: impl IntoIterator<Item = PortNum>) -> Self {
        self.ports = Some(ports.into_iter().map(PortNum::to_i32).collect());
        self
    }

    pub fn admits_sender(&self, from: NodeNumber) -> bool {
        self.sender.map_or(true, |sender| sender == from)
    }

    pub fn admits_port(&self, portnum: i32) -> bool {
        self.ports.as_ref().map_or(true, |ports| ports.contains(&portnum))
    }
}

/// What the dispatcher did with a message
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Fully processed
    Dispatched(Box<PacketEvent>),
    /// Rejected by the sender or port filter
    Filtered,
    /// Recorded as `ENCRYPTED` or `UNDECODED`
    Undecoded,
    /// Recorded as `PKI_ENCRYPTED`
    PkiEncrypted,
    /// Encrypted and no channel key configured; nothing recorded
    NoKey,
    /// Envelope did not parse
    Malformed,
    /// Envelope carried no packet
    Empty,
}

impl DispatchOutcome {
    pub fn event(&self) -> Option<&PacketEvent> {
        match self {
            DispatchOutcome::Dispatched(event) => Some(event.as_ref()),
            _ => None,
        }
    }
}

/// Routes inbound packets into the store and an optional observer
pub struct PacketDispatcher {
    store: Arc<dyn NodeStore>,
    channel: ChannelContext,
    filter: DispatchFilter,
    observer: Option<Arc<dyn Observer>>,
}

impl PacketDispatcher {
    pub fn new(store: Arc<dyn NodeStore>, channel: ChannelContext) -> Self {
        Self {
            store,
            channel,
            filter: DispatchFilter::all(),
            observer: None,
        }
    }

    pub fn with_filter(mut self, filter: DispatchFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn filter(&self) -> &DispatchFilter {
        &self.filter
    }

    /// Process one inbound transport message
    pub fn dispatch(&self, message: &InboundMessage) -> DispatchOutcome {
        let envelope = match decode_envelope(&message.payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(topic = %message.topic, error = %e, "Envelope failed to parse");
                return DispatchOutcome::Malformed;
            }
        };
        let Some(packet) = envelope.packet.as_ref() else {
            debug!(topic = %message.topic, "Envelope without packet");
            return DispatchOutcome::Empty;
        };

        let from = NodeNumber(packet.from);
        let to = NodeNumber(packet.to);
        if !self.filter.admits_sender(from) {
            trace!(from = %from, "Sender filtered");
            return DispatchOutcome::Filtered;
        }

        let gateway_id = non_empty(&envelope.gateway_id);
        let channel_id = non_empty(&envelope.channel_id);
        let (from_short_name, from_long_name) = self.store.resolve_node_names(from);

        let data = match &packet.payload_variant {
            Some(PayloadVariant::Decoded(data)) => data.clone(),
            Some(PayloadVariant::Encrypted(bytes)) => {
                if packet.pki_encrypted {
                    debug!(from = %from, to = %to, "PKI encrypted packet");
                    self.record_opaque(packet, PKI_ENCRYPTED_TYPE, bytes.len(), &gateway_id, &channel_id);
                    return DispatchOutcome::PkiEncrypted;
                }
                if !self.channel.is_encrypted() {
                    info!(from = %from, "Encrypted packet but no channel key configured");
                    return DispatchOutcome::NoKey;
                }
                match decrypt_block(&self.channel, packet.id, packet.from, bytes) {
                    Ok(Decrypted::Data(data)) => data,
                    Ok(Decrypted::Undecoded) => {
                        debug!(from = %from, id = packet.id, "Packet did not decrypt to a Data block");
                        self.record_opaque(packet, ENCRYPTED_TYPE, bytes.len(), &gateway_id, &channel_id);
                        return DispatchOutcome::Undecoded;
                    }
                    Err(e) => {
                        warn!(from = %from, id = packet.id, error = %e, "Decrypt failed");
                        self.record_opaque(packet, UNDECODED_TYPE, bytes.len(), &gateway_id, &channel_id);
                        return DispatchOutcome::Undecoded;
                    }
                }
            }
            None => {
                debug!(from = %from, id = packet.id, "Packet without payload");
                return DispatchOutcome::Empty;
            }
        };

        if !self.filter.admits_port(data.portnum) {
            trace!(from = %from, port = %port_label(data.portnum), "Port filtered");
            return DispatchOutcome::Filtered;
        }

        let payload = parse_payload(&data);
        let mut update = node_update(&payload);

        if let DecodedPayload::Routing { error_reason: Some(0) } = &payload {
            if data.request_id != 0 {
                let matched = self.store.mark_packet_success_by_ack(data.request_id);
                debug!(request_id = data.request_id, matched, "Acknowledgement");
            }
        }

        let now = unix_now();
        update.last_seen = Some(now);
        if packet.rx_rssi != 0 {
            update.rssi = Some(packet.rx_rssi);
        }
        if packet.rx_snr != 0.0 {
            update.snr = Some(f64::from(packet.rx_snr));
        }
        self.store.add_or_update_node(from, update.clone());
        self.store
            .add_or_update_channel(packet.channel, channel_id.as_deref(), &[from.to_node_id()]);

        let mut activity = self.activity(packet, port_label(data.portnum), &gateway_id, &channel_id);
        activity.timestamp = now;
        activity.payload_size = Some(data.payload.len());
        self.store.add_node_packet(activity);

        let event = PacketEvent {
            packet_id: packet.id,
            from,
            to,
            from_short_name,
            from_long_name,
            gateway_id,
            channel_id: channel_id.unwrap_or_default(),
            portnum: data.portnum,
            payload,
            update,
            want_ack: packet.want_ack,
            rx_rssi: (packet.rx_rssi != 0).then_some(packet.rx_rssi),
            rx_snr: (packet.rx_snr != 0.0).then_some(packet.rx_snr),
        };
        info!(event = %event, "Packet");

        self.notify(&event);
        DispatchOutcome::Dispatched(Box::new(event))
    }

    /// Record an undeciphered packet and refresh the sender's last-seen
    fn record_opaque(
        &self,
        packet: &MeshPacket,
        packet_type: &str,
        size: usize,
        gateway_id: &Option<String>,
        channel_id: &Option<String>,
    ) {
        let now = unix_now();
        self.store
            .add_or_update_node(NodeNumber(packet.from), NodeUpdate::seen_at(now));
        let mut activity = self.activity(packet, packet_type.to_string(), gateway_id, channel_id);
        activity.timestamp = now;
        activity.payload_size = Some(size);
        self.store.add_node_packet(activity);
    }

    fn activity(
        &self,
        packet: &MeshPacket,
        packet_type: String,
        gateway_id: &Option<String>,
        channel_id: &Option<String>,
    ) -> PacketActivity {
        let mut activity = PacketActivity::new(
            NodeNumber(packet.from).to_node_id(),
            NodeNumber(packet.to).to_node_id(),
            packet_type,
        );
        activity.gateway_node_id = gateway_id.clone();
        activity.channel_id = channel_id.clone();
        activity.packet_id = Some(packet.id);
        activity.success = packet.want_ack.then_some(false);
        activity.rx_rssi = (packet.rx_rssi != 0).then_some(packet.rx_rssi);
        activity.rx_snr = (packet.rx_snr != 0.0).then_some(packet.rx_snr);
        activity.rx_time = (packet.rx_time != 0).then_some(packet.rx_time);
        activity.hop_start = Some(packet.hop_start);
        activity.hop_limit = Some(packet.hop_limit);
        activity
    }

    fn notify(&self, event: &PacketEvent) {
        let Some(observer) = &self.observer else {
            return;
        };
        match catch_unwind(AssertUnwindSafe(|| observer.observe(event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Observer failed"),
            Err(_) => warn!(packet_id = event.packet_id, "Observer panicked"),
        }
    }
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

/// Node fields a payload contributes
pub fn node_update(payload: &DecodedPayload) -> NodeUpdate {
    match payload {
        DecodedPayload::NodeInfo(info) => NodeUpdate {
            short_name: Some(info.short_name.clone()),
            long_name: Some(info.long_name.clone()),
            hw_model: Some(info.hw_model),
            pubkey: info.public_key.clone(),
            ..Default::default()
        },
        DecodedPayload::Position(position) => NodeUpdate {
            lat: Some(position.lat),
            lon: Some(position.lon),
            alt: Some(position.alt),
            ..Default::default()
        },
        DecodedPayload::Telemetry(TelemetryFields::Device(device)) => NodeUpdate {
            battery_level: device.battery_level,
            voltage: device.voltage,
            channel_utilization: device.channel_utilization,
            air_util_tx: device.air_util_tx,
            uptime_seconds: device.uptime_seconds,
            ..Default::default()
        },
        DecodedPayload::Telemetry(TelemetryFields::Environment(env)) => NodeUpdate {
            temperature: env.temperature,
            relative_humidity: env.relative_humidity,
            barometric_pressure: env.barometric_pressure,
            gas_resistance: env.gas_resistance,
            iaq: env.iaq,
            ..Default::default()
        },
        _ => NodeUpdate::default(),
    }
}
