//! Outbound Sender
//!
//! One send is one packet on one fresh transport handle:
//!
//! ```text
//! build Data -> seal -> envelope -> connect -> wait ready -> publish -> disconnect
//! ```
//!
//! A handle that never becomes ready is logged and the send is skipped; the
//! caller (usually a burst) carries on.

use std::sync::Arc;

use meshjack_core::{NodeNumber, DEFAULT_HOP_LIMIT};
use meshjack_protocol::{
    encode_envelope, publish_topic, seal, wrap_envelope, ChannelContext, MessageIdCounter,
    OutboundPayload, PacketRoute,
};
use meshjack_store::{unix_now, NodeStore, PacketActivity};
use meshjack_timing::ReadinessPoll;
use tracing::{debug, info, warn};

use crate::errors::ClientResult;
use crate::transport::Connector;

/// One outbound packet
#[derive(Debug, Clone, PartialEq)]
pub struct SendRequest {
    /// Source node; the packet claims to come from here
    pub from: NodeNumber,
    pub to: NodeNumber,
    /// Gateway whose topic the packet is published on
    pub gateway: NodeNumber,
    pub payload: OutboundPayload,
    pub want_ack: bool,
}

impl SendRequest {
    /// Request published through the source node's own gateway topic
    pub fn new(from: NodeNumber, to: NodeNumber, payload: OutboundPayload) -> Self {
        Self {
            from,
            to,
            gateway: from,
            payload,
            want_ack: false,
        }
    }

    pub fn via_gateway(mut self, gateway: NodeNumber) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn with_want_ack(mut self, want_ack: bool) -> Self {
        self.want_ack = want_ack;
        self
    }
}

/// What happened to a send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent { packet_id: u32 },
    /// Transport unavailable; nothing was published
    Skipped,
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, SendOutcome::Sent { .. })
    }
}

/// Builds, seals and publishes packets for one channel
#[derive(Clone)]
pub struct Sender {
    connector: Arc<dyn Connector>,
    store: Arc<dyn NodeStore>,
    channel: ChannelContext,
    root_topic: String,
    counter: Arc<MessageIdCounter>,
    readiness: ReadinessPoll,
}

impl Sender {
    pub fn new(
        connector: Arc<dyn Connector>,
        store: Arc<dyn NodeStore>,
        channel: ChannelContext,
        root_topic: impl Into<String>,
        counter: Arc<MessageIdCounter>,
    ) -> Self {
        Self {
            connector,
            store,
            channel,
            root_topic: root_topic.into(),
            counter,
            readiness: ReadinessPoll::default(),
        }
    }

    pub fn with_readiness(mut self, readiness: ReadinessPoll) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn channel(&self) -> &ChannelContext {
        &self.channel
    }

    /// Build and publish one packet
    ///
    /// Payload build errors (such as a malformed public key) are returned;
    /// transport trouble yields [`SendOutcome::Skipped`].
    pub async fn send(&self, request: &SendRequest) -> ClientResult<SendOutcome> {
        let now = u32::try_from(unix_now()).unwrap_or(u32::MAX);
        let data = request.payload.to_data(request.from, now)?;
        let packet_id = self.counter.next_id();
        let route = PacketRoute::new(packet_id, request.from, request.to).with_want_ack(request.want_ack);
        let packet = seal(&data, route, &self.channel)?;
        let gateway_id = request.gateway.to_node_id();
        let envelope = wrap_envelope(packet, self.channel.name(), &gateway_id);
        let topic = publish_topic(&self.root_topic, self.channel.name(), request.gateway);

        let mut link = match self.connector.connect().await {
            Ok(link) => link,
            Err(e) => {
                warn!(error = %e, "Connect failed, skipping send");
                return Ok(SendOutcome::Skipped);
            }
        };

        if !self.readiness.wait(|| link.is_ready()).await {
            warn!(topic = %topic, timeout = ?self.readiness.timeout, "Transport not ready, skipping send");
            if let Err(e) = link.disconnect().await {
                debug!(error = %e, "Disconnect after readiness timeout failed");
            }
            return Ok(SendOutcome::Skipped);
        }

        let published = link.publish(&topic, encode_envelope(&envelope)).await;
        if let Err(e) = link.disconnect().await {
            debug!(error = %e, "Disconnect after publish failed");
        }
        if let Err(e) = published {
            warn!(topic = %topic, error = %e, "Publish failed, skipping send");
            return Ok(SendOutcome::Skipped);
        }

        info!(
            id = packet_id,
            from = %request.from,
            to = %request.to,
            port = %request.payload.portnum(),
            topic = %topic,
            "Packet sent"
        );

        let mut activity = PacketActivity::new(
            request.from.to_node_id(),
            request.to.to_node_id(),
            request.payload.portnum().name(),
        );
        activity.gateway_node_id = Some(gateway_id);
        activity.payload_size = Some(data.payload.len());
        activity.success = request.want_ack.then_some(false);
        activity.channel_id = Some(self.channel.name().to_string());
        activity.packet_id = Some(packet_id);
        activity.hop_start = Some(DEFAULT_HOP_LIMIT);
        activity.hop_limit = Some(DEFAULT_HOP_LIMIT);
        self.store.add_node_packet(activity);

        Ok(SendOutcome::Sent { packet_id })
    }

    /// Send a text message
    pub async fn send_text(&self, from: NodeNumber, to: NodeNumber, text: &str) -> ClientResult<SendOutcome> {
        self.send(&SendRequest::new(from, to, OutboundPayload::Text(text.to_string())))
            .await
    }
}
