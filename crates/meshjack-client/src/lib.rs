//! # Meshjack Client
//!
//! Transport plumbing between the mesh protocol engine and an MQTT bridge.
//!
//! ## Features
//!
//! - `Connector`/`Link` transport traits with MQTT and loopback implementations
//! - `Sender`: one packet per fresh handle, readiness-bounded
//! - `PacketDispatcher`: inbound envelopes into store updates and events
//! - `Listener`: subscription loop with cooperative cancellation
//!
//! ## Quick Start
//!
//! ```ignore
//! use meshjack_client::{BrokerConfig, ChannelSettings, MeshClient, MqttConnector};
//! use meshjack_store::MemoryStore;
//!
//! let connector = MqttConnector::new(BrokerConfig::default());
//! let client = MeshClient::new(
//!     Arc::new(connector),
//!     Arc::new(MemoryStore::new()),
//!     ChannelSettings::default(),
//! )?;
//!
//! client.sender().send_text(from, NodeNumber::BROADCAST, "hola").await?;
//! ```

pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod events;
pub mod listener;
pub mod loopback;
pub mod mqtt;
pub mod sender;
pub mod transport;

pub use config::*;
pub use dispatcher::*;
pub use errors::*;
pub use events::*;
pub use listener::*;
pub use loopback::*;
pub use mqtt::*;
pub use sender::*;
pub use transport::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::dispatcher::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::listener::*;
    pub use crate::sender::*;
    pub use crate::transport::*;
}

use std::sync::Arc;

use meshjack_protocol::{ChannelContext, MessageIdCounter};
use meshjack_store::{ChannelRecord, NodeStore};
use meshjack_timing::ReadinessPoll;
use tracing::debug;

/// One channel on one broker, with the store it reports into
///
/// Hands out senders, dispatchers and listeners that share the same
/// transport, store, channel and packet id counter.
#[derive(Clone)]
pub struct MeshClient {
    connector: Arc<dyn Connector>,
    store: Arc<dyn NodeStore>,
    settings: ChannelSettings,
    channel: ChannelContext,
    counter: Arc<MessageIdCounter>,
    readiness: ReadinessPoll,
}

impl MeshClient {
    /// Create a client; fails if the channel settings are invalid
    pub fn new(
        connector: Arc<dyn Connector>,
        store: Arc<dyn NodeStore>,
        settings: ChannelSettings,
    ) -> ClientResult<Self> {
        settings.validate()?;
        let channel = settings.context()?;
        debug!(
            channel = %channel.name(),
            hash = channel.hash(),
            encrypted = channel.is_encrypted(),
            "Channel ready"
        );
        Ok(Self {
            connector,
            store,
            settings,
            channel,
            counter: Arc::new(MessageIdCounter::new()),
            readiness: ReadinessPoll::default(),
        })
    }

    /// Share an existing packet id counter
    pub fn with_counter(mut self, counter: Arc<MessageIdCounter>) -> Self {
        self.counter = counter;
        self
    }

    pub fn with_readiness(mut self, readiness: ReadinessPoll) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn store(&self) -> &Arc<dyn NodeStore> {
        &self.store
    }

    pub fn settings(&self) -> &ChannelSettings {
        &self.settings
    }

    pub fn channel(&self) -> &ChannelContext {
        &self.channel
    }

    pub fn counter(&self) -> &Arc<MessageIdCounter> {
        &self.counter
    }

    pub fn sender(&self) -> Sender {
        Sender::new(
            Arc::clone(&self.connector),
            Arc::clone(&self.store),
            self.channel.clone(),
            self.settings.root(),
            Arc::clone(&self.counter),
        )
        .with_readiness(self.readiness)
    }

    pub fn dispatcher(&self, filter: DispatchFilter) -> PacketDispatcher {
        PacketDispatcher::new(Arc::clone(&self.store), self.channel.clone()).with_filter(filter)
    }

    pub fn listener(&self, dispatcher: PacketDispatcher) -> Listener {
        Listener::new(Arc::clone(&self.connector), Arc::new(dispatcher), self.settings.root())
            .with_readiness(self.readiness)
    }

    /// Record the configured channel and its key in the store
    pub fn remember_channel(&self) -> Option<ChannelRecord> {
        self.store
            .add_or_update_channel(self.channel.hash(), Some(self.channel.name()), &[]);
        self.store
            .set_channel_key(self.channel.hash(), &self.channel.key().to_base64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshjack_core::NodeNumber;
    use meshjack_store::MemoryStore;
    use tokio_util::sync::CancellationToken;

    fn client(broker: &LoopbackBroker, store: &MemoryStore) -> MeshClient {
        MeshClient::new(
            Arc::new(broker.clone()),
            Arc::new(store.clone()),
            ChannelSettings::default(),
        )
        .unwrap()
        .with_counter(Arc::new(MessageIdCounter::starting_at(1234)))
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let result = MeshClient::new(
            Arc::new(LoopbackBroker::new()),
            Arc::new(MemoryStore::new()),
            ChannelSettings::new("msh/US/2/e/", "LongFast", "!!not base64!!"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_remember_channel() {
        let store = MemoryStore::new();
        let client = client(&LoopbackBroker::new(), &store);
        let record = client.remember_channel().unwrap();
        assert_eq!(record.channel_num, 8);
        assert_eq!(record.channel_id.as_deref(), Some("LongFast"));
        assert_eq!(record.key.as_deref(), Some("1PG7OiApB1nwvP+rz05pAQ=="));
    }

    #[tokio::test]
    async fn test_want_ack_then_ack_round_trip() {
        let broker = LoopbackBroker::new();
        let store = MemoryStore::new();
        let client = client(&broker, &store);

        let listener = client.listener(client.dispatcher(DispatchFilter::all()));
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move { listener.run(&task_cancel).await });
        while broker.open_links() == 0 {
            tokio::task::yield_now().await;
        }

        let me = NodeNumber(0x0000_0001);
        let peer = NodeNumber(0xa1b2_c3d4);
        let outcome = client
            .sender()
            .send(&SendRequest::new(me, peer, meshjack_protocol::OutboundPayload::Text("ping".into())).with_want_ack(true))
            .await
            .unwrap();
        assert_eq!(outcome, SendOutcome::Sent { packet_id: 1234 });

        client
            .sender()
            .send(&SendRequest::new(
                peer,
                me,
                meshjack_protocol::OutboundPayload::Ack { request_id: 1234 },
            ))
            .await
            .unwrap();

        for _ in 0..100 {
            let acked = store
                .all_packets()
                .iter()
                .any(|p| p.packet_id == Some(1234) && p.success == Some(true));
            if acked {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        cancel.cancel();
        handle.await.unwrap().unwrap();

        let sent: Vec<_> = store
            .all_packets()
            .into_iter()
            .filter(|p| p.packet_id == Some(1234))
            .collect();
        assert!(sent.iter().any(|p| p.success == Some(true)));
    }
}
