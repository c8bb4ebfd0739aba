//! Inbound Listener
//!
//! Holds one transport handle subscribed to `{root}#` and feeds every message
//! through a [`PacketDispatcher`] until cancelled.

use std::sync::Arc;

use meshjack_protocol::subscribe_topic;
use meshjack_timing::ReadinessPoll;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatcher::PacketDispatcher;
use crate::errors::{ClientError, ClientResult};
use crate::transport::Connector;

/// Counters for one listening session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenStats {
    pub received: u64,
    pub dispatched: u64,
}

/// Subscribes under a root topic and dispatches inbound traffic
pub struct Listener {
    connector: Arc<dyn Connector>,
    dispatcher: Arc<PacketDispatcher>,
    root_topic: String,
    readiness: ReadinessPoll,
}

impl Listener {
    pub fn new(
        connector: Arc<dyn Connector>,
        dispatcher: Arc<PacketDispatcher>,
        root_topic: impl Into<String>,
    ) -> Self {
        Self {
            connector,
            dispatcher,
            root_topic: root_topic.into(),
            readiness: ReadinessPoll::default(),
        }
    }

    pub fn with_readiness(mut self, readiness: ReadinessPoll) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn dispatcher(&self) -> &Arc<PacketDispatcher> {
        &self.dispatcher
    }

    /// Listen until `cancel` fires
    ///
    /// # Errors
    /// [`ClientError::NotReady`] if the broker never accepts the connection,
    /// [`ClientError::StreamClosed`] if the stream ends before cancellation.
    pub async fn run(&self, cancel: &CancellationToken) -> ClientResult<ListenStats> {
        let mut link = self.connector.connect().await?;
        if !self.readiness.wait(|| link.is_ready()).await {
            if let Err(e) = link.disconnect().await {
                debug!(error = %e, "Disconnect after readiness timeout failed");
            }
            return Err(ClientError::NotReady);
        }

        let topic = subscribe_topic(&self.root_topic);
        link.subscribe(&topic).await?;
        info!(topic = %topic, "Listening");

        let mut stats = ListenStats::default();
        let result = loop {
            tokio::select! {
                _ = cancel.cancelled() => break Ok(stats),
                message = link.recv() => match message {
                    Some(message) => {
                        stats.received += 1;
                        if self.dispatcher.dispatch(&message).event().is_some() {
                            stats.dispatched += 1;
                        }
                    }
                    None => {
                        warn!(topic = %topic, "Inbound stream closed");
                        break Err(ClientError::StreamClosed);
                    }
                },
            }
        };

        if let Err(e) = link.disconnect().await {
            debug!(error = %e, "Disconnect after listening failed");
        }
        debug!(received = stats.received, dispatched = stats.dispatched, "Listener stopped");
        result
    }
}
