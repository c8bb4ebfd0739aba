//! Loopback Transport
//!
//! In-process broker with MQTT topic-filter semantics. Links connected to the
//! same broker see each other's publishes. Used as the transport fake in
//! tests and for dry runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::trace;

use crate::errors::{ClientError, ClientResult};
use crate::transport::{topic_matches, Connector, InboundMessage, Link};

#[derive(Default)]
struct BrokerState {
    next_link: u64,
    /// Delivery channel per open link
    links: HashMap<u64, mpsc::UnboundedSender<InboundMessage>>,
    /// (link, topic filter)
    subscriptions: Vec<(u64, String)>,
    published: Vec<InboundMessage>,
    connects: u64,
    unreachable: bool,
}

impl BrokerState {
    fn deliver(&self, message: &InboundMessage) {
        for (link, filter) in &self.subscriptions {
            if topic_matches(filter, &message.topic) {
                if let Some(tx) = self.links.get(link) {
                    let _ = tx.send(message.clone());
                }
            }
        }
    }
}

/// In-process broker shared by every link it hands out
#[derive(Clone, Default)]
pub struct LoopbackBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl LoopbackBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Links opened while unreachable never become ready
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Every message published through a link, in order
    pub fn published(&self) -> Vec<InboundMessage> {
        self.lock().published.clone()
    }

    /// Number of links opened so far
    pub fn connect_count(&self) -> u64 {
        self.lock().connects
    }

    /// Number of links currently open
    pub fn open_links(&self) -> usize {
        self.lock().links.len()
    }

    /// Deliver a message to subscribers as if another client published it
    pub fn inject(&self, topic: impl Into<String>, payload: Vec<u8>) {
        let message = InboundMessage::new(topic, payload);
        self.lock().deliver(&message);
    }

    /// Drop every open link; their receivers then report end of stream
    pub fn close(&self) {
        let mut state = self.lock();
        state.links.clear();
        state.subscriptions.clear();
    }
}

#[async_trait]
impl Connector for LoopbackBroker {
    async fn connect(&self) -> ClientResult<Box<dyn Link>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.lock();
        let id = state.next_link;
        state.next_link += 1;
        state.connects += 1;
        state.links.insert(id, tx);
        let ready = !state.unreachable;
        trace!(link = id, ready, "Loopback link opened");

        Ok(Box::new(LoopbackLink {
            broker: self.clone(),
            id,
            ready,
            inbound: rx,
        }))
    }
}

/// One link to a [`LoopbackBroker`]
pub struct LoopbackLink {
    broker: LoopbackBroker,
    id: u64,
    ready: bool,
    inbound: mpsc::UnboundedReceiver<InboundMessage>,
}

#[async_trait]
impl Link for LoopbackLink {
    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> ClientResult<()> {
        if !self.ready {
            return Err(ClientError::NotReady);
        }
        let message = InboundMessage::new(topic, payload);
        let mut state = self.broker.lock();
        state.deliver(&message);
        state.published.push(message);
        Ok(())
    }

    async fn subscribe(&mut self, topic_filter: &str) -> ClientResult<()> {
        if !self.ready {
            return Err(ClientError::NotReady);
        }
        self.broker
            .lock()
            .subscriptions
            .push((self.id, topic_filter.to_string()));
        Ok(())
    }

    async fn recv(&mut self) -> Option<InboundMessage> {
        self.inbound.recv().await
    }

    /// Releases the link either way; a link that never became ready reports
    /// [`ClientError::NotReady`] like an MQTT session that never connected
    async fn disconnect(&mut self) -> ClientResult<()> {
        let mut state = self.broker.lock();
        state.links.remove(&self.id);
        state.subscriptions.retain(|(link, _)| *link != self.id);
        if !std::mem::replace(&mut self.ready, false) {
            return Err(ClientError::NotReady);
        }
        Ok(())
    }
}

impl Drop for LoopbackLink {
    fn drop(&mut self) {
        let mut state = self.broker.lock();
        state.links.remove(&self.id);
        state.subscriptions.retain(|(link, _)| *link != self.id);
    }
}
