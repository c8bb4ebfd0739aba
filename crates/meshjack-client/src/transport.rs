//! Transport Abstraction
//!
//! Publish/subscribe transport split into a factory and short-lived handles:
//!
//! - **Connector**: opens a fresh handle per send or per listening session
//! - **Link**: one broker connection with readiness, publish, subscribe,
//!   receive and disconnect
//!
//! ```text
//! Sender:                         Listener:
//! connect()                       connect()
//!   -> wait is_ready()              -> wait is_ready()
//!   -> publish(topic, bytes)        -> subscribe("{root}#")
//!   -> disconnect()                 -> recv() until cancelled
//! ```
//!
//! # Implementations
//!
//! - **`MqttConnector`**: rumqttc client against a real broker
//! - **`LoopbackBroker`**: in-process broker for tests

use async_trait::async_trait;

use crate::errors::ClientResult;

/// A message delivered on a subscribed topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }
}

/// Factory of transport handles
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a new handle
    ///
    /// The handle may not be ready yet; callers poll [`Link::is_ready`].
    async fn connect(&self) -> ClientResult<Box<dyn Link>>;
}

/// One connection to the broker
#[async_trait]
pub trait Link: Send + Sync {
    /// Whether the broker has accepted the connection
    fn is_ready(&self) -> bool;

    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> ClientResult<()>;

    async fn subscribe(&mut self, topic_filter: &str) -> ClientResult<()>;

    /// Next inbound message; `None` once the connection has closed
    async fn recv(&mut self) -> Option<InboundMessage>;

    async fn disconnect(&mut self) -> ClientResult<()>;
}

/// MQTT topic filter match (`+` one level, `#` the remainder)
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
