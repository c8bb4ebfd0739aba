//! MQTT Transport
//!
//! Each [`MqttLink`] owns a rumqttc client whose event loop is driven by a
//! spawned task. The task flips the readiness flag on CONNACK and forwards
//! incoming publishes to the link through a channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::BrokerConfig;
use crate::errors::{ClientError, ClientResult};
use crate::transport::{Connector, InboundMessage, Link};

/// Requests buffered between the client handle and its event loop
const REQUEST_CAPACITY: usize = 64;

/// Inbound messages buffered between the event loop and the link
const INBOUND_CAPACITY: usize = 1024;

/// Time allowed for queued requests to flush after a disconnect
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Opens MQTT connections to one broker
#[derive(Debug, Clone)]
pub struct MqttConnector {
    config: BrokerConfig,
}

impl MqttConnector {
    pub fn new(config: BrokerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    fn options(&self) -> MqttOptions {
        let client_id = format!("{}-{:08x}", self.config.client_id, rand::random::<u32>());
        let mut options = MqttOptions::new(client_id, self.config.host.clone(), self.config.port);
        options.set_keep_alive(Duration::from_secs(self.config.keepalive_secs));
        options.set_max_packet_size(self.config.max_packet_size, self.config.max_packet_size);
        if let Some(username) = &self.config.username {
            options.set_credentials(username.clone(), self.config.password.clone().unwrap_or_default());
        }
        options
    }
}

#[async_trait]
impl Connector for MqttConnector {
    async fn connect(&self) -> ClientResult<Box<dyn Link>> {
        let (client, mut eventloop) = AsyncClient::new(self.options(), REQUEST_CAPACITY);
        let ready = Arc::new(AtomicBool::new(false));
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);

        let task_ready = Arc::clone(&ready);
        let host = format!("{}:{}", self.config.host, self.config.port);
        let task = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        if ack.code == ConnectReturnCode::Success {
                            task_ready.store(true, Ordering::SeqCst);
                            debug!(broker = %host, "MQTT connected");
                        } else {
                            warn!(broker = %host, code = ?ack.code, "MQTT connection refused");
                            break;
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let message = InboundMessage::new(publish.topic, publish.payload.to_vec());
                        if inbound_tx.send(message).await.is_err() {
                            break;
                        }
                    }
                    Ok(Event::Incoming(Packet::Disconnect)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        if task_ready.load(Ordering::SeqCst) {
                            debug!(broker = %host, error = %e, "MQTT event loop ended");
                        } else {
                            warn!(broker = %host, error = %e, "MQTT connection failed");
                        }
                        break;
                    }
                }
            }
            task_ready.store(false, Ordering::SeqCst);
        });

        Ok(Box::new(MqttLink {
            client,
            ready,
            inbound: inbound_rx,
            task: Some(task),
        }))
    }
}

/// One rumqttc connection
pub struct MqttLink {
    client: AsyncClient,
    ready: Arc<AtomicBool>,
    inbound: mpsc::Receiver<InboundMessage>,
    task: Option<JoinHandle<()>>,
}

#[async_trait]
impl Link for MqttLink {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> ClientResult<()> {
        if !self.is_ready() {
            return Err(ClientError::NotReady);
        }
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    async fn subscribe(&mut self, topic_filter: &str) -> ClientResult<()> {
        self.client
            .subscribe(topic_filter, QoS::AtMostOnce)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Option<InboundMessage> {
        self.inbound.recv().await
    }

    async fn disconnect(&mut self) -> ClientResult<()> {
        let result = self
            .client
            .disconnect()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()));

        if let Some(task) = self.task.take() {
            if tokio::time::timeout(FLUSH_TIMEOUT, task).await.is_err() {
                debug!("MQTT event loop did not stop in time");
            }
        }
        self.ready.store(false, Ordering::SeqCst);
        result
    }
}

impl Drop for MqttLink {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
