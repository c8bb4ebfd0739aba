//! Client Configuration
//!
//! Broker connection settings and the channel the client speaks on.

use meshjack_core::{DEFAULT_CHANNEL, DEFAULT_KEY_PLACEHOLDER, DEFAULT_ROOT_TOPIC};
use meshjack_protocol::{normalize_root, ChannelContext};
use serde::{Deserialize, Serialize};

use crate::errors::{ClientError, ClientResult};

/// Broker connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Broker host name or address
    pub host: String,

    /// Broker port
    pub port: u16,

    pub username: Option<String>,

    pub password: Option<String>,

    /// Client id prefix; each connection appends a random suffix
    pub client_id: String,

    /// Keepalive interval in seconds
    pub keepalive_secs: u64,

    /// Maximum MQTT packet size in bytes
    pub max_packet_size: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "mqtt.meshtastic.org".to_string(),
            port: 1883,
            username: Some("meshdev".to_string()),
            password: Some("large4cats".to_string()),
            client_id: "meshjack".to_string(),
            keepalive_secs: 60,
            max_packet_size: 64 * 1024,
        }
    }
}

impl BrokerConfig {
    /// Create a new configuration builder
    pub fn builder() -> BrokerConfigBuilder {
        BrokerConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ClientResult<()> {
        if self.host.trim().is_empty() {
            return Err(ClientError::Config("Broker host is required".into()));
        }

        if self.port == 0 {
            return Err(ClientError::Config("Broker port cannot be 0".into()));
        }

        if self.client_id.trim().is_empty() {
            return Err(ClientError::Config("Client id cannot be empty".into()));
        }

        if self.keepalive_secs < 5 {
            return Err(ClientError::Config(
                "Keepalive must be at least 5 seconds".into(),
            ));
        }

        if self.password.is_some() && self.username.is_none() {
            return Err(ClientError::Config(
                "Password given without a username".into(),
            ));
        }

        Ok(())
    }
}

/// Configuration builder
#[derive(Default)]
pub struct BrokerConfigBuilder {
    config: BrokerConfig,
}

impl BrokerConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set username and password
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self.config.password = Some(password.into());
        self
    }

    /// Connect without credentials
    pub fn anonymous(mut self) -> Self {
        self.config.username = None;
        self.config.password = None;
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.client_id = client_id.into();
        self
    }

    pub fn keepalive(mut self, secs: u64) -> Self {
        self.config.keepalive_secs = secs;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ClientResult<BrokerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Topic root, channel name and channel key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    pub root_topic: String,
    pub channel: String,
    /// Base64 channel key; empty disables encryption
    pub key: String,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            root_topic: DEFAULT_ROOT_TOPIC.to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
            key: DEFAULT_KEY_PLACEHOLDER.to_string(),
        }
    }
}

impl ChannelSettings {
    pub fn new(root_topic: impl Into<String>, channel: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            root_topic: root_topic.into(),
            channel: channel.into(),
            key: key.into(),
        }
    }

    /// Root topic with a trailing `/`
    pub fn root(&self) -> String {
        normalize_root(&self.root_topic)
    }

    /// Resolve the channel key and derive the channel hash
    pub fn context(&self) -> ClientResult<ChannelContext> {
        Ok(ChannelContext::new(self.channel.clone(), &self.key)?)
    }

    /// Validate the settings, including the key
    pub fn validate(&self) -> ClientResult<()> {
        if self.root_topic.trim().is_empty() {
            return Err(ClientError::Config("Root topic is required".into()));
        }

        if self.root_topic.contains(['#', '+']) {
            return Err(ClientError::Config(
                "Root topic cannot contain wildcards".into(),
            ));
        }

        if self.channel.is_empty() || self.channel.contains('/') {
            return Err(ClientError::Config(format!(
                "Invalid channel name: {:?}",
                self.channel
            )));
        }

        self.context().map(|_| ())
    }
}
