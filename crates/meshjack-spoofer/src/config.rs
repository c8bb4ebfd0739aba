//! Application Configuration
//!
//! Layered settings for the `meshjack` tool:
//!
//! ```text
//! defaults -> TOML file (--config) -> environment -> command-line flags
//! ```

use std::path::{Path, PathBuf};

use meshjack_client::{BrokerConfig, ChannelSettings};
use serde::{Deserialize, Serialize};

/// Environment variables consulted by [`AppConfig::apply_env`]
pub const ENV_BROKER: &str = "MQTT_BROKER";
pub const ENV_PORT: &str = "MQTT_PORT";
pub const ENV_USERNAME: &str = "MQTT_USERNAME";
pub const ENV_PASSWORD: &str = "MQTT_PASSWORD";
pub const ENV_ROOT_TOPIC: &str = "ROOT_TOPIC";
pub const ENV_CHANNEL: &str = "CHANNEL";
pub const ENV_KEY: &str = "KEY";

/// Pacing defaults for spoofing sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpoofDefaults {
    /// Sends per reassertion burst
    pub reactive_burst_count: u32,

    /// Pause between reassertion sends (seconds)
    pub reactive_burst_delay_secs: u64,

    /// Sends per periodic burst
    pub periodic_burst_count: u32,

    /// Pause between periodic sends (seconds)
    pub periodic_burst_delay_secs: u64,

    /// Time between periodic announcements (seconds)
    pub periodic_interval_secs: u64,

    /// Destination of forged packets
    pub destination: String,
}

impl Default for SpoofDefaults {
    fn default() -> Self {
        Self {
            reactive_burst_count: 5,
            reactive_burst_delay_secs: 2,
            periodic_burst_count: 1,
            periodic_burst_delay_secs: 1,
            periodic_interval_secs: 60,
            destination: "!ffffffff".to_string(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Store snapshot file
    pub store_path: PathBuf,

    /// Log level
    pub log_level: String,

    /// MQTT broker
    pub broker: BrokerConfig,

    /// Root topic, channel name and key
    pub channel: ChannelSettings,

    pub spoof: SpoofDefaults,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("meshjack-store.json"),
            log_level: "info".to_string(),
            broker: BrokerConfig::default(),
            channel: ChannelSettings::default(),
            spoof: SpoofDefaults::default(),
        }
    }
}

impl AppConfig {
    /// Create a new configuration builder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::IoError(e.to_string()))
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from a variable lookup
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_BROKER) {
            self.broker.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.broker.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("{}={}", ENV_PORT, port)))?;
        }
        if let Some(username) = lookup(ENV_USERNAME) {
            self.broker.username = Some(username);
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.broker.password = Some(password);
        }
        if let Some(root) = lookup(ENV_ROOT_TOPIC) {
            self.channel.root_topic = root;
        }
        if let Some(channel) = lookup(ENV_CHANNEL) {
            self.channel.channel = channel;
        }
        if let Some(key) = lookup(ENV_KEY) {
            self.channel.key = key;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.broker
            .validate()
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        self.channel
            .validate()
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        if self.spoof.reactive_burst_count == 0 || self.spoof.periodic_burst_count == 0 {
            return Err(ConfigError::InvalidValue(
                "burst counts must be at least 1".into(),
            ));
        }

        if self.spoof.periodic_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "periodic_interval_secs cannot be 0".into(),
            ));
        }

        Ok(())
    }
}

/// Configuration builder
#[derive(Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Start from an existing configuration
    pub fn from_config(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn broker_host(mut self, host: impl Into<String>) -> Self {
        self.config.broker.host = host.into();
        self
    }

    pub fn broker_port(mut self, port: u16) -> Self {
        self.config.broker.port = port;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.broker.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.broker.password = Some(password.into());
        self
    }

    pub fn root_topic(mut self, root: impl Into<String>) -> Self {
        self.config.channel.root_topic = root.into();
        self
    }

    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.config.channel.channel = channel.into();
        self
    }

    /// Set the channel key (base64, `AQ==` for the default key, empty for none)
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.config.channel.key = key.into();
        self
    }

    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store_path = path.into();
        self
    }

    /// Set log level
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
