//! # Meshjack Spoofer
//!
//! Node impersonation, passive sniffing and store administration on top of
//! the meshjack client.
//!
//! ## Features
//!
//! - Four impersonation strategies: direct, reactive, periodic, hybrid
//! - Target record frozen while a session listens, released on every exit
//! - Passive sniffer with port-group selection
//! - Layered configuration: defaults, TOML file, environment, flags
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                       Meshjack                         │
//! ├────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  │
//! │  │ Orchestrator │  │   Sniffer    │  │ Send / Admin │  │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  │
//! │          │                 │                 │         │
//! │          ▼                 ▼                 ▼         │
//! │  ┌──────────────────────────────────────────────────┐  │
//! │  │ MeshClient: Sender · Dispatcher · Listener       │  │
//! │  └──────────────────────────────────────────────────┘  │
//! │          │                                   │         │
//! │          ▼                                   ▼         │
//! │  ┌──────────────┐                    ┌──────────────┐  │
//! │  │ MQTT broker  │                    │ MemoryStore  │  │
//! │  └──────────────┘                    └──────────────┘  │
//! └────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod errors;
pub mod orchestrator;
pub mod params;
pub mod sniffer;
pub mod table;

pub use config::*;
pub use errors::*;
pub use orchestrator::*;
pub use params::*;
pub use sniffer::*;
pub use table::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::errors::*;
    pub use crate::orchestrator::*;
    pub use crate::params::*;
    pub use crate::sniffer::*;
}

use std::sync::Arc;
use std::time::Duration;

use meshjack_client::{
    Connector, ListenStats, MeshClient, MqttConnector, Observer, SendOutcome, SendRequest,
};
use meshjack_core::NodeNumber;
use meshjack_store::MemoryStore;
use meshjack_timing::{Burst, Ticker};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// The application: configuration, store and client wired together
pub struct Meshjack {
    config: AppConfig,
    store: MemoryStore,
    client: MeshClient,
}

impl Meshjack {
    /// Wire up with an explicit transport and store
    pub fn new(
        config: AppConfig,
        connector: Arc<dyn Connector>,
        store: MemoryStore,
    ) -> SpoofResult<Self> {
        config.validate()?;
        let client = MeshClient::new(connector, Arc::new(store.clone()), config.channel.clone())?;
        Ok(Self {
            config,
            store,
            client,
        })
    }

    /// MQTT transport and the store snapshot named in the configuration
    pub fn open(config: AppConfig) -> SpoofResult<Self> {
        let store = MemoryStore::open(&config.store_path)?;
        let connector = Arc::new(MqttConnector::new(config.broker.clone()));
        info!(
            broker = %config.broker.host,
            port = config.broker.port,
            store = %config.store_path.display(),
            "Opened"
        );
        Self::new(config, connector, store)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn client(&self) -> &MeshClient {
        &self.client
    }

    /// Session plan with pacing and destination from the configuration
    pub fn plan(&self, target: NodeNumber, strategy: Strategy) -> SpoofResult<SpoofPlan> {
        let spoof = &self.config.spoof;
        let mut plan = SpoofPlan::new(target, strategy);
        plan.destination = spoof.destination.parse()?;
        plan.reactive_burst = Burst::new(
            spoof.reactive_burst_count,
            Duration::from_secs(spoof.reactive_burst_delay_secs),
        )?;
        plan.periodic_burst = Burst::new(
            spoof.periodic_burst_count,
            Duration::from_secs(spoof.periodic_burst_delay_secs),
        )?;
        plan.interval = Ticker::new(Duration::from_secs(spoof.periodic_interval_secs))?;
        Ok(plan)
    }

    pub async fn spoof(&self, plan: SpoofPlan, cancel: &CancellationToken) -> SpoofResult<SpoofReport> {
        Orchestrator::new(self.client.clone(), plan)?.run(cancel).await
    }

    pub async fn sniff(
        &self,
        ports: Vec<SniffPort>,
        cancel: &CancellationToken,
        observer: Option<Arc<dyn Observer>>,
    ) -> SpoofResult<ListenStats> {
        Ok(Sniffer::new(self.client.clone(), ports).run(cancel, observer).await?)
    }

    /// Send one packet
    pub async fn send(&self, request: &SendRequest) -> SpoofResult<SendOutcome> {
        Ok(self.client.sender().send(request).await?)
    }

    /// Write the store snapshot back to its file
    pub fn save(&self) -> SpoofResult<()> {
        self.store.save_snapshot(&self.config.store_path)?;
        Ok(())
    }
}
