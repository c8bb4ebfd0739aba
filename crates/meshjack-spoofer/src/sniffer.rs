//! Passive Sniffer
//!
//! Listens to the whole root topic and records what it sees. Nothing is
//! ever published.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use meshjack_client::{ClientResult, DispatchFilter, ListenStats, MeshClient, Observer};
use meshjack_core::PortNum;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::errors::SpoofError;

/// Port groups selectable for sniffing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SniffPort {
    Text,
    RangeTest,
    Position,
    NodeInfo,
    /// Routing and traceroute
    Routing,
    Telemetry,
}

impl SniffPort {
    pub const ALL: [SniffPort; 6] = [
        SniffPort::Text,
        SniffPort::RangeTest,
        SniffPort::Position,
        SniffPort::NodeInfo,
        SniffPort::Routing,
        SniffPort::Telemetry,
    ];

    pub fn ports(&self) -> &'static [PortNum] {
        match self {
            SniffPort::Text => &[PortNum::TextMessage],
            SniffPort::RangeTest => &[PortNum::RangeTest],
            SniffPort::Position => &[PortNum::Position],
            SniffPort::NodeInfo => &[PortNum::NodeInfo],
            SniffPort::Routing => &[PortNum::Routing, PortNum::Traceroute],
            SniffPort::Telemetry => &[PortNum::Telemetry],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SniffPort::Text => "text",
            SniffPort::RangeTest => "rangetest",
            SniffPort::Position => "position",
            SniffPort::NodeInfo => "nodeinfo",
            SniffPort::Routing => "routing",
            SniffPort::Telemetry => "telemetry",
        }
    }
}

impl FromStr for SniffPort {
    type Err = SpoofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', '_'], "");
        match wanted.as_str() {
            "text" | "message" => Ok(SniffPort::Text),
            "rangetest" => Ok(SniffPort::RangeTest),
            "position" => Ok(SniffPort::Position),
            "nodeinfo" => Ok(SniffPort::NodeInfo),
            "routing" | "traceroute" => Ok(SniffPort::Routing),
            "telemetry" => Ok(SniffPort::Telemetry),
            _ => Err(SpoofError::UnknownPortGroup(s.to_string())),
        }
    }
}

impl fmt::Display for SniffPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Listen-only agent
pub struct Sniffer {
    client: MeshClient,
    ports: Vec<SniffPort>,
}

impl Sniffer {
    /// Sniff the given port groups; every port when `ports` is empty
    pub fn new(client: MeshClient, ports: Vec<SniffPort>) -> Self {
        Self { client, ports }
    }

    pub fn filter(&self) -> DispatchFilter {
        if self.ports.is_empty() {
            return DispatchFilter::all();
        }
        let ports = self.ports.iter().flat_map(|group| group.ports().iter().copied());
        DispatchFilter::all().with_ports(ports)
    }

    /// Record the configured channel, then listen until cancelled
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        observer: Option<Arc<dyn Observer>>,
    ) -> ClientResult<ListenStats> {
        self.client.remember_channel();

        let mut dispatcher = self.client.dispatcher(self.filter());
        if let Some(observer) = observer {
            dispatcher = dispatcher.with_observer(observer);
        }

        let groups: Vec<&str> = self.ports.iter().map(SniffPort::name).collect();
        info!(
            channel = %self.client.channel().name(),
            ports = %if groups.is_empty() { "all".to_string() } else { groups.join(",") },
            "Sniffing"
        );

        let stats = self.client.listener(dispatcher).run(cancel).await?;
        info!(received = stats.received, dispatched = stats.dispatched, "Sniffer stopped");
        Ok(stats)
    }
}
