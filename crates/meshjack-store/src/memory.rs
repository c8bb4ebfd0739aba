use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use meshjack_core::NodeNumber;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{StoreError, StoreResult};
use crate::field::NodeField;
use crate::records::{ChannelRecord, NodeRecord, NodeUpdate, PacketActivity};
use crate::store::NodeStore;

/// Default number of packet activity entries retained
pub const DEFAULT_PACKET_CAPACITY: usize = 10_000;

/// Counters of store mutations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Node upserts that wrote at least one field
    pub node_upserts: u64,
    /// Node upserts dropped because the record was frozen
    pub frozen_skips: u64,
    pub channel_upserts: u64,
    pub packets_recorded: u64,
    pub acks_matched: u64,
}

impl StoreStats {
    /// Total writes that changed stored state
    pub fn mutations(&self) -> u64 {
        self.node_upserts + self.channel_upserts + self.packets_recorded + self.acks_matched
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    nodes: Vec<NodeRecord>,
    channels: Vec<ChannelRecord>,
    packets: Vec<PacketActivity>,
}

struct MemoryStoreInner {
    nodes: HashMap<NodeNumber, NodeRecord>,
    channels: HashMap<u32, ChannelRecord>,
    /// Oldest first
    packets: VecDeque<PacketActivity>,
    packet_capacity: usize,
    stats: StoreStats,
}

impl MemoryStoreInner {
    fn push_packet(&mut self, activity: PacketActivity) {
        if self.packets.len() >= self.packet_capacity {
            self.packets.pop_front();
        }
        self.packets.push_back(activity);
    }
}

/// In-memory node store
///
/// All state sits behind one mutex; each trait call takes it once. Clones
/// share the same state. A poisoned lock is recovered rather than
/// propagated, since every critical section leaves the maps consistent.
///
/// Persistence is a JSON snapshot written and read explicitly.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_packet_capacity(DEFAULT_PACKET_CAPACITY)
    }

    /// Create a store retaining at most `capacity` packet entries
    pub fn with_packet_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryStoreInner {
                nodes: HashMap::new(),
                channels: HashMap::new(),
                packets: VecDeque::new(),
                packet_capacity: capacity.max(1),
                stats: StoreStats::default(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryStoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stats(&self) -> StoreStats {
        self.lock().stats
    }

    pub fn node_count(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn packet_count(&self) -> usize {
        self.lock().packets.len()
    }

    /// Every packet entry, oldest first
    pub fn all_packets(&self) -> Vec<PacketActivity> {
        self.lock().packets.iter().cloned().collect()
    }

    /// Write a JSON snapshot of the whole store
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let snapshot = {
            let inner = self.lock();
            Snapshot {
                nodes: inner.nodes.values().cloned().collect(),
                channels: inner.channels.values().cloned().collect(),
                packets: inner.packets.iter().cloned().collect(),
            }
        };
        let json = serde_json::to_string_pretty(&snapshot)?;
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path.as_ref(), json)?;
        debug!(
            path = %path.as_ref().display(),
            nodes = snapshot.nodes.len(),
            "Store snapshot saved"
        );
        Ok(())
    }

    /// Load a store from a JSON snapshot
    pub fn load_snapshot(path: impl AsRef<Path>) -> StoreResult<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        let snapshot: Snapshot = serde_json::from_str(&json)?;
        let store = Self::new();
        {
            let mut inner = store.lock();
            for node in snapshot.nodes {
                inner.nodes.insert(node.node_number, node);
            }
            for channel in snapshot.channels {
                inner.channels.insert(channel.channel_num, channel);
            }
            for packet in snapshot.packets {
                inner.push_packet(packet);
            }
        }
        info!(path = %path.as_ref().display(), nodes = store.node_count(), "Store snapshot loaded");
        Ok(store)
    }

    /// Load a snapshot if the file exists, else start empty
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        if path.as_ref().exists() {
            Self::load_snapshot(path)
        } else {
            Ok(Self::new())
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore for MemoryStore {
    fn get_node(&self, node_number: NodeNumber) -> Option<NodeRecord> {
        self.lock().nodes.get(&node_number).cloned()
    }

    fn get_all_nodes(&self) -> Vec<NodeRecord> {
        let mut nodes: Vec<NodeRecord> = self.lock().nodes.values().cloned().collect();
        nodes.sort_by(|a, b| {
            b.last_seen
                .cmp(&a.last_seen)
                .then_with(|| a.node_number.cmp(&b.node_number))
        });
        nodes
    }

    fn add_or_update_node(&self, node_number: NodeNumber, update: NodeUpdate) -> NodeRecord {
        let mut inner = self.lock();
        let record = inner
            .nodes
            .entry(node_number)
            .or_insert_with(|| NodeRecord::new(node_number));
        let frozen = record.freeze;
        let wrote = update.apply(record);
        let record = record.clone();

        if frozen && !update.is_freeze_only() {
            inner.stats.frozen_skips += 1;
            debug!(node = %node_number, "Update dropped for frozen node");
        } else if wrote {
            inner.stats.node_upserts += 1;
        }
        record
    }

    fn set_freeze(&self, node_number: NodeNumber, freeze: bool) -> Option<NodeRecord> {
        let mut inner = self.lock();
        let record = inner.nodes.get_mut(&node_number)?;
        record.freeze = freeze;
        Some(record.clone())
    }

    fn resolve_node_names(&self, node_number: NodeNumber) -> (Option<String>, Option<String>) {
        match self.lock().nodes.get(&node_number) {
            Some(node) => (node.short_name.clone(), node.long_name.clone()),
            None => (None, None),
        }
    }

    fn add_node_packet(&self, activity: PacketActivity) {
        let mut inner = self.lock();
        inner.push_packet(activity);
        inner.stats.packets_recorded += 1;
    }

    fn mark_packet_success_by_ack(&self, packet_id: u32) -> bool {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let matched = inner
            .packets
            .iter_mut()
            .rev()
            .find(|p| p.packet_id == Some(packet_id));
        match matched {
            Some(packet) => {
                packet.success = Some(true);
                inner.stats.acks_matched += 1;
                true
            }
            None => false,
        }
    }

    fn add_or_update_channel(
        &self,
        channel_num: u32,
        channel_id: Option<&str>,
        member_node_ids: &[String],
    ) -> ChannelRecord {
        let mut inner = self.lock();
        let channel = inner
            .channels
            .entry(channel_num)
            .or_insert_with(|| ChannelRecord::new(channel_num));
        if let Some(name) = channel_id.filter(|name| !name.is_empty()) {
            channel.channel_id = Some(name.to_string());
        }
        channel.members.extend(member_node_ids.iter().cloned());
        let channel = channel.clone();
        inner.stats.channel_upserts += 1;
        channel
    }

    fn set_channel_key(&self, channel_num: u32, key: &str) -> Option<ChannelRecord> {
        let mut inner = self.lock();
        let channel = inner.channels.get_mut(&channel_num)?;
        channel.key = Some(key.to_string());
        Some(channel.clone())
    }

    fn get_channel(&self, channel_num: u32) -> Option<ChannelRecord> {
        self.lock().channels.get(&channel_num).cloned()
    }

    fn get_all_channels(&self) -> Vec<ChannelRecord> {
        let mut channels: Vec<ChannelRecord> = self.lock().channels.values().cloned().collect();
        channels.sort_by_key(|c| c.channel_num);
        channels
    }

    fn set_node_field(&self, node_number: NodeNumber, field: NodeField) -> StoreResult<NodeRecord> {
        let mut inner = self.lock();
        let record = inner
            .nodes
            .get_mut(&node_number)
            .ok_or(StoreError::NodeNotFound(node_number))?;
        field.apply(record);
        Ok(record.clone())
    }

    fn get_node_packets(&self, node_id: &str, limit: usize) -> Vec<PacketActivity> {
        self.lock()
            .packets
            .iter()
            .rev()
            .filter(|p| p.involves(node_id))
            .take(limit)
            .cloned()
            .collect()
    }

    fn clear(&self) {
        let mut inner = self.lock();
        inner.nodes.clear();
        inner.channels.clear();
        inner.packets.clear();
        inner.stats = StoreStats::default();
    }
}
