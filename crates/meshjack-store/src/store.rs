//! Node Store Interface
//!
//! The single store contract shared by the dispatcher, the orchestrator and
//! the administrative commands. Every call is one critical section in the
//! implementation, so callers never observe a half-applied update.

use meshjack_core::NodeNumber;

use crate::errors::StoreResult;
use crate::field::NodeField;
use crate::records::{ChannelRecord, NodeRecord, NodeUpdate, PacketActivity};

/// Store of observed nodes, channels and packet activity
pub trait NodeStore: Send + Sync {
    fn get_node(&self, node_number: NodeNumber) -> Option<NodeRecord>;

    /// All nodes, most recently seen first
    fn get_all_nodes(&self) -> Vec<NodeRecord>;

    /// Create or merge a node record
    ///
    /// A frozen record only accepts changes to `freeze`; every other field of
    /// the update is dropped.
    fn add_or_update_node(&self, node_number: NodeNumber, update: NodeUpdate) -> NodeRecord;

    /// Set or clear the freeze flag; `None` if the node is unknown
    fn set_freeze(&self, node_number: NodeNumber, freeze: bool) -> Option<NodeRecord>;

    /// (short name, long name) of a node, if known
    fn resolve_node_names(&self, node_number: NodeNumber) -> (Option<String>, Option<String>);

    fn add_node_packet(&self, activity: PacketActivity);

    /// Mark the most recent activity carrying `packet_id` as acknowledged
    ///
    /// # Returns
    /// `true` if an entry matched
    fn mark_packet_success_by_ack(&self, packet_id: u32) -> bool;

    /// Create or update a channel, adding members (membership only grows)
    fn add_or_update_channel(
        &self,
        channel_num: u32,
        channel_id: Option<&str>,
        member_node_ids: &[String],
    ) -> ChannelRecord;

    /// Record the key a channel is known to use
    fn set_channel_key(&self, channel_num: u32, key: &str) -> Option<ChannelRecord>;

    fn get_channel(&self, channel_num: u32) -> Option<ChannelRecord>;

    fn get_all_channels(&self) -> Vec<ChannelRecord>;

    /// Administrative edit of one field, regardless of freeze
    fn set_node_field(&self, node_number: NodeNumber, field: NodeField) -> StoreResult<NodeRecord>;

    /// Activity sent by or addressed to a node, newest first
    fn get_node_packets(&self, node_id: &str, limit: usize) -> Vec<PacketActivity>;

    /// Drop every node, channel and packet
    fn clear(&self);
}
