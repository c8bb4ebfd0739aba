//! MQTT Topic Layout
//!
//! ```text
//! publish:   {root}{channel}/{gateway NodeID}    msh/US/2/e/LongFast/!a1b2c3d4
//! subscribe: {root}#                             msh/US/2/e/#
//! ```

use meshjack_core::NodeNumber;

/// Ensure a root topic ends with `/`
pub fn normalize_root(root: &str) -> String {
    if root.ends_with('/') {
        root.to_string()
    } else {
        format!("{}/", root)
    }
}

/// Topic a gateway publishes a channel's traffic on
pub fn publish_topic(root: &str, channel: &str, gateway: NodeNumber) -> String {
    format!("{}{}/{}", normalize_root(root), channel, gateway.to_node_id())
}

/// Wildcard subscription covering every channel and gateway under a root
pub fn subscribe_topic(root: &str) -> String {
    format!("{}#", normalize_root(root))
}

/// Gateway NodeID from the last topic segment, if it looks like one
pub fn gateway_from_topic(topic: &str) -> Option<NodeNumber> {
    topic
        .rsplit('/')
        .next()
        .and_then(|segment| NodeNumber::from_node_id(segment).ok())
}
