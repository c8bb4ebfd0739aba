//! Node Identity
//!
//! Every mesh node is addressed by a 32-bit node number. Two textual forms
//! derive from it:
//!
//! ```text
//! NodeID:  !a1b2c3d4           ('!' + 8 lowercase hex digits)
//! NodeMAC: 00:00:a1:b2:c3:d4   (number zero-extended to 48 bits)
//! ```
//!
//! All conversions are pure, and number -> ID -> number is exact.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::BROADCAST_NUM;
use crate::errors::{CoreError, CoreResult};

/// Format a node number as a NodeID (`!%08x`)
pub fn num_to_id(num: u32) -> String {
    format!("!{:08x}", num)
}

/// Parse a NodeID back into its node number
///
/// Accepts `!` followed by one to eight hex digits, in either case.
pub fn id_to_num(node_id: &str) -> CoreResult<u32> {
    let digits = node_id
        .strip_prefix('!')
        .ok_or_else(|| CoreError::InvalidNodeId(node_id.to_string()))?;

    if digits.is_empty() || digits.len() > 8 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CoreError::InvalidNodeId(node_id.to_string()));
    }

    u32::from_str_radix(digits, 16).map_err(|_| CoreError::InvalidNodeId(node_id.to_string()))
}

/// Format a node number as a colon-separated 48-bit MAC
pub fn num_to_mac(num: u32) -> String {
    let hex = format!("{:012x}", num);
    hex.as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect::<Vec<_>>()
        .join(":")
}

/// A 32-bit mesh node number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeNumber(pub u32);

impl NodeNumber {
    /// Broadcast destination
    pub const BROADCAST: NodeNumber = NodeNumber(BROADCAST_NUM);

    pub fn new(num: u32) -> Self {
        Self(num)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn is_broadcast(self) -> bool {
        self.0 == BROADCAST_NUM
    }

    pub fn to_node_id(self) -> String {
        num_to_id(self.0)
    }

    pub fn to_mac(self) -> String {
        num_to_mac(self.0)
    }

    pub fn from_node_id(node_id: &str) -> CoreResult<Self> {
        id_to_num(node_id).map(Self)
    }
}

impl From<u32> for NodeNumber {
    fn from(num: u32) -> Self {
        Self(num)
    }
}

impl From<NodeNumber> for u32 {
    fn from(node: NodeNumber) -> Self {
        node.0
    }
}

impl fmt::Display for NodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "!{:08x}", self.0)
    }
}

/// Parses either a NodeID (`!a1b2c3d4`) or a decimal node number
impl FromStr for NodeNumber {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with('!') {
            return Self::from_node_id(s);
        }
        s.parse::<u32>()
            .map(Self)
            .map_err(|_| CoreError::InvalidNodeId(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_to_id() {
        assert_eq!(num_to_id(0), "!00000000");
        assert_eq!(num_to_id(0xa1b2c3d4), "!a1b2c3d4");
        assert_eq!(num_to_id(u32::MAX), "!ffffffff");
    }

    #[test]
    fn test_id_roundtrip_samples() {
        for n in [0u32, 1, 255, 0x1234_5678, 0xdead_beef, u32::MAX - 1, u32::MAX] {
            assert_eq!(id_to_num(&num_to_id(n)).unwrap(), n);
        }
        // Stride through the space as well
        let mut n: u64 = 0;
        while n <= u32::MAX as u64 {
            let v = n as u32;
            assert_eq!(id_to_num(&num_to_id(v)).unwrap(), v);
            n += 7_919_993;
        }
    }

    #[test]
    fn test_canonical_id_roundtrip() {
        for id in ["!00000001", "!a1b2c3d4", "!ffffffff"] {
            assert_eq!(num_to_id(id_to_num(id).unwrap()), id);
        }
    }

    #[test]
    fn test_id_accepts_uppercase_and_short() {
        assert_eq!(id_to_num("!A1B2C3D4").unwrap(), 0xa1b2c3d4);
        assert_eq!(id_to_num("!ff").unwrap(), 0xff);
    }

    #[test]
    fn test_id_rejects_malformed() {
        assert!(id_to_num("a1b2c3d4").is_err());
        assert!(id_to_num("!").is_err());
        assert!(id_to_num("!123456789").is_err());
        assert!(id_to_num("!xyz").is_err());
        assert!(id_to_num("!+1").is_err());
    }

    #[test]
    fn test_num_to_mac() {
        assert_eq!(num_to_mac(0xa1b2c3d4), "00:00:a1:b2:c3:d4");
        assert_eq!(num_to_mac(0), "00:00:00:00:00:00");
    }

    #[test]
    fn test_node_number_parse() {
        let node: NodeNumber = "!0000002a".parse().unwrap();
        assert_eq!(node, NodeNumber(42));
        let node: NodeNumber = "42".parse().unwrap();
        assert_eq!(node, NodeNumber(42));
        assert!("nope".parse::<NodeNumber>().is_err());
    }

    #[test]
    fn test_broadcast() {
        assert!(NodeNumber::BROADCAST.is_broadcast());
        assert_eq!(NodeNumber::BROADCAST.to_string(), "!ffffffff");
    }
}
