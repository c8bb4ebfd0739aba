//! # Meshjack Protocol
//!
//! The mesh application layer as it appears on an MQTT bridge:
//! - protobuf wire messages (`ServiceEnvelope`, `MeshPacket`, `Data`, payloads)
//! - channel contexts and packet sealing/opening with AES-CTR
//! - payload builders and parsers per application port
//! - per-session packet id counter
//!
//! ## Packet Flow
//!
//! ```text
//! Outbound:  OutboundPayload -> Data -> seal -> MeshPacket -> ServiceEnvelope -> bytes
//! Inbound:   bytes -> ServiceEnvelope -> MeshPacket -> decrypt -> Data -> DecodedPayload
//! ```

pub mod codec;
pub mod counter;
pub mod errors;
pub mod packet;
pub mod proto;
pub mod topic;

pub use codec::*;
pub use counter::*;
pub use errors::*;
pub use packet::*;
pub use topic::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::codec::*;
    pub use crate::counter::*;
    pub use crate::errors::*;
    pub use crate::packet::*;
    pub use crate::proto::{Data, MeshPacket, ServiceEnvelope};
    pub use crate::topic::*;
}
