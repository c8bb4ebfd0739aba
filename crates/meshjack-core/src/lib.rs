//! # Meshjack Core
//!
//! Shared vocabulary for the meshjack toolkit: node identities, application
//! port numbers, routing error codes and hardware models.
//!
//! ## Node Identity
//!
//! ```text
//! NodeNumber: 0xa1b2c3d4
//! NodeID:     !a1b2c3d4
//! NodeMAC:    00:00:a1:b2:c3:d4
//! Broadcast:  !ffffffff
//! ```

pub mod constants;
pub mod errors;
pub mod hardware;
pub mod node;

pub use constants::*;
pub use errors::*;
pub use hardware::*;
pub use node::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::constants::*;
    pub use crate::errors::*;
    pub use crate::hardware::*;
    pub use crate::node::*;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_constants_agree() {
        assert_eq!(num_to_id(BROADCAST_NUM), BROADCAST_ID);
        assert_eq!(id_to_num(BROADCAST_ID).unwrap(), BROADCAST_NUM);
    }

    #[test]
    fn test_coordinate_scale() {
        let lat_i = (-33.4489 * COORDINATE_SCALE).round() as i32;
        assert_eq!(lat_i, -334_489_000);
    }
}
