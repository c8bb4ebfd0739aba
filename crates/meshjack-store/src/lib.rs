//! # Meshjack Store
//!
//! Last-known state of the mesh as observed on the bridge: node records,
//! channel membership and packet activity, behind the [`NodeStore`] trait.
//!
//! The impersonated node's record can be frozen so that genuine traffic seen
//! during a spoofing session does not overwrite it.

pub mod errors;
pub mod field;
pub mod memory;
pub mod records;
pub mod store;

pub use errors::*;
pub use field::*;
pub use memory::*;
pub use records::*;
pub use store::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::errors::*;
    pub use crate::field::*;
    pub use crate::memory::*;
    pub use crate::records::*;
    pub use crate::store::*;
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshjack_core::NodeNumber;
    use std::sync::Arc;

    #[test]
    fn test_store_as_trait_object() {
        let store: Arc<dyn NodeStore> = Arc::new(MemoryStore::new());
        store.add_or_update_node(NodeNumber(1), NodeUpdate::seen_at(unix_now()));
        assert!(store.get_node(NodeNumber(1)).unwrap().last_seen.is_some());
    }

    #[test]
    fn test_concurrent_upserts() {
        let store = MemoryStore::new();
        let handles: Vec<_> = (0..8u32)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for j in 0..50u32 {
                        store.add_or_update_node(NodeNumber(i * 100 + j), NodeUpdate::seen_at(1));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.node_count(), 400);
        assert_eq!(store.stats().node_upserts, 400);
    }
}
