//! Message ID Counter
//!
//! Outbound packet ids come from one counter per session, seeded randomly so
//! that consecutive runs do not reuse ids the mesh may still remember.

use std::sync::atomic::{AtomicU32, Ordering};

use rand::Rng;

/// Monotonic (wrapping) source of outbound packet ids
#[derive(Debug)]
pub struct MessageIdCounter {
    next: AtomicU32,
}

impl MessageIdCounter {
    /// Create a counter seeded from the thread RNG
    pub fn new() -> Self {
        Self::starting_at(rand::thread_rng().gen())
    }

    /// Create a counter whose first id is `first`
    pub fn starting_at(first: u32) -> Self {
        Self {
            next: AtomicU32::new(first),
        }
    }

    /// Take the next id; zero is skipped
    pub fn next_id(&self) -> u32 {
        loop {
            let id = self.next.fetch_add(1, Ordering::Relaxed);
            if id != 0 {
                return id;
            }
        }
    }

    /// Peek at the id the next call will return (zero not yet skipped)
    pub fn peek(&self) -> u32 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for MessageIdCounter {
    fn default() -> Self {
        Self::new()
    }
}
