//! # Meshjack Timing
//!
//! Pacing primitives for packet injection.
//!
//! ## Features
//!
//! - **Burst**: N sends with a fixed pause between them, cancellable
//! - **Readiness poll**: bounded wait (100 ms steps, 5 s overall by default)
//! - **Ticker**: fixed-interval repetition until cancelled
//! - **Cancellable sleep**: the building block for both

pub mod readiness;
pub mod scheduler;
mod errors;

pub use errors::*;
pub use readiness::*;
pub use scheduler::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::errors::*;
    pub use crate::readiness::*;
    pub use crate::scheduler::*;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[tokio::test(start_paused = true)]
    async fn test_child_token_stops_burst() {
        let root = CancellationToken::new();
        let child = root.child_token();
        root.cancel();

        let sent = Burst::reactive().run(&child, |_| async {}).await;
        assert_eq!(sent, 0);
        assert!(!sleep_unless_cancelled(Duration::from_secs(60), &child).await);
    }
}
