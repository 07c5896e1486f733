//! Cooperative cancellation.
//!
//! A [`CancelToken`] is a shared flag checked at read-batch and partition
//! boundaries. When it trips, the run stops, in-flight buffers are
//! discarded, and partition and solid files from the incomplete run are
//! deleted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; takes effect at the next boundary check.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_clear_and_trips_once_cancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
