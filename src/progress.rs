//! Progress tracking for counting runs.
//!
//! This module provides thread-safe progress reporting via callbacks,
//! allowing callers to monitor long-running scatter and conversion stages.
//! An observer, when attached, is notified once every
//! [`DEFAULT_NOTIFY_EVERY`] reads (or a custom period).

use std::sync::atomic::{AtomicU64, Ordering};

/// Reads between two observer notifications, unless overridden.
pub const DEFAULT_NOTIFY_EVERY: u64 = 5_000;

/// Progress snapshot during a counting run.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    /// Number of reads processed so far.
    pub reads_processed: u64,
    /// Total number of bases processed so far.
    pub bases_processed: u64,
}

type Observer = Box<dyn Fn(&Progress) + Send + Sync>;

/// Thread-safe progress tracker using atomic counters.
///
/// Counters can be updated from multiple worker threads; the observer (if
/// any) fires on the thread that crosses a notification boundary.
#[derive(Default)]
pub struct ProgressTracker {
    reads: AtomicU64,
    bases: AtomicU64,
    observer: Option<(u64, Observer)>,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("reads", &self.reads)
            .field("bases", &self.bases)
            .field("observer", &self.observer.as_ref().map(|(every, _)| every))
            .finish()
    }
}

impl ProgressTracker {
    /// Create a new progress tracker with zero counts and no observer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reads: AtomicU64::new(0),
            bases: AtomicU64::new(0),
            observer: None,
        }
    }

    /// Attach an observer called once every `every` reads.
    #[must_use]
    pub fn with_observer<F>(mut self, every: u64, observer: F) -> Self
    where
        F: Fn(&Progress) + Send + Sync + 'static,
    {
        self.observer = Some((every.max(1), Box::new(observer)));
        self
    }

    /// Record that a read of `bases` bases has been processed.
    pub fn record_sequence(&self, bases: u64) {
        let reads = self.reads.fetch_add(1, Ordering::Relaxed) + 1;
        self.bases.fetch_add(bases, Ordering::Relaxed);
        if let Some((every, observer)) = &self.observer {
            if reads % every == 0 {
                observer(&self.snapshot());
            }
        }
    }

    /// Get a snapshot of the current progress.
    ///
    /// The returned values represent the state at a point in time and may
    /// change immediately after this call returns.
    #[must_use]
    pub fn snapshot(&self) -> Progress {
        Progress {
            reads_processed: self.reads.load(Ordering::Relaxed),
            bases_processed: self.bases.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.reads.store(0, Ordering::Relaxed);
        self.bases.store(0, Ordering::Relaxed);
    }
}
