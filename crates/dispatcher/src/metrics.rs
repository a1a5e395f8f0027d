//! Dispatch counters for observability

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for one dispatcher instance
///
/// Monotonic for the lifetime of the dispatcher, never reset.
#[derive(Debug, Default)]
pub struct DispatchStats {
    /// Tasks rejected at submission or cancelled at shutdown
    dropped: AtomicU64,
    /// Caller waits that ran out of budget
    timed_out: AtomicU64,
    /// Processor errors observed by the caller
    failed: AtomicU64,
    /// Events processed within budget
    completed: AtomicU64,
    /// Tasks accepted by the queue
    submitted: AtomicU64,
    /// Statistics lines emitted, one per handled event
    reported: AtomicU64,
}

impl DispatchStats {
    /// Create new stats instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get dropped count
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Increment dropped count
    pub fn inc_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Add tasks cancelled in bulk
    pub fn add_dropped(&self, count: u64) {
        self.dropped.fetch_add(count, Ordering::Relaxed);
    }

    /// Get timed-out count
    pub fn timed_out(&self) -> u64 {
        self.timed_out.load(Ordering::Relaxed)
    }

    /// Increment timed-out count
    pub fn inc_timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }

    /// Get failed count
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Increment failed count
    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get completed count
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Increment completed count
    pub fn inc_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get submitted count
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Increment submitted count
    pub fn inc_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reported(&self) -> u64 {
        self.reported.load(Ordering::Relaxed)
    }

    pub fn inc_reported(&self) {
        self.reported.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters together with the current queue depth
    pub fn snapshot(&self, queue_depth: usize) -> StatsSnapshot {
        StatsSnapshot {
            dropped: self.dropped(),
            timed_out: self.timed_out(),
            queue_depth,
            failed: self.failed(),
            completed: self.completed(),
            submitted: self.submitted(),
            reported: self.reported(),
        }
    }
}

/// Snapshot of dispatch counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub dropped: u64,
    pub timed_out: u64,
    pub queue_depth: usize,
    pub failed: u64,
    pub completed: u64,
    pub submitted: u64,
    pub reported: u64,
}
