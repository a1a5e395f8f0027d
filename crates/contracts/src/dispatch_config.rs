//! Dispatch configuration contracts shared across crates.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::EventKind;

/// Async dispatch configuration
///
/// Immutable once the dispatcher has been constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum queued tasks before new events are rejected
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Number of worker threads
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// How long the source thread waits for each event, in seconds
    #[serde(default = "default_wait_timeout_s")]
    pub wait_timeout_s: f64,

    /// How long the terminal event waits for pending work, in seconds
    #[serde(default = "default_shutdown_grace_s")]
    pub shutdown_grace_s: f64,

    /// Worker thread name prefix
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,

    /// Whether a caller timeout is counted, per event kind
    #[serde(default)]
    pub timeout_accounting: TimeoutAccounting,
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_worker_threads() -> usize {
    2
}

fn default_wait_timeout_s() -> f64 {
    1.0
}

fn default_shutdown_grace_s() -> f64 {
    60.0
}

fn default_thread_name_prefix() -> String {
    "lineage-dispatch".to_string()
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            worker_threads: default_worker_threads(),
            wait_timeout_s: default_wait_timeout_s(),
            shutdown_grace_s: default_shutdown_grace_s(),
            thread_name_prefix: default_thread_name_prefix(),
            timeout_accounting: TimeoutAccounting::default(),
        }
    }
}

impl DispatchConfig {
    /// Per-event wait budget
    pub fn wait_timeout(&self) -> Duration {
        secs_to_duration(self.wait_timeout_s)
    }

    /// Drain budget for the terminal event
    pub fn shutdown_grace(&self) -> Duration {
        secs_to_duration(self.shutdown_grace_s)
    }
}

/// Values too large for a `Duration` saturate to `Duration::MAX`; negative
/// and NaN values collapse to zero (the validator rejects them earlier).
fn secs_to_duration(secs: f64) -> Duration {
    match Duration::try_from_secs_f64(secs) {
        Ok(duration) => duration,
        Err(_) if secs > 0.0 => Duration::MAX,
        Err(_) => Duration::ZERO,
    }
}

/// Timeout accounting policy for one event kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Increment the timed-out counter
    #[default]
    Count,
    /// Record the timeout in the logs only
    Ignore,
}

/// Per-kind timeout accounting table
///
/// The terminal kind is never subject to the wait timeout and has no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutAccounting {
    #[serde(default)]
    pub job_start: TimeoutPolicy,
    #[serde(default)]
    pub job_end: TimeoutPolicy,
    #[serde(default)]
    pub other: TimeoutPolicy,
}

impl TimeoutAccounting {
    /// Policy for the given kind
    pub fn policy(&self, kind: EventKind) -> TimeoutPolicy {
        match kind {
            EventKind::JobStart => self.job_start,
            EventKind::JobEnd => self.job_end,
            EventKind::Other => self.other,
            EventKind::ApplicationEnd => TimeoutPolicy::Ignore,
        }
    }

    /// Whether a timeout for this kind increments the counter
    pub fn counts(&self, kind: EventKind) -> bool {
        self.policy(kind) == TimeoutPolicy::Count
    }
}
