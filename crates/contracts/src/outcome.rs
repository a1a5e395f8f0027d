//! DispatchOutcome - result classification of one async submission

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of dispatching one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Processed within the wait budget without error
    Completed,
    /// Queue full or dispatcher no longer accepting; never processed
    Rejected,
    /// Accepted but not finished within the wait budget; still running
    TimedOut,
    /// Processor returned an error (or panicked) within the wait budget
    Failed,
}

impl DispatchOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::TimedOut => "timed_out",
            Self::Failed => "failed",
        }
    }

    pub fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
