//! LifecycleEvent - event source output
//!
//! Events are delivered one at a time by the host scheduler thread.
//! Exactly one `ApplicationEnd` is expected per source lifetime.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Lifecycle event delivered by the host scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A job was submitted
    JobStart(JobStart),
    /// A job finished (successfully or not)
    JobEnd(JobEnd),
    /// The application is about to exit (terminal)
    ApplicationEnd(ApplicationEnd),
    /// Any other host event
    Other(OtherEvent),
}

impl LifecycleEvent {
    /// Event kind discriminant
    pub fn kind(&self) -> EventKind {
        match self {
            Self::JobStart(_) => EventKind::JobStart,
            Self::JobEnd(_) => EventKind::JobEnd,
            Self::ApplicationEnd(_) => EventKind::ApplicationEnd,
            Self::Other(_) => EventKind::Other,
        }
    }

    /// Whether this is the terminal event
    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }

    /// Event time in epoch milliseconds
    pub fn time_ms(&self) -> i64 {
        match self {
            Self::JobStart(e) => e.time_ms,
            Self::JobEnd(e) => e.time_ms,
            Self::ApplicationEnd(e) => e.time_ms,
            Self::Other(e) => e.time_ms,
        }
    }
}

impl From<JobStart> for LifecycleEvent {
    fn from(event: JobStart) -> Self {
        Self::JobStart(event)
    }
}

impl From<JobEnd> for LifecycleEvent {
    fn from(event: JobEnd) -> Self {
        Self::JobEnd(event)
    }
}

impl From<ApplicationEnd> for LifecycleEvent {
    fn from(event: ApplicationEnd) -> Self {
        Self::ApplicationEnd(event)
    }
}

impl From<OtherEvent> for LifecycleEvent {
    fn from(event: OtherEvent) -> Self {
        Self::Other(event)
    }
}

/// Event kind (field-less discriminant)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    JobStart,
    JobEnd,
    ApplicationEnd,
    Other,
}

impl EventKind {
    /// Only `ApplicationEnd` is terminal
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::ApplicationEnd)
    }

    /// Stable snake_case name (used for log fields and metric labels)
    pub fn as_str(self) -> &'static str {
        match self {
            Self::JobStart => "job_start",
            Self::JobEnd => "job_end",
            Self::ApplicationEnd => "application_end",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job submitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStart {
    /// Host-assigned job id
    pub job_id: u64,

    /// Submission time (epoch ms)
    pub time_ms: i64,

    /// Stages belonging to the job
    #[serde(default)]
    pub stage_ids: Vec<u64>,

    /// Job properties as seen by the host
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

/// Job finished
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEnd {
    /// Host-assigned job id
    pub job_id: u64,

    /// Completion time (epoch ms)
    pub time_ms: i64,

    /// Final job result
    #[serde(default)]
    pub result: JobResult,
}

/// Final job result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobResult {
    #[default]
    Succeeded,
    Failed {
        message: String,
    },
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Application is about to exit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationEnd {
    /// Exit time (epoch ms)
    pub time_ms: i64,
}

/// Any other host event, kept as an opaque payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherEvent {
    /// Host event name (e.g. "sql_execution_start")
    pub name: String,

    /// Event time (epoch ms)
    pub time_ms: i64,

    /// Opaque payload
    #[serde(default)]
    pub payload: serde_json::Value,
}
