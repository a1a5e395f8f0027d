//! FileProcessor - appends run records to a JSON-lines file

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::DateTime;
use contracts::{
    ApplicationEnd, ContractError, EventKind, EventProcessor, JobEnd, JobResult, JobStart,
    LifecycleEvent, OtherEvent,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Run state carried by a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunEventType {
    Start,
    Complete,
    Fail,
    Other,
}

/// One line of the output file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub event_type: RunEventType,
    /// RFC 3339
    pub event_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<u64>,
    /// Name of the host event for `OTHER` records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub producer: String,
}

impl RunRecord {
    /// Translate a lifecycle event
    pub fn from_event(event: &LifecycleEvent, producer: &str) -> Result<Self, ContractError> {
        let kind = event.kind();
        let event_time = format_time(kind, event.time_ms())?;

        let (event_type, job_id, event_name, error) = match event {
            LifecycleEvent::JobStart(start) => (RunEventType::Start, Some(start.job_id), None, None),
            LifecycleEvent::JobEnd(end) => match &end.result {
                JobResult::Succeeded => (RunEventType::Complete, Some(end.job_id), None, None),
                JobResult::Failed { message } => {
                    (RunEventType::Fail, Some(end.job_id), None, Some(message.clone()))
                }
            },
            LifecycleEvent::Other(other) => {
                (RunEventType::Other, None, Some(other.name.clone()), None)
            }
            LifecycleEvent::ApplicationEnd(_) => (
                RunEventType::Other,
                None,
                Some(kind.as_str().to_string()),
                None,
            ),
        };

        Ok(Self {
            event_type,
            event_time,
            job_id,
            event_name,
            error,
            producer: producer.to_string(),
        })
    }
}

fn format_time(kind: EventKind, time_ms: i64) -> Result<String, ContractError> {
    DateTime::from_timestamp_millis(time_ms)
        .map(|t| t.to_rfc3339())
        .ok_or_else(|| {
            ContractError::translate(kind.as_str(), format!("event time {time_ms} out of range"))
        })
}

/// Processor that appends one JSON line per event
///
/// Writes from concurrent workers are serialized by the mutex; the buffer is
/// flushed when the terminal event arrives.
pub struct FileProcessor {
    name: String,
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileProcessor {
    /// Open (or create) the output file in append mode
    pub fn new(name: impl Into<String>, path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            name: name.into(),
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Create from params map (for factory); `path` is required
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let path = params.get("path").ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "file processor requires a 'path' parameter",
            )
        })?;
        Self::new(name, path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, event: &LifecycleEvent) -> Result<(), ContractError> {
        let record = RunRecord::from_event(event, &self.name)?;
        let line = serde_json::to_string(&record)
            .map_err(|e| ContractError::translate(event.kind().as_str(), e.to_string()))?;

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| ContractError::emit(&self.name, "writer lock poisoned"))?;
        writeln!(writer, "{line}")?;

        debug!(processor = %self.name, kind = %event.kind(), "Run record appended");
        Ok(())
    }

    fn flush(&self) -> Result<(), ContractError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| ContractError::emit(&self.name, "writer lock poisoned"))?;
        writer.flush()?;
        Ok(())
    }
}

impl EventProcessor for FileProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_job_start(&self, event: &JobStart) -> Result<(), ContractError> {
        self.append(&LifecycleEvent::JobStart(event.clone()))
    }

    fn on_job_end(&self, event: &JobEnd) -> Result<(), ContractError> {
        self.append(&LifecycleEvent::JobEnd(event.clone()))
    }

    fn on_other_event(&self, event: &OtherEvent) -> Result<(), ContractError> {
        self.append(&LifecycleEvent::Other(event.clone()))
    }

    #[instrument(name = "file_processor_close", skip(self, event), fields(processor = %self.name))]
    fn on_application_end(&self, event: &ApplicationEnd) -> Result<(), ContractError> {
        self.append(&LifecycleEvent::ApplicationEnd(event.clone()))?;
        self.flush()?;
        info!(processor = %self.name, path = %self.path.display(), "FileProcessor flushed");
        Ok(())
    }
}
