//! LogProcessor - logs event summaries via tracing

use contracts::{ApplicationEnd, ContractError, EventProcessor, JobEnd, JobStart, OtherEvent};
use tracing::info;

/// Processor that logs one line per event
pub struct LogProcessor {
    name: String,
}

impl LogProcessor {
    /// Create a new LogProcessor with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl EventProcessor for LogProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_job_start(&self, event: &JobStart) -> Result<(), ContractError> {
        info!(
            processor = %self.name,
            job_id = event.job_id,
            time_ms = event.time_ms,
            stages = event.stage_ids.len(),
            "Job started"
        );
        Ok(())
    }

    fn on_job_end(&self, event: &JobEnd) -> Result<(), ContractError> {
        info!(
            processor = %self.name,
            job_id = event.job_id,
            time_ms = event.time_ms,
            success = event.result.is_success(),
            "Job ended"
        );
        Ok(())
    }

    fn on_other_event(&self, event: &OtherEvent) -> Result<(), ContractError> {
        info!(
            processor = %self.name,
            event = %event.name,
            time_ms = event.time_ms,
            "Event received"
        );
        Ok(())
    }

    fn on_application_end(&self, event: &ApplicationEnd) -> Result<(), ContractError> {
        info!(processor = %self.name, time_ms = event.time_ms, "Application ended");
        Ok(())
    }
}
