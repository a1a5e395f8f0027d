//! Processor implementations
//!
//! Contains LogProcessor and FileProcessor, plus the factory that builds one
//! from a `ProcessorConfig`.

mod file;
mod log;

use std::sync::Arc;

use contracts::{EventProcessor, ProcessorConfig, ProcessorKind};
use tracing::{info, instrument};

use crate::error::DispatcherError;

pub use self::file::{FileProcessor, RunEventType, RunRecord};
pub use self::log::LogProcessor;

/// Create a processor from configuration
#[instrument(name = "create_processor", skip(config), fields(processor = %config.name, kind = ?config.kind))]
pub fn create_processor(
    config: &ProcessorConfig,
) -> Result<Arc<dyn EventProcessor>, DispatcherError> {
    let processor: Arc<dyn EventProcessor> = match config.kind {
        ProcessorKind::Log => Arc::new(LogProcessor::new(&config.name)),
        ProcessorKind::File => Arc::new(
            FileProcessor::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::processor_creation(&config.name, e.to_string()))?,
        ),
    };

    info!(processor = %config.name, kind = ?config.kind, "Processor created");
    Ok(processor)
}
