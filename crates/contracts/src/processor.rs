//! EventProcessor trait - synchronous consumer interface
//!
//! Defines the translate-and-emit contract invoked once per event.

use crate::{ApplicationEnd, ContractError, JobEnd, JobStart, LifecycleEvent, OtherEvent};

/// Synchronous event processor
///
/// Implementations may be called from any thread, concurrently.
/// Every method blocks until the event has been fully handled.
pub trait EventProcessor: Send + Sync {
    /// Processor name (used for logging/metrics)
    fn name(&self) -> &str;

    fn on_job_start(&self, event: &JobStart) -> Result<(), ContractError>;

    fn on_job_end(&self, event: &JobEnd) -> Result<(), ContractError>;

    fn on_other_event(&self, event: &OtherEvent) -> Result<(), ContractError>;

    /// Handle the terminal event
    ///
    /// Called at most once, after all other processing has stopped.
    fn on_application_end(&self, event: &ApplicationEnd) -> Result<(), ContractError>;

    /// Route an event to the handler for its kind
    fn process(&self, event: &LifecycleEvent) -> Result<(), ContractError> {
        match event {
            LifecycleEvent::JobStart(e) => self.on_job_start(e),
            LifecycleEvent::JobEnd(e) => self.on_job_end(e),
            LifecycleEvent::ApplicationEnd(e) => self.on_application_end(e),
            LifecycleEvent::Other(e) => self.on_other_event(e),
        }
    }
}
