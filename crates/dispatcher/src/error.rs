//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Processor creation error
    #[error("failed to create processor '{name}': {message}")]
    ProcessorCreation { name: String, message: String },

    /// Worker thread could not be spawned
    #[error("failed to spawn worker thread '{thread}': {source}")]
    WorkerSpawn {
        thread: String,
        #[source]
        source: std::io::Error,
    },

    /// Queue full - task rejected
    #[error("work queue full (capacity {capacity}), {kind} event rejected")]
    QueueFull { capacity: usize, kind: String },

    /// Queue closed - dispatcher is shutting down
    #[error("work queue closed, {kind} event rejected")]
    QueueClosed { kind: String },

    /// Shutdown sequencing failure
    #[error("shutdown failed: {message}")]
    Shutdown { message: String },

    /// Processor error (from contract)
    #[error("processor error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a processor creation error
    pub fn processor_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProcessorCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a shutdown error
    pub fn shutdown(message: impl Into<String>) -> Self {
        Self::Shutdown {
            message: message.into(),
        }
    }
}
