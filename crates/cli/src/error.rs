//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Event stream could not be opened
    #[error("Failed to open event stream {path}: {source}")]
    EventSource {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Replay thread failed
    #[error("Replay failed: {message}")]
    Replay { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn event_source(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::EventSource {
            path: path.into(),
            source,
        }
    }

    pub fn replay(message: impl Into<String>) -> Self {
        Self::Replay {
            message: message.into(),
        }
    }
}
