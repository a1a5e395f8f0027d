//! Layered error definitions
//!
//! Categorized by source: config / translate / emit

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Processing Errors =====
    /// Event could not be translated into an output record
    #[error("translate error for {kind} event: {message}")]
    Translate { kind: String, message: String },

    /// Translated record could not be emitted
    #[error("processor '{processor}' emit error: {message}")]
    Emit { processor: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create translate error
    pub fn translate(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Translate {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create emit error
    pub fn emit(processor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Emit {
            processor: processor.into(),
            message: message.into(),
        }
    }
}
