//! ListenerBlueprint - Config Loader output
//!
//! Describes the complete listener setup: dispatch tuning and the processor
//! that performs the actual event handling.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::DispatchConfig;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete listener configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ListenerBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Async dispatch tuning
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Synchronous processor
    #[serde(default)]
    pub processor: ProcessorConfig,
}

/// Processor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Processor name
    #[serde(default = "default_processor_name")]
    pub name: String,

    /// Processor type
    #[serde(default)]
    pub kind: ProcessorKind,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_processor_name() -> String {
    "lineage".to_string()
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            name: default_processor_name(),
            kind: ProcessorKind::default(),
            params: HashMap::new(),
        }
    }
}

/// Processor type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorKind {
    /// Log event summaries
    #[default]
    Log,
    /// Append run records to a JSON-lines file
    File,
}
