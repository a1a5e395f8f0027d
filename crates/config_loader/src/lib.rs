//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Apply host property overrides
//! - Validate configuration legality
//! - Generate `ListenerBlueprint`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("listener.toml")).unwrap();
//! println!("Workers: {}", blueprint.dispatch.worker_threads);
//! ```

mod parser;
pub mod properties;
mod validator;

pub use contracts::ListenerBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::collections::HashMap;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<ListenerBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<ListenerBlueprint, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Apply host `key=value` properties on top of a blueprint
    ///
    /// Recognised keys are listed in [`properties`]; the result is validated
    /// again. Returns the number of keys applied.
    ///
    /// # Errors
    /// - Malformed value for a recognised key
    /// - Validation failure of the resulting configuration
    pub fn apply_properties(
        blueprint: &mut ListenerBlueprint,
        properties: &HashMap<String, String>,
    ) -> Result<usize, ContractError> {
        let applied = properties::apply(&mut blueprint.dispatch, properties)?;
        validator::validate(blueprint)?;
        Ok(applied)
    }

    /// Validate an already constructed blueprint
    pub fn validate(blueprint: &ListenerBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    /// Serialize ListenerBlueprint to TOML string
    pub fn to_toml(blueprint: &ListenerBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize ListenerBlueprint to JSON string
    pub fn to_json(blueprint: &ListenerBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<ListenerBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }
}
