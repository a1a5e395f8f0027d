//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, ListenerBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<ListenerBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<ListenerBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<ListenerBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ProcessorKind, TimeoutPolicy};

    #[test]
    fn test_parse_empty_toml_uses_defaults() {
        let blueprint = parse_toml("").unwrap();
        assert_eq!(blueprint, ListenerBlueprint::default());
    }

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
version = "V1"

[dispatch]
queue_capacity = 16
worker_threads = 4
wait_timeout_s = 0.25
shutdown_grace_s = 5.0
thread_name_prefix = "lineage"

[dispatch.timeout_accounting]
job_end = "ignore"

[processor]
name = "file_out"
kind = "file"
params = { path = "./lineage.jsonl" }
"#;
        let blueprint = parse_toml(content).unwrap();
        assert_eq!(blueprint.dispatch.queue_capacity, 16);
        assert_eq!(blueprint.dispatch.worker_threads, 4);
        assert_eq!(blueprint.dispatch.wait_timeout_s, 0.25);
        assert_eq!(
            blueprint.dispatch.timeout_accounting.job_end,
            TimeoutPolicy::Ignore
        );
        assert_eq!(
            blueprint.dispatch.timeout_accounting.job_start,
            TimeoutPolicy::Count
        );
        assert_eq!(blueprint.processor.kind, ProcessorKind::File);
        assert_eq!(
            blueprint.processor.params.get("path").map(String::as_str),
            Some("./lineage.jsonl")
        );
    }

    #[test]
    fn test_parse_json() {
        let content = r#"{"dispatch": {"queue_capacity": 5}, "processor": {"kind": "log"}}"#;
        let blueprint = parse_json(content).unwrap();
        assert_eq!(blueprint.dispatch.queue_capacity, 5);
        assert_eq!(blueprint.dispatch.worker_threads, 2);
        assert_eq!(blueprint.processor.name, "lineage");
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = parse_toml("[dispatch\nqueue_capacity = ");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_parse_unknown_processor_kind() {
        let result = parse_toml("[processor]\nkind = \"kafka\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
