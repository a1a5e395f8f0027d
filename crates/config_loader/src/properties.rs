//! 宿主属性覆盖
//!
//! 宿主调度器以扁平 `key=value` 形式下发配置，这里将已识别的键映射到
//! `DispatchConfig` 字段。未识别的键被忽略，格式错误的值返回校验错误。

use std::collections::HashMap;
use std::str::FromStr;

use contracts::{ContractError, DispatchConfig};

/// 队列容量
pub const QUEUE_SIZE_KEY: &str = "lineage.async.queueSize";
/// 工作线程数
pub const THREAD_COUNT_KEY: &str = "lineage.async.threadCount";
/// 每个事件的等待时间 (秒)
pub const TIMEOUT_KEY: &str = "lineage.async.timeout";
/// 终止事件的排空时间 (秒)
pub const SHUTDOWN_WAIT_KEY: &str = "lineage.async.shutdownWait";

/// 将宿主属性应用到分发配置
///
/// 返回实际应用的键数。
pub fn apply(
    dispatch: &mut DispatchConfig,
    properties: &HashMap<String, String>,
) -> Result<usize, ContractError> {
    let mut applied = 0;

    if let Some(value) = properties.get(QUEUE_SIZE_KEY) {
        dispatch.queue_capacity = parse_value(QUEUE_SIZE_KEY, value)?;
        applied += 1;
    }
    if let Some(value) = properties.get(THREAD_COUNT_KEY) {
        dispatch.worker_threads = parse_value(THREAD_COUNT_KEY, value)?;
        applied += 1;
    }
    if let Some(value) = properties.get(TIMEOUT_KEY) {
        dispatch.wait_timeout_s = parse_value(TIMEOUT_KEY, value)?;
        applied += 1;
    }
    if let Some(value) = properties.get(SHUTDOWN_WAIT_KEY) {
        dispatch.shutdown_grace_s = parse_value(SHUTDOWN_WAIT_KEY, value)?;
        applied += 1;
    }

    Ok(applied)
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ContractError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| {
        ContractError::config_validation(key, format!("invalid value '{value}': {e}"))
    })
}

/// 解析 `key=value` 行
///
/// 空行和 `#` 开头的注释被跳过；没有 `=` 的行返回解析错误。
pub fn parse_lines(content: &str) -> Result<HashMap<String, String>, ContractError> {
    let mut properties = HashMap::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| {
            ContractError::config_parse(format!("line {}: expected key=value", index + 1))
        })?;
        properties.insert(key.trim().to_string(), value.trim().to_string());
    }

    Ok(properties)
}
