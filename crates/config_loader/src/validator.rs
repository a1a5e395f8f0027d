//! 配置校验模块
//!
//! 校验规则：
//! - queue_capacity >= 1, worker_threads >= 1
//! - 超时时间为有限非负数
//! - 线程名前缀非空
//! - file 处理器必须提供 params.path

use contracts::{ContractError, DispatchConfig, ListenerBlueprint, ProcessorConfig, ProcessorKind};

/// 校验 ListenerBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &ListenerBlueprint) -> Result<(), ContractError> {
    validate_dispatch(&blueprint.dispatch)?;
    validate_processor(&blueprint.processor)?;
    Ok(())
}

/// 校验分发配置
pub fn validate_dispatch(dispatch: &DispatchConfig) -> Result<(), ContractError> {
    if dispatch.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "dispatch.queue_capacity",
            "queue_capacity must be >= 1",
        ));
    }

    if dispatch.worker_threads == 0 {
        return Err(ContractError::config_validation(
            "dispatch.worker_threads",
            "worker_threads must be >= 1",
        ));
    }

    validate_seconds("dispatch.wait_timeout_s", dispatch.wait_timeout_s)?;
    validate_seconds("dispatch.shutdown_grace_s", dispatch.shutdown_grace_s)?;

    if dispatch.thread_name_prefix.trim().is_empty() {
        return Err(ContractError::config_validation(
            "dispatch.thread_name_prefix",
            "thread_name_prefix cannot be empty",
        ));
    }

    Ok(())
}

fn validate_seconds(field: &str, value: f64) -> Result<(), ContractError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ContractError::config_validation(
            field,
            format!("must be a finite number >= 0, got {value}"),
        ));
    }
    Ok(())
}

/// 校验处理器配置
fn validate_processor(processor: &ProcessorConfig) -> Result<(), ContractError> {
    if processor.name.trim().is_empty() {
        return Err(ContractError::config_validation(
            "processor.name",
            "processor name cannot be empty",
        ));
    }

    if processor.kind == ProcessorKind::File {
        let has_path = processor
            .params
            .get("path")
            .is_some_and(|p| !p.trim().is_empty());
        if !has_path {
            return Err(ContractError::config_validation(
                format!("processor[{}].params.path", processor.name),
                "file processor requires 'path' parameter",
            ));
        }
    }

    Ok(())
}
