//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 订阅器安装 (JSON/Pretty/Compact 格式，带线程名，便于区分工作线程)
//! - Prometheus 导出器安装与指标描述注册
//! - 分发结果、等待时间与队列深度的指标收集与统计
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{LogFormat, TracingConfig};
//!
//! observability::init_tracing(&TracingConfig {
//!     format: LogFormat::Compact,
//!     default_level: "debug".into(),
//!     force_level: false,
//! })?;
//! observability::init_metrics_only(9000)?;
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

pub use crate::metrics::{
    describe_dispatch_metrics, record_dispatch_outcome, record_queue_depth,
    record_stats_snapshot, record_tasks_cancelled, record_wait_latency_ms,
    DispatchMetricsAggregator, MetricsSummary, RunningStats, StatsSummary,
};

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志
    Json,
    /// 人类可读格式
    #[default]
    Pretty,
    /// 紧凑单行格式
    Compact,
}

/// Tracing 配置
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// 日志格式
    pub format: LogFormat,
    /// RUST_LOG 未设置时使用的级别
    pub default_level: String,
    /// 忽略 RUST_LOG，强制使用 `default_level` (例如 `--quiet`)
    pub force_level: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            default_level: "info".to_string(),
            force_level: false,
        }
    }
}

impl TracingConfig {
    fn filter(&self) -> EnvFilter {
        if self.force_level {
            return EnvFilter::new(&self.default_level);
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_level))
    }
}

/// 按格式构建输出层
///
/// 所有格式都带线程名，工作线程名形如 `<prefix>-<index>`。
pub fn fmt_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_thread_names(true).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_thread_names(true).boxed(),
    }
}

/// 安装全局 Tracing 订阅器
///
/// 只能成功调用一次；重复安装返回错误。
pub fn init_tracing(config: &TracingConfig) -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt_layer(config.format))
        .with(config.filter())
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}

/// 仅初始化 Prometheus 指标（不初始化 Tracing）
///
/// 安装全局 recorder 并注册分发指标描述。
/// 导出器的 HTTP 监听需要运行中的 Tokio runtime。
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    describe_dispatch_metrics();

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}
