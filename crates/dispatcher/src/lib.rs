//! # Dispatcher
//!
//! 异步事件分发模块。
//!
//! 负责：
//! - 将生命周期事件提交到有界队列，由固定数量的工作线程处理
//! - 调用方最多等待 `wait_timeout`，慢处理器不阻塞事件源
//! - 终止事件到达时停止接收、限时排空队列，然后同步处理终止事件
//! - 统计丢弃、超时、失败数量

pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod processors;

pub use contracts::{DispatchOutcome, EventProcessor, LifecycleEvent};
pub use dispatcher::{
    create_dispatcher, AsyncDispatcher, DispatcherBuilder, DispatcherState, DrainReport,
};
pub use error::DispatcherError;
pub use metrics::{DispatchStats, StatsSnapshot};
pub use processors::{create_processor, FileProcessor, LogProcessor, RunEventType, RunRecord};
