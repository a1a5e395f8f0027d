//! 分发指标收集模块
//!
//! 记录每次分发的结果、调用方等待时间以及工作队列深度。

use std::collections::HashMap;

use contracts::{DispatchOutcome, EventKind};
use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};

/// 注册分发指标描述
///
/// 在 recorder 安装之后调用一次。
pub fn describe_dispatch_metrics() {
    describe_counter!(
        "lineage_dispatch_events_total",
        "Events handled by the dispatcher, by kind and outcome"
    );
    describe_histogram!(
        "lineage_dispatch_wait_ms",
        Unit::Milliseconds,
        "Time the source thread spent in on_event"
    );
    describe_gauge!(
        "lineage_dispatch_queue_depth",
        "Tasks queued but not yet picked up by a worker"
    );
    describe_gauge!(
        "lineage_dispatch_dropped",
        "Tasks rejected at submission or cancelled at shutdown"
    );
    describe_gauge!(
        "lineage_dispatch_timed_out",
        "Caller waits that ran out of budget"
    );
    describe_gauge!(
        "lineage_dispatch_failed",
        "Processor errors observed within the wait budget"
    );
    describe_counter!(
        "lineage_dispatch_tasks_cancelled_total",
        "Queued tasks discarded by forced shutdown"
    );
}

/// 记录单次分发结果
///
/// 每次 `on_event` 返回后调用。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_dispatch_outcome;
///
/// let outcome = dispatcher.on_event(event);
/// record_dispatch_outcome(kind, outcome);
/// ```
pub fn record_dispatch_outcome(kind: EventKind, outcome: DispatchOutcome) {
    counter!(
        "lineage_dispatch_events_total",
        "kind" => kind.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// 记录调用方等待时间
pub fn record_wait_latency_ms(kind: EventKind, latency_ms: f64) {
    histogram!("lineage_dispatch_wait_ms", "kind" => kind.as_str()).record(latency_ms);
}

/// 记录工作队列深度
pub fn record_queue_depth(depth: usize) {
    gauge!("lineage_dispatch_queue_depth").set(depth as f64);
}

/// 记录统计快照 (与日志行字段一致)
pub fn record_stats_snapshot(dropped: u64, timed_out: u64, failed: u64, queue_depth: usize) {
    gauge!("lineage_dispatch_dropped").set(dropped as f64);
    gauge!("lineage_dispatch_timed_out").set(timed_out as f64);
    gauge!("lineage_dispatch_failed").set(failed as f64);
    record_queue_depth(queue_depth);
}

/// 记录关闭时被强制取消的任务数
pub fn record_tasks_cancelled(count: usize) {
    if count > 0 {
        counter!("lineage_dispatch_tasks_cancelled_total").increment(count as u64);
    }
}

/// 分发指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct DispatchMetricsAggregator {
    /// 总事件数
    pub total_events: u64,

    /// 各结果计数
    pub outcome_counts: HashMap<DispatchOutcome, u64>,

    /// 各事件类型计数
    pub kind_counts: HashMap<EventKind, u64>,

    /// 调用方等待时间统计 (毫秒)
    pub wait_stats: RunningStats,
}

impl DispatchMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, kind: EventKind, outcome: DispatchOutcome, wait_ms: f64) {
        self.total_events += 1;
        *self.outcome_counts.entry(outcome).or_insert(0) += 1;
        *self.kind_counts.entry(kind).or_insert(0) += 1;
        self.wait_stats.push(wait_ms);
    }

    /// 某一结果的计数
    pub fn count(&self, outcome: DispatchOutcome) -> u64 {
        self.outcome_counts.get(&outcome).copied().unwrap_or(0)
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let completed = self.count(DispatchOutcome::Completed);
        MetricsSummary {
            total_events: self.total_events,
            completed,
            rejected: self.count(DispatchOutcome::Rejected),
            timed_out: self.count(DispatchOutcome::TimedOut),
            failed: self.count(DispatchOutcome::Failed),
            completion_rate: if self.total_events > 0 {
                completed as f64 / self.total_events as f64 * 100.0
            } else {
                0.0
            },
            wait_ms: StatsSummary::from(&self.wait_stats),
            kind_counts: self
                .kind_counts
                .iter()
                .map(|(kind, count)| (kind.as_str().to_string(), *count))
                .collect(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_events: u64,
    pub completed: u64,
    pub rejected: u64,
    pub timed_out: u64,
    pub failed: u64,
    pub completion_rate: f64,
    pub wait_ms: StatsSummary,
    pub kind_counts: HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Metrics Summary ===")?;
        writeln!(f, "Total events: {}", self.total_events)?;
        writeln!(
            f,
            "Completed: {} ({:.2}%)",
            self.completed, self.completion_rate
        )?;
        writeln!(f, "Rejected: {}", self.rejected)?;
        writeln!(f, "Timed out: {}", self.timed_out)?;
        writeln!(f, "Failed: {}", self.failed)?;
        writeln!(f, "Caller wait (ms): {}", self.wait_ms)?;

        if !self.kind_counts.is_empty() {
            writeln!(f, "Events by kind:")?;
            let mut kinds: Vec<_> = self.kind_counts.iter().collect();
            kinds.sort();
            for (kind, count) in kinds {
                writeln!(f, "  {}: {}", kind, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
