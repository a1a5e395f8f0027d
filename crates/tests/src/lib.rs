//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 配置 -> 分发器 -> 处理器 的端到端测试
//! - 慢处理器、队列溢出与关闭排空场景

#[cfg(test)]
mod contract_tests {
    use contracts::{DispatchOutcome, LifecycleEvent};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_event_wire_format() {
        let event: LifecycleEvent =
            serde_json::from_str(r#"{"kind":"job_end","job_id":3,"time_ms":7}"#).unwrap();
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({
                "kind": "job_end",
                "job_id": 3,
                "time_ms": 7,
                "result": {"status": "succeeded"}
            })
        );
        assert_eq!(
            serde_json::to_value(DispatchOutcome::TimedOut).unwrap(),
            "timed_out"
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::fs;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    use config_loader::{properties, ConfigFormat, ConfigLoader};
    use contracts::{
        ApplicationEnd, ContractError, DispatchConfig, DispatchOutcome, EventProcessor, JobEnd,
        JobResult, JobStart, LifecycleEvent, OtherEvent,
    };
    use dispatcher::{create_dispatcher, AsyncDispatcher, DispatcherState, RunEventType, RunRecord};
    use observability::DispatchMetricsAggregator;

    /// Processor that sleeps on every job event and can fail on demand
    struct SleepyProcessor {
        delay: Duration,
        fail_job_ids: Vec<u64>,
        processed: AtomicU64,
        app_ends: AtomicU64,
    }

    impl SleepyProcessor {
        fn new(delay: Duration) -> Arc<Self> {
            Self::failing(delay, vec![])
        }

        fn failing(delay: Duration, fail_job_ids: Vec<u64>) -> Arc<Self> {
            Arc::new(Self {
                delay,
                fail_job_ids,
                processed: AtomicU64::new(0),
                app_ends: AtomicU64::new(0),
            })
        }

        fn handle(&self, job_id: u64) -> Result<(), ContractError> {
            thread::sleep(self.delay);
            self.processed.fetch_add(1, Ordering::SeqCst);
            if self.fail_job_ids.contains(&job_id) {
                return Err(ContractError::emit("sleepy", format!("job {job_id} failed")));
            }
            Ok(())
        }
    }

    impl EventProcessor for SleepyProcessor {
        fn name(&self) -> &str {
            "sleepy"
        }

        fn on_job_start(&self, event: &JobStart) -> Result<(), ContractError> {
            self.handle(event.job_id)
        }

        fn on_job_end(&self, event: &JobEnd) -> Result<(), ContractError> {
            self.handle(event.job_id)
        }

        fn on_other_event(&self, _event: &OtherEvent) -> Result<(), ContractError> {
            Ok(())
        }

        fn on_application_end(&self, _event: &ApplicationEnd) -> Result<(), ContractError> {
            self.app_ends.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn dispatch_config(capacity: usize, threads: usize, wait: Duration, grace_s: f64) -> DispatchConfig {
        DispatchConfig {
            queue_capacity: capacity,
            worker_threads: threads,
            wait_timeout_s: wait.as_secs_f64(),
            shutdown_grace_s: grace_s,
            ..Default::default()
        }
    }

    fn job_start(job_id: u64, time_ms: i64) -> LifecycleEvent {
        LifecycleEvent::JobStart(JobStart {
            job_id,
            time_ms,
            stage_ids: vec![job_id * 10],
            properties: HashMap::new(),
        })
    }

    fn job_end(job_id: u64, time_ms: i64, result: JobResult) -> LifecycleEvent {
        LifecycleEvent::JobEnd(JobEnd {
            job_id,
            time_ms,
            result,
        })
    }

    fn app_end(time_ms: i64) -> LifecycleEvent {
        LifecycleEvent::ApplicationEnd(ApplicationEnd { time_ms })
    }

    /// End-to-end test: TOML config -> create_dispatcher -> FileProcessor
    #[test]
    fn test_e2e_file_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("lineage.jsonl");
        let content = format!(
            r#"
[dispatch]
queue_capacity = 10
worker_threads = 1
wait_timeout_s = 5.0
shutdown_grace_s = 5.0

[processor]
name = "e2e"
kind = "file"
params = {{ path = "{}" }}
"#,
            out.display().to_string().replace('\\', "/")
        );
        let blueprint = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();
        let dispatcher = create_dispatcher(&blueprint).unwrap();

        let events = vec![
            job_start(1, 1_000),
            job_end(1, 2_000, JobResult::Succeeded),
            job_start(2, 3_000),
            job_end(
                2,
                4_000,
                JobResult::Failed {
                    message: "executor lost".to_string(),
                },
            ),
            app_end(5_000),
        ];

        let mut aggregator = DispatchMetricsAggregator::new();
        for event in events {
            let kind = event.kind();
            let outcome = dispatcher.on_event(event);
            aggregator.update(kind, outcome, 0.0);
        }

        let summary = aggregator.summary();
        assert_eq!(summary.total_events, 5);
        assert_eq!(summary.completed, 5);
        assert_eq!(dispatcher.state(), DispatcherState::Closed);

        let records: Vec<RunRecord> = fs::read_to_string(&out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let types: Vec<_> = records.iter().map(|r| r.event_type).collect();
        assert_eq!(
            types,
            vec![
                RunEventType::Start,
                RunEventType::Complete,
                RunEventType::Start,
                RunEventType::Fail,
                RunEventType::Other,
            ]
        );
        assert!(records.iter().all(|r| r.producer == "e2e"));
        assert_eq!(records[3].error.as_deref(), Some("executor lost"));
    }

    /// Enough capacity and threads: everything reaches the processor
    #[test]
    fn test_sufficient_capacity_no_losses() {
        let processor = SleepyProcessor::new(Duration::from_millis(1));
        let dispatcher = AsyncDispatcher::new(
            dispatch_config(64, 4, Duration::from_secs(5), 5.0),
            Arc::clone(&processor),
        )
        .unwrap();

        for i in 0..50 {
            assert_eq!(
                dispatcher.on_event(job_start(i, 0)),
                DispatchOutcome::Completed
            );
        }
        dispatcher.on_event(app_end(0));

        let stats = dispatcher.stats();
        assert_eq!(processor.processed.load(Ordering::SeqCst), 50);
        assert_eq!(stats.dropped, 0);
        assert_eq!(stats.timed_out, 0);
        assert_eq!(stats.failed, 0);
    }

    /// capacity=2, threads=1, slow processor: FIFO decides who is queued
    #[test]
    fn test_overflow_scenario() {
        let processor = SleepyProcessor::new(Duration::from_millis(200));
        let wait = Duration::from_millis(20);
        let dispatcher =
            AsyncDispatcher::new(dispatch_config(2, 1, wait, 5.0), Arc::clone(&processor))
                .unwrap();

        let mut outcomes = Vec::new();
        for i in 0..4 {
            let started = Instant::now();
            outcomes.push(dispatcher.on_event(job_start(i, 0)));
            assert!(started.elapsed() < Duration::from_millis(150));
            assert!(dispatcher.queue_depth() <= 2);
        }

        assert_eq!(
            outcomes,
            vec![
                DispatchOutcome::TimedOut,
                DispatchOutcome::TimedOut,
                DispatchOutcome::TimedOut,
                DispatchOutcome::Rejected,
            ]
        );
        assert_eq!(dispatcher.dropped_count(), 1);
        assert_eq!(dispatcher.timed_out_count(), 3);

        // Generous grace: the three accepted events still run.
        dispatcher.on_event(app_end(0));
        assert_eq!(processor.processed.load(Ordering::SeqCst), 3);
        assert_eq!(dispatcher.dropped_count(), 1);
    }

    /// Terminal event with ten queued tasks and zero grace
    #[test]
    fn test_forced_shutdown_scenario() {
        let processor = SleepyProcessor::new(Duration::from_millis(300));
        let dispatcher = AsyncDispatcher::new(
            dispatch_config(20, 1, Duration::from_millis(5), 0.0),
            Arc::clone(&processor),
        )
        .unwrap();

        for i in 0..11 {
            dispatcher.on_event(job_start(i, 0));
        }
        let queued = dispatcher.queue_depth() as u64;
        assert!(queued >= 9);
        let dropped_before = dispatcher.dropped_count();

        let started = Instant::now();
        assert_eq!(dispatcher.on_event(app_end(0)), DispatchOutcome::Completed);
        assert!(started.elapsed() < Duration::from_millis(250));

        assert_eq!(dispatcher.dropped_count(), dropped_before + queued);
        assert_eq!(dispatcher.queue_depth(), 0);
        assert_eq!(processor.app_ends.load(Ordering::SeqCst), 1);

        // Second terminal: no recount, no second processing.
        assert_eq!(dispatcher.on_event(app_end(1)), DispatchOutcome::Rejected);
        assert_eq!(dispatcher.dropped_count(), dropped_before + queued);
        assert_eq!(processor.app_ends.load(Ordering::SeqCst), 1);
    }

    /// Processor errors become counts, never escape
    #[test]
    fn test_failures_counted_once() {
        let processor = SleepyProcessor::failing(Duration::ZERO, vec![2, 4]);
        let dispatcher = AsyncDispatcher::new(
            dispatch_config(8, 2, Duration::from_secs(5), 5.0),
            Arc::clone(&processor),
        )
        .unwrap();

        let failed: Vec<_> = (1..=5)
            .map(|i| dispatcher.on_event(job_end(i, 0, JobResult::Succeeded)))
            .filter(|outcome| *outcome == DispatchOutcome::Failed)
            .collect();

        assert_eq!(failed.len(), 2);
        assert_eq!(dispatcher.failed_count(), 2);
        dispatcher.on_event(app_end(0));
        assert_eq!(dispatcher.failed_count(), 2);
    }

    /// Several source threads sharing one dispatcher
    #[test]
    fn test_shared_across_source_threads() {
        let processor = SleepyProcessor::new(Duration::from_millis(1));
        let dispatcher = Arc::new(
            AsyncDispatcher::new(
                dispatch_config(128, 3, Duration::from_secs(5), 5.0),
                Arc::clone(&processor),
            )
            .unwrap(),
        );

        let sources: Vec<_> = (0..3u64)
            .map(|t| {
                let dispatcher = Arc::clone(&dispatcher);
                thread::spawn(move || {
                    (0..20u64)
                        .map(|i| dispatcher.on_event(job_start(t * 1000 + i, 0)))
                        .filter(|o| o.is_completed())
                        .count()
                })
            })
            .collect();
        let completed: usize = sources.into_iter().map(|h| h.join().unwrap()).sum();

        dispatcher.on_event(app_end(0));
        assert_eq!(completed, 60);
        assert_eq!(processor.processed.load(Ordering::SeqCst), 60);
    }

    /// Host properties tune a blueprint that then drives the dispatcher
    #[test]
    fn test_host_properties_drive_dispatcher() {
        let mut blueprint = ConfigLoader::load_from_str("", ConfigFormat::Toml).unwrap();
        let props = properties::parse_lines(
            "lineage.async.queueSize=3\nlineage.async.threadCount=1\nlineage.async.timeout=0.01\n",
        )
        .unwrap();
        assert_eq!(ConfigLoader::apply_properties(&mut blueprint, &props).unwrap(), 3);

        let dispatcher = create_dispatcher(&blueprint).unwrap();
        assert_eq!(dispatcher.config().queue_capacity, 3);
        assert_eq!(dispatcher.config().wait_timeout_s, 0.01);
        assert_eq!(dispatcher.on_event(app_end(0)), DispatchOutcome::Completed);
    }
}
