//! AsyncDispatcher - bounded-wait dispatch of lifecycle events to a worker pool

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use contracts::{
    ApplicationEnd, ContractError, DispatchConfig, DispatchOutcome, EventKind, EventProcessor,
    JobEnd, JobStart, LifecycleEvent, ListenerBlueprint, OtherEvent, ProcessorConfig,
};
use tracing::{debug, error, info, instrument, warn};

use crate::error::DispatcherError;
use crate::metrics::{DispatchStats, StatsSnapshot};
use crate::pool::{run_guarded, Task, WaitResult, WorkerPool};
use crate::processors::create_processor;

/// Dispatcher lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// Accepting non-terminal events
    Accepting,
    /// Terminal event received, pending work being drained
    Draining,
    /// Terminal event processed
    Closed,
}

impl DispatcherState {
    const ACCEPTING: u8 = 0;
    const DRAINING: u8 = 1;
    const CLOSED: u8 = 2;

    fn from_u8(value: u8) -> Self {
        match value {
            Self::ACCEPTING => Self::Accepting,
            Self::DRAINING => Self::Draining,
            _ => Self::Closed,
        }
    }
}

/// Result of the drain phase of the shutdown sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// All workers exited within the grace period
    pub drained_in_time: bool,
    /// Queued tasks discarded without running
    pub cancelled: usize,
    /// Tasks still running on a worker when the grace period ended
    pub abandoned: usize,
}

impl DrainReport {
    /// Whether the shutdown discarded or left behind any work
    pub fn forced(&self) -> bool {
        self.cancelled > 0 || self.abandoned > 0
    }
}

/// Emits the statistics line for one handled event when dropped
struct StatsReport<'a, P: EventProcessor + ?Sized + 'static> {
    dispatcher: &'a AsyncDispatcher<P>,
    kind: EventKind,
    outcome: DispatchOutcome,
    started: Instant,
}

impl<'a, P: EventProcessor + ?Sized + 'static> StatsReport<'a, P> {
    fn new(dispatcher: &'a AsyncDispatcher<P>, kind: EventKind, outcome: DispatchOutcome) -> Self {
        Self {
            dispatcher,
            kind,
            outcome,
            started: Instant::now(),
        }
    }
}

impl<P: EventProcessor + ?Sized + 'static> Drop for StatsReport<'_, P> {
    fn drop(&mut self) {
        self.dispatcher.report(self.kind, self.outcome, self.started);
    }
}

/// Decouples a synchronous event source from a slow processor
///
/// Non-terminal events run on a worker pool while the source thread waits
/// at most `wait_timeout`. The terminal event drains the pool for at most
/// `shutdown_grace`, cancels what is left and is then processed inline.
/// No processing error ever reaches the caller; everything is converted into
/// counters and log lines.
pub struct AsyncDispatcher<P: EventProcessor + ?Sized + 'static> {
    processor: Arc<P>,
    /// `None` in inline mode
    pool: Option<WorkerPool>,
    config: DispatchConfig,
    stats: DispatchStats,
    state: AtomicU8,
    /// Set by the terminal event
    drain_report: OnceLock<DrainReport>,
}

impl<P: EventProcessor + ?Sized + 'static> AsyncDispatcher<P> {
    /// Create a dispatcher and start its worker pool
    ///
    /// # Errors
    /// - Zero queue capacity or zero worker threads
    /// - Worker thread spawn failure
    #[instrument(
        name = "dispatcher_new",
        skip(config, processor),
        fields(processor = processor.name())
    )]
    pub fn new(config: DispatchConfig, processor: Arc<P>) -> Result<Self, DispatcherError> {
        if config.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                "dispatch.queue_capacity",
                "queue_capacity must be >= 1",
            )
            .into());
        }
        if config.worker_threads == 0 {
            return Err(ContractError::config_validation(
                "dispatch.worker_threads",
                "worker_threads must be >= 1",
            )
            .into());
        }

        let pool = WorkerPool::spawn(
            Arc::clone(&processor),
            config.queue_capacity,
            config.worker_threads,
            &config.thread_name_prefix,
        )?;

        info!(
            threads = config.worker_threads,
            queue_capacity = config.queue_capacity,
            wait_timeout_s = config.wait_timeout_s,
            shutdown_grace_s = config.shutdown_grace_s,
            "Async dispatcher initialized"
        );

        Ok(Self {
            processor,
            pool: Some(pool),
            config,
            stats: DispatchStats::new(),
            state: AtomicU8::new(DispatcherState::ACCEPTING),
            drain_report: OnceLock::new(),
        })
    }

    /// Create a dispatcher that runs every event on the calling thread
    ///
    /// There is no queue and no pool: timeouts cannot happen and
    /// `queue_depth()` is always 0. Used for deterministic tests.
    pub fn inline(processor: Arc<P>) -> Self {
        debug!(processor = processor.name(), "Inline dispatcher initialized");

        Self {
            processor,
            pool: None,
            config: DispatchConfig::default(),
            stats: DispatchStats::new(),
            state: AtomicU8::new(DispatcherState::ACCEPTING),
            drain_report: OnceLock::new(),
        }
    }

    /// Handle one event from the source
    ///
    /// Never fails; the returned outcome is informational.
    pub fn on_event(&self, event: LifecycleEvent) -> DispatchOutcome {
        match event {
            LifecycleEvent::ApplicationEnd(end) => self.on_terminal_event(end),
            other => self.on_non_terminal_event(other),
        }
    }

    /// Submit a non-terminal event and wait at most `wait_timeout` for it
    fn on_non_terminal_event(&self, event: LifecycleEvent) -> DispatchOutcome {
        let mut report = StatsReport::new(self, event.kind(), DispatchOutcome::Failed);
        report.outcome = self.submit_and_wait(event);
        report.outcome
    }

    fn submit_and_wait(&self, event: LifecycleEvent) -> DispatchOutcome {
        let kind = event.kind();

        let state = self.state();
        if state != DispatcherState::Accepting {
            self.stats.inc_dropped();
            debug!(kind = %kind, state = ?state, "Dispatcher not accepting, event dropped");
            return DispatchOutcome::Rejected;
        }

        let Some(pool) = &self.pool else {
            return self.run_inline(event);
        };

        let (task, completion) = Task::new(event);
        if let Err(e) = pool.submit(task) {
            self.stats.inc_dropped();
            warn!(kind = %kind, error = %e, "Event rejected");
            return DispatchOutcome::Rejected;
        }
        self.stats.inc_submitted();

        match completion.wait(self.config.wait_timeout()) {
            WaitResult::Done(Ok(())) => {
                self.stats.inc_completed();
                DispatchOutcome::Completed
            }
            WaitResult::Done(Err(_)) => {
                self.stats.inc_failed();
                DispatchOutcome::Failed
            }
            WaitResult::TimedOut => {
                if self.config.timeout_accounting.counts(kind) {
                    self.stats.inc_timed_out();
                } else {
                    debug!(kind = %kind, "Timeout not counted for this event kind");
                }
                DispatchOutcome::TimedOut
            }
            WaitResult::Cancelled => {
                // Already counted as dropped by the shutdown sequence.
                debug!(kind = %kind, "Task cancelled before it ran");
                DispatchOutcome::Rejected
            }
        }
    }

    fn run_inline(&self, event: LifecycleEvent) -> DispatchOutcome {
        let kind = event.kind();
        let name = self.processor.name();

        match run_guarded(name, kind, || self.processor.process(&event)) {
            Ok(()) => {
                self.stats.inc_completed();
                DispatchOutcome::Completed
            }
            Err(e) => {
                self.stats.inc_failed();
                warn!(processor = name, kind = %kind, error = %e, "Event processing failed");
                DispatchOutcome::Failed
            }
        }
    }

    /// Handle the terminal event
    ///
    /// Runs the shutdown sequence exactly once: stop accepting, drain for at
    /// most `shutdown_grace`, cancel what is still queued, then process the
    /// terminal event synchronously. Later calls are ignored and return
    /// `Rejected` without touching any counter.
    #[instrument(name = "dispatcher_terminal_event", skip(self, event))]
    pub fn on_terminal_event(&self, event: ApplicationEnd) -> DispatchOutcome {
        let transition = self.state.compare_exchange(
            DispatcherState::ACCEPTING,
            DispatcherState::DRAINING,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if let Err(current) = transition {
            warn!(
                state = ?DispatcherState::from_u8(current),
                "Terminal event already handled, ignoring"
            );
            return DispatchOutcome::Rejected;
        }

        let mut report = StatsReport::new(self, EventKind::ApplicationEnd, DispatchOutcome::Failed);
        let started = report.started;

        match self.drain() {
            Ok(drained) => {
                info!(
                    drained_in_time = drained.drained_in_time,
                    cancelled = drained.cancelled,
                    abandoned = drained.abandoned,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Pending event processing stopped"
                );
                let _ = self.drain_report.set(drained);
            }
            Err(e) => error!(error = %e, "Unable to shut down pending event processing tasks"),
        }

        // Processed regardless of how the drain went.
        let name = self.processor.name();
        report.outcome = match run_guarded(name, EventKind::ApplicationEnd, || {
            self.processor.on_application_end(&event)
        }) {
            Ok(()) => {
                self.stats.inc_completed();
                DispatchOutcome::Completed
            }
            Err(e) => {
                self.stats.inc_failed();
                error!(processor = name, error = %e, "Terminal event processing failed");
                DispatchOutcome::Failed
            }
        };

        self.state.store(DispatcherState::CLOSED, Ordering::Release);

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            outcome = %report.outcome,
            "Async dispatcher closed"
        );
        report.outcome
    }

    /// Stop the pool, wait out the grace period and cancel leftovers
    fn drain(&self) -> Result<DrainReport, DispatcherError> {
        let Some(pool) = &self.pool else {
            return Ok(DrainReport {
                drained_in_time: true,
                cancelled: 0,
                abandoned: 0,
            });
        };

        pool.shutdown();
        let drained_in_time = pool.await_termination(self.config.shutdown_grace())?;

        let cancelled = pool.shutdown_now();
        self.stats.add_dropped(cancelled as u64);
        observability::record_tasks_cancelled(cancelled);

        let report = DrainReport {
            drained_in_time,
            cancelled,
            abandoned: pool.in_flight(),
        };
        if report.forced() {
            warn!(
                shutdown_grace_s = self.config.shutdown_grace_s,
                cancelled = report.cancelled,
                abandoned = report.abandoned,
                "Grace period elapsed with pending tasks, forcing shutdown"
            );
        } else if !drained_in_time {
            debug!(
                live_workers = pool.live_workers(),
                "Grace period elapsed while idle workers were exiting"
            );
        }

        Ok(report)
    }

    /// Record one dispatch and emit the statistics line
    fn report(&self, kind: EventKind, outcome: DispatchOutcome, started: Instant) {
        observability::record_dispatch_outcome(kind, outcome);
        observability::record_wait_latency_ms(kind, started.elapsed().as_secs_f64() * 1000.0);
        self.log_stats();
    }

    fn log_stats(&self) {
        self.stats.inc_reported();
        let snapshot = self.stats();
        info!(
            dropped = snapshot.dropped,
            timed_out = snapshot.timed_out,
            queue_depth = snapshot.queue_depth,
            failed = snapshot.failed,
            "async dispatch stats"
        );
        observability::record_stats_snapshot(
            snapshot.dropped,
            snapshot.timed_out,
            snapshot.failed,
            snapshot.queue_depth,
        );
    }

    /// Current lifecycle state
    pub fn state(&self) -> DispatcherState {
        DispatcherState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Tasks rejected at submission or cancelled at shutdown
    pub fn dropped_count(&self) -> u64 {
        self.stats.dropped()
    }

    /// Processor errors observed within the wait budget
    pub fn failed_count(&self) -> u64 {
        self.stats.failed()
    }

    /// Caller waits that ran out of budget (per the accounting table)
    pub fn timed_out_count(&self) -> u64 {
        self.stats.timed_out()
    }

    /// Tasks queued but not started; 0 when there is no queue
    pub fn queue_depth(&self) -> usize {
        self.pool.as_ref().map_or(0, WorkerPool::queue_depth)
    }

    /// Snapshot of all counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.queue_depth())
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Wrapped processor
    pub fn processor(&self) -> &Arc<P> {
        &self.processor
    }

    /// Whether tasks run on a worker pool
    pub fn is_pooled(&self) -> bool {
        self.pool.is_some()
    }

    /// How the shutdown drain went; `None` before the terminal event
    pub fn drain_report(&self) -> Option<DrainReport> {
        self.drain_report.get().copied()
    }
}

/// The dispatcher is itself a processor, so it can wrap one transparently.
impl<P: EventProcessor + ?Sized + 'static> EventProcessor for AsyncDispatcher<P> {
    fn name(&self) -> &str {
        self.processor.name()
    }

    fn on_job_start(&self, event: &JobStart) -> Result<(), ContractError> {
        self.on_event(LifecycleEvent::JobStart(event.clone()));
        Ok(())
    }

    fn on_job_end(&self, event: &JobEnd) -> Result<(), ContractError> {
        self.on_event(LifecycleEvent::JobEnd(event.clone()));
        Ok(())
    }

    fn on_other_event(&self, event: &OtherEvent) -> Result<(), ContractError> {
        self.on_event(LifecycleEvent::Other(event.clone()));
        Ok(())
    }

    fn on_application_end(&self, event: &ApplicationEnd) -> Result<(), ContractError> {
        self.on_terminal_event(event.clone());
        Ok(())
    }
}

/// Builder for creating a dispatcher from configuration
pub struct DispatcherBuilder {
    dispatch: DispatchConfig,
    processor: ProcessorConfig,
    inline: bool,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new(dispatch: DispatchConfig, processor: ProcessorConfig) -> Self {
        Self {
            dispatch,
            processor,
            inline: false,
        }
    }

    /// Run events on the calling thread instead of a worker pool
    pub fn inline(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }

    /// Build the processor and start the dispatcher
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(processor = %self.processor.name, inline = self.inline)
    )]
    pub fn build(self) -> Result<AsyncDispatcher<dyn EventProcessor>, DispatcherError> {
        let processor = create_processor(&self.processor)?;

        if self.inline {
            Ok(AsyncDispatcher::inline(processor))
        } else {
            AsyncDispatcher::new(self.dispatch, processor)
        }
    }
}

/// Convenience function to create a pooled dispatcher from a blueprint
pub fn create_dispatcher(
    blueprint: &ListenerBlueprint,
) -> Result<AsyncDispatcher<dyn EventProcessor>, DispatcherError> {
    DispatcherBuilder::new(blueprint.dispatch.clone(), blueprint.processor.clone()).build()
}
