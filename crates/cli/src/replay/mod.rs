//! Event stream replay.
//!
//! Plays the role of the host's synchronous event source: events are handed
//! to the dispatcher one by one from a single blocking thread.

mod source;
mod stats;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use contracts::{ApplicationEnd, EventProcessor, LifecycleEvent};
use dispatcher::AsyncDispatcher;
use tracing::{info, warn};

use crate::error::CliError;

pub use source::EventSource;
pub use stats::ReplayStats;

/// Drives one event stream through a dispatcher
pub struct Replay {
    dispatcher: Arc<AsyncDispatcher<dyn EventProcessor>>,
    source: EventSource,
    stop: Arc<AtomicBool>,
}

impl Replay {
    pub fn new(
        dispatcher: Arc<AsyncDispatcher<dyn EventProcessor>>,
        source: EventSource,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            dispatcher,
            source,
            stop,
        }
    }

    /// Replay until end of stream or stop request, then make sure the
    /// terminal event has been delivered
    ///
    /// Blocking; run it on a dedicated thread.
    pub fn run(mut self) -> Result<ReplayStats, CliError> {
        let started = Instant::now();
        let mut stats = ReplayStats::default();
        let mut terminal_seen = false;

        while let Some(event) = self.source.next_event(&self.stop)? {
            terminal_seen |= event.is_terminal();
            self.deliver(event, &mut stats);
        }

        if self.stop.load(Ordering::Acquire) {
            stats.interrupted = true;
            warn!("Replay interrupted");
        }

        if !terminal_seen {
            info!("No terminal event in stream, appending application end");
            stats.terminal_appended = true;
            self.deliver(
                LifecycleEvent::ApplicationEnd(ApplicationEnd { time_ms: now_ms() }),
                &mut stats,
            );
        }

        stats.malformed_lines = self.source.malformed();
        stats.dispatch = self.dispatcher.stats();
        stats.duration = started.elapsed();

        info!(
            events = stats.events_replayed,
            dropped = stats.dispatch.dropped,
            timed_out = stats.dispatch.timed_out,
            failed = stats.dispatch.failed,
            duration_secs = stats.duration.as_secs_f64(),
            "Replay finished"
        );
        Ok(stats)
    }

    fn deliver(&self, event: LifecycleEvent, stats: &mut ReplayStats) {
        let kind = event.kind();
        let started = Instant::now();
        let outcome = self.dispatcher.on_event(event);

        stats.events_replayed += 1;
        stats
            .outcomes
            .update(kind, outcome, started.elapsed().as_secs_f64() * 1000.0);
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
