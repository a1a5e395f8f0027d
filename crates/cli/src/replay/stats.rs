//! Replay statistics.

use std::time::Duration;

use dispatcher::StatsSnapshot;
use observability::DispatchMetricsAggregator;

/// Statistics from a replay run
#[derive(Debug, Clone, Default)]
pub struct ReplayStats {
    /// Events delivered to the dispatcher, terminal included
    pub events_replayed: u64,

    /// Lines skipped because they did not parse
    pub malformed_lines: u64,

    /// The stream had no terminal event and one was appended
    pub terminal_appended: bool,

    /// Replay stopped early by a shutdown signal
    pub interrupted: bool,

    /// Total duration of the replay
    pub duration: Duration,

    /// Per-call outcomes as seen by the source
    pub outcomes: DispatchMetricsAggregator,

    /// Dispatcher counters after the terminal event
    pub dispatch: StatsSnapshot,
}

impl ReplayStats {
    /// Events delivered per second
    pub fn events_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.events_replayed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Replay Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Events replayed: {}", self.events_replayed);
        println!("   ├─ Malformed lines: {}", self.malformed_lines);
        println!("   ├─ Events/s: {:.2}", self.events_per_sec());
        println!("   ├─ Terminal appended: {}", self.terminal_appended);
        println!("   └─ Interrupted: {}", self.interrupted);

        println!("\nDispatcher Counters");
        println!("   ├─ Dropped: {}", self.dispatch.dropped);
        println!("   ├─ Timed out: {}", self.dispatch.timed_out);
        println!("   ├─ Failed: {}", self.dispatch.failed);
        println!("   ├─ Completed: {}", self.dispatch.completed);
        println!("   └─ Queue depth: {}", self.dispatch.queue_depth);

        println!("\n{}", self.outcomes.summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_per_sec() {
        let stats = ReplayStats {
            events_replayed: 50,
            duration: Duration::from_secs(2),
            ..Default::default()
        };
        assert!((stats.events_per_sec() - 25.0).abs() < 1e-10);
        assert_eq!(ReplayStats::default().events_per_sec(), 0.0);
    }
}
