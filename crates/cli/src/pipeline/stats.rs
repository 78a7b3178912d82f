//! Run statistics.

use std::time::Duration;

use dispatcher::CountersSnapshot;
use observability::SelfMetricsSummary;

/// How commands were handed to the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SendMode {
    /// Through the dispatch loop, retrying until written
    #[default]
    Queued,
    /// One attempt per kind, failures logged
    Prior,
}

/// Statistics from a forwarder run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub mode: SendMode,

    /// Commands read from input
    pub commands_read: usize,

    /// Series chunks queued (0 in prior mode)
    pub chunks: usize,

    /// Whether the run was interrupted
    pub cancelled: bool,

    /// Dispatch loop counters at shutdown
    pub counters: CountersSnapshot,

    /// Last reported self metrics
    pub self_metrics: SelfMetricsSummary,

    pub duration: Duration,
}

impl RunStats {
    /// Wire units written per second by the dispatch loop
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.total_sent() as f64 / secs
        } else {
            0.0
        }
    }

    pub fn total_sent(&self) -> u64 {
        let c = &self.counters;
        c.series_sent + c.entity_tag_sent + c.property_sent + c.message_sent
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Forwarder Run ===\n");
        println!("Overview");
        println!("   ├─ Mode: {:?}", self.mode);
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Commands read: {}", self.commands_read);
        println!("   ├─ Series chunks: {}", self.chunks);
        println!("   └─ Cancelled: {}", self.cancelled);

        if self.mode == SendMode::Queued {
            let c = &self.counters;
            println!("\nDispatch Loop");
            println!("   ├─ Series sent: {}", c.series_sent);
            println!("   ├─ Entity tags sent: {}", c.entity_tag_sent);
            println!("   ├─ Properties sent: {}", c.property_sent);
            println!("   ├─ Messages sent: {}", c.message_sent);
            println!("   └─ Throughput: {:.2}/s", self.throughput());
        }

        if !self.self_metrics.is_empty() {
            println!("\n{}", self.self_metrics);
        }
    }
}
