//! Command counters for self-reporting

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::SelfMetricValue;

/// Sent/dropped counts for one command kind
///
/// Both counts only increase. Nothing drops commands today, so `dropped`
/// stays at zero.
#[derive(Debug, Default)]
pub struct KindCounters {
    /// Wire units submitted by the dispatch loop
    sent: AtomicU64,
    /// Commands dropped without submission
    dropped: AtomicU64,
}

impl KindCounters {
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn add_sent(&self, count: u64) {
        self.sent.fetch_add(count, Ordering::Relaxed);
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Counters for all four command kinds
#[derive(Debug, Default)]
pub struct CommandCounters {
    pub series: KindCounters,
    pub entity_tag: KindCounters,
    pub property: KindCounters,
    pub message: KindCounters,
}

impl CommandCounters {
    /// Create new counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            series_sent: self.series.sent(),
            series_dropped: self.series.dropped(),
            entity_tag_sent: self.entity_tag.sent(),
            entity_tag_dropped: self.entity_tag.dropped(),
            property_sent: self.property.sent(),
            property_dropped: self.property.dropped(),
            message_sent: self.message.sent(),
            message_dropped: self.message.dropped(),
        }
    }

    /// Eight named values tagged with the store transport scheme
    pub fn self_metric_values(&self, transport: &str) -> Vec<SelfMetricValue> {
        vec![
            SelfMetricValue::new("series-commands.sent", transport, self.series.sent()),
            SelfMetricValue::new("series-commands.dropped", transport, self.series.dropped()),
            SelfMetricValue::new("message-commands.sent", transport, self.message.sent()),
            SelfMetricValue::new("message-commands.dropped", transport, self.message.dropped()),
            SelfMetricValue::new("property-commands.sent", transport, self.property.sent()),
            SelfMetricValue::new(
                "property-commands.dropped",
                transport,
                self.property.dropped(),
            ),
            SelfMetricValue::new("entitytag-commands.sent", transport, self.entity_tag.sent()),
            SelfMetricValue::new(
                "entitytag-commands.dropped",
                transport,
                self.entity_tag.dropped(),
            ),
        ]
    }
}

/// Snapshot of command counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountersSnapshot {
    pub series_sent: u64,
    pub series_dropped: u64,
    pub entity_tag_sent: u64,
    pub entity_tag_dropped: u64,
    pub property_sent: u64,
    pub property_dropped: u64,
    pub message_sent: u64,
    pub message_dropped: u64,
}
