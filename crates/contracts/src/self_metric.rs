//! SelfMetricValue - forwarder self-reporting

use std::collections::BTreeMap;

/// One named counter value with its tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfMetricValue {
    /// Metric name, e.g. `series-commands.sent`
    pub name: &'static str,

    /// Tags (`transport` = store URL scheme)
    pub tags: BTreeMap<String, String>,

    /// Counter value at snapshot time
    pub value: i64,
}

impl SelfMetricValue {
    pub fn new(name: &'static str, transport: &str, value: u64) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert("transport".to_string(), transport.to_string());
        Self {
            name,
            tags,
            value: i64::try_from(value).unwrap_or(i64::MAX),
        }
    }

    /// Transport tag value
    pub fn transport(&self) -> Option<&str> {
        self.tags.get("transport").map(String::as_str)
    }
}
