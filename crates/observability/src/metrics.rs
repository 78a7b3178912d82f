//! 转发器自监控指标模块
//!
//! 将 `SelfMetricValue` 发布为 Prometheus gauge，并汇总用于运行结束时的输出。

use std::collections::BTreeMap;

use contracts::SelfMetricValue;
use metrics::{counter, gauge, Label};

/// Prometheus 指标名前缀
pub const METRIC_PREFIX: &str = "atsd_forwarder_";

/// 自监控指标名 -> Prometheus 指标名
///
/// `series-commands.sent` -> `atsd_forwarder_series_commands_sent`
pub fn metric_name(name: &str) -> String {
    let mut out = String::with_capacity(METRIC_PREFIX.len() + name.len());
    out.push_str(METRIC_PREFIX);
    out.extend(name.chars().map(|c| match c {
        '.' | '-' => '_',
        c => c,
    }));
    out
}

/// 发布一组自监控值
///
/// 每个值对应一个 gauge，标签取自值本身（`transport`）。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_self_metrics;
///
/// record_self_metrics(&communicator.self_metric_values());
/// ```
pub fn record_self_metrics(values: &[SelfMetricValue]) {
    for value in values {
        let labels: Vec<Label> = value
            .tags
            .iter()
            .map(|(k, v)| Label::new(k.clone(), v.clone()))
            .collect();
        gauge!(metric_name(value.name), labels).set(value.value as f64);
    }
}

/// 记录一次上报
pub fn record_report(transport: &str) {
    counter!(
        "atsd_forwarder_self_metric_reports_total",
        "transport" => transport.to_string()
    )
    .increment(1);
}

/// 自监控汇总
///
/// 按 transport 分组保存最后一次上报的值。
#[derive(Debug, Clone, Default)]
pub struct SelfMetricsSummary {
    /// transport -> (指标名 -> 值)，指标名保持上报顺序
    transports: BTreeMap<String, Vec<(&'static str, i64)>>,
}

impl SelfMetricsSummary {
    /// 创建空汇总
    pub fn new() -> Self {
        Self::default()
    }

    /// 用最新的值覆盖汇总
    pub fn update(&mut self, values: &[SelfMetricValue]) {
        for value in values {
            let transport = value.transport().unwrap_or("unknown").to_string();
            let entries = self.transports.entry(transport).or_default();
            match entries.iter_mut().find(|(name, _)| *name == value.name) {
                Some(entry) => entry.1 = value.value,
                None => entries.push((value.name, value.value)),
            }
        }
    }

    /// 查询某个值
    pub fn get(&self, transport: &str, name: &str) -> Option<i64> {
        self.transports
            .get(transport)?
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    pub fn is_empty(&self) -> bool {
        self.transports.is_empty()
    }
}

impl std::fmt::Display for SelfMetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Forwarder Self Metrics ===")?;
        if self.transports.is_empty() {
            return writeln!(f, "No values reported");
        }
        for (transport, entries) in &self.transports {
            writeln!(f, "transport={}", transport)?;
            for (name, value) in entries {
                writeln!(f, "  {}: {}", name, value)?;
            }
        }
        Ok(())
    }
}
