//! ForwarderConfig - Config Loader output
//!
//! Describes the store endpoint, dispatch tuning and self-metric reporting.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete forwarder configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ForwarderConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Store endpoint
    pub store: StoreConfig,

    /// Dispatch loop tuning
    #[serde(default)]
    #[validate(nested)]
    pub dispatcher: DispatcherSettings,

    /// Self-metric reporting
    #[serde(default)]
    #[validate(nested)]
    pub self_metrics: SelfMetricsConfig,
}

/// Store client kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Log every write
    #[default]
    Log,
    /// Append wire objects to a JSON lines file
    File,
}

/// Store endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store URL; its scheme tags self metrics
    pub url: Url,

    /// Client implementation
    #[serde(default)]
    pub kind: StoreKind,

    /// Client-specific parameters (e.g. `path` for the file store)
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Dispatch loop tuning
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DispatcherSettings {
    /// First retry wait (ms)
    #[serde(default = "default_backoff_initial_ms")]
    #[validate(range(min = 1))]
    pub backoff_initial_ms: u64,

    /// Retry wait ceiling (ms)
    #[serde(default = "default_backoff_ceiling_ms")]
    #[validate(range(min = 1))]
    pub backoff_ceiling_ms: u64,

    /// Capacity of each input channel
    #[serde(default = "default_channel_capacity")]
    #[validate(range(min = 1))]
    pub channel_capacity: usize,

    /// Series commands per chunk when batching line input
    #[serde(default = "default_chunk_size")]
    #[validate(range(min = 1))]
    pub chunk_size: usize,
}

fn default_backoff_initial_ms() -> u64 {
    100
}

fn default_backoff_ceiling_ms() -> u64 {
    5 * 60 * 1000
}

fn default_channel_capacity() -> usize {
    1
}

fn default_chunk_size() -> usize {
    100
}

impl DispatcherSettings {
    pub fn backoff_initial(&self) -> Duration {
        Duration::from_millis(self.backoff_initial_ms)
    }

    pub fn backoff_ceiling(&self) -> Duration {
        Duration::from_millis(self.backoff_ceiling_ms)
    }
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            backoff_initial_ms: default_backoff_initial_ms(),
            backoff_ceiling_ms: default_backoff_ceiling_ms(),
            channel_capacity: default_channel_capacity(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// Self-metric reporting
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SelfMetricsConfig {
    /// Reporting interval in seconds (0 = disabled)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Prometheus exporter port (None = disabled)
    #[serde(default)]
    #[validate(range(min = 1))]
    pub prometheus_port: Option<u16>,
}

fn default_interval_secs() -> u64 {
    60
}

impl SelfMetricsConfig {
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_secs > 0).then(|| Duration::from_secs(self.interval_secs))
    }
}

impl Default for SelfMetricsConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            prometheus_port: None,
        }
    }
}
