//! Pipeline orchestrator - reads input, runs the communicator, reports self metrics.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{ForwarderConfig, StoreClient};
use dispatcher::{CancellationToken, CommandCounters, Communicator, CommunicatorConfig, ConfiguredStore};
use observability::{record_report, record_self_metrics, SelfMetricsSummary};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::input::{self, CommandBatch};
use super::stats::{RunStats, SendMode};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Loaded forwarder configuration
    pub forwarder: ForwarderConfig,

    /// JSON lines command file
    pub input: PathBuf,

    pub mode: SendMode,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline until input is forwarded or `cancel` fires
    pub async fn run(self, cancel: CancellationToken) -> Result<RunStats> {
        let start_time = Instant::now();

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
        }

        let batch = input::read_commands(&self.config.input)
            .with_context(|| format!("Failed to read {}", self.config.input.display()))?;
        info!(
            commands = batch.len(),
            series = batch.series.len(),
            entity_tags = batch.entity_tags.len(),
            properties = batch.properties.len(),
            messages = batch.messages.len(),
            "Input loaded"
        );

        let store = ConfiguredStore::from_config(&self.config.forwarder.store)
            .context("Failed to create store client")?;
        let transport = store.url().scheme().to_string();

        let communicator = Communicator::spawn_with_cancellation(
            Arc::new(store),
            CommunicatorConfig::from(&self.config.forwarder.dispatcher),
            cancel.clone(),
        );

        let reporter_stop = CancellationToken::new();
        let reporter = spawn_reporter(
            Arc::clone(communicator.counters()),
            transport,
            self.config.forwarder.self_metrics.interval(),
            reporter_stop.clone(),
        );

        let mut stats = RunStats {
            mode: self.config.mode,
            commands_read: batch.len(),
            ..Default::default()
        };

        let sent = match self.config.mode {
            SendMode::Queued => {
                stats.chunks = self
                    .send_queued(&communicator, batch)
                    .await
                    .or_else(|e| interrupted(&cancel, e).map(|_| 0))?;
                Ok(())
            }
            SendMode::Prior => communicator
                .prior_send_data(batch.series, batch.entity_tags, batch.properties, batch.messages)
                .await,
        };

        let counters = Arc::clone(communicator.counters());
        communicator.shutdown().await;

        reporter_stop.cancel();
        stats.self_metrics = reporter.await.context("Self-metric reporter failed")?;
        stats.counters = counters.snapshot();
        stats.cancelled = cancel.is_cancelled();
        stats.duration = start_time.elapsed();

        sent.context("Prior send rejected input")?;
        Ok(stats)
    }

    /// Queue everything; returns the number of chunks sent
    async fn send_queued(
        &self,
        communicator: &Communicator<ConfiguredStore>,
        batch: CommandBatch,
    ) -> Result<usize, dispatcher::DispatcherError> {
        let chunks = input::chunk_series(batch.series, self.config.forwarder.dispatcher.chunk_size);
        let count = chunks.len();
        communicator
            .queued_send_data(chunks, batch.entity_tags, batch.properties, batch.messages)
            .await?;
        Ok(count)
    }
}

/// A closed dispatch loop is expected after cancellation
fn interrupted(cancel: &CancellationToken, e: dispatcher::DispatcherError) -> Result<()> {
    if cancel.is_cancelled() {
        warn!(error = %e, "Submission interrupted by shutdown");
        Ok(())
    } else {
        Err(e).context("Queued send failed")
    }
}

/// Periodically publish self metrics; returns the last values on stop
fn spawn_reporter(
    counters: Arc<CommandCounters>,
    transport: String,
    interval: Option<Duration>,
    stop: CancellationToken,
) -> JoinHandle<SelfMetricsSummary> {
    tokio::spawn(async move {
        let mut summary = SelfMetricsSummary::new();
        let report = |summary: &mut SelfMetricsSummary| {
            let values = counters.self_metric_values(&transport);
            record_self_metrics(&values);
            record_report(&transport);
            summary.update(&values);
        };

        if let Some(interval) = interval {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        report(&mut summary);
                        debug!(transport = %transport, "Self metrics reported");
                    }
                }
            }
        } else {
            stop.cancelled().await;
        }

        // Final values at shutdown
        report(&mut summary);
        summary
    })
}
