//! `run` command implementation.

use anyhow::{Context, Result};
use dispatcher::CancellationToken;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig, SendMode};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut forwarder = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(chunk_size) = args.chunk_size {
        info!(chunk_size, "Overriding chunk size from CLI");
        forwarder.dispatcher.chunk_size = chunk_size.max(1);
    }
    let metrics_port = match args.metrics_port {
        Some(0) => None,
        Some(port) => Some(port),
        None => forwarder.self_metrics.prometheus_port,
    };

    info!(
        url = %forwarder.store.url,
        kind = ?forwarder.store.kind,
        chunk_size = forwarder.dispatcher.chunk_size,
        prior = args.prior,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&forwarder);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        forwarder,
        input: args.input.clone(),
        mode: if args.prior {
            SendMode::Prior
        } else {
            SendMode::Queued
        },
        metrics_port,
    });

    // Ctrl+C / SIGTERM cancel the dispatch loop, including a retry in progress
    let cancel = CancellationToken::new();
    let signal_task = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            warn!("Received shutdown signal, stopping forwarder...");
            cancel.cancel();
        }
    });

    info!("Starting forwarder...");
    let result = pipeline.run(cancel).await;
    signal_task.abort();

    let stats = result.context("Forwarder run failed")?;
    info!(
        commands = stats.commands_read,
        chunks = stats.chunks,
        sent = stats.total_sent(),
        cancelled = stats.cancelled,
        duration_secs = stats.duration.as_secs_f64(),
        "Forwarder finished"
    );
    stats.print_summary();

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &contracts::ForwarderConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Store:");
    println!("  URL: {}", config.store.url);
    println!("  Kind: {:?}", config.store.kind);
    for (key, value) in &config.store.params {
        println!("  {}: {}", key, value);
    }

    let d = &config.dispatcher;
    println!("\nDispatcher:");
    println!("  Backoff: {}ms .. {}ms", d.backoff_initial_ms, d.backoff_ceiling_ms);
    println!("  Channel capacity: {}", d.channel_capacity);
    println!("  Chunk size: {}", d.chunk_size);

    println!("\nSelf Metrics:");
    match config.self_metrics.interval() {
        Some(interval) => println!("  Interval: {}s", interval.as_secs()),
        None => println!("  Interval: disabled"),
    }
    if let Some(port) = config.self_metrics.prometheus_port {
        println!("  Prometheus port: {}", port);
    }

    println!();
}
