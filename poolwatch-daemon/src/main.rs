use anyhow::Result;
use clap::Parser;

use poolwatch_core::config::PoolwatchConfig;
use poolwatch_core::pipeline::Pipeline;
use poolwatch_notify::AlertDispatcherBuilder;
use poolwatch_pipeline::{PipelineConfig, WatchPipelineBuilder};

use poolwatch_daemon::{cli::DaemonCli, logging, metrics_server};

/// Capacity of the watch-pipeline -> notify alert channel.
const ALERT_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // Load configuration: file (or defaults when the default path is
    // absent) + env overrides, then CLI overrides on top.
    let mut config = PoolwatchConfig::load_or_default(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }
    if let Some(access_log) = cli.access_log {
        config.watch.access_log = access_log;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;

    tracing::info!("poolwatch-daemon starting");
    tracing::info!(
        access_log = config.watch.access_log.as_str(),
        window_size = config.watch.window_size,
        error_rate_threshold = config.watch.error_rate_threshold,
        cooldown_secs = config.watch.cooldown_secs,
        webhook_configured = !config.notify.webhook_url.is_empty(),
        "effective configuration"
    );

    if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)?;
        tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
    }

    // Inter-module channel: watch-pipeline produces, notify consumes
    let (alert_tx, alert_rx) = tokio::sync::mpsc::channel(ALERT_CHANNEL_CAPACITY);

    // Build the watch pipeline
    let pipeline_config = PipelineConfig::from_core(&config.watch);
    let (mut watch_pipeline, _) = WatchPipelineBuilder::new()
        .config(pipeline_config)
        .alert_sender(alert_tx)
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build watch pipeline: {}", e))?;
    tracing::info!("watch pipeline initialized");

    // Build the alert dispatcher
    let mut dispatcher = AlertDispatcherBuilder::new()
        .config(config.notify.clone())
        .alert_receiver(alert_rx)
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build alert dispatcher: {}", e))?;
    tracing::info!("alert dispatcher initialized");

    // Start consumer before producer
    dispatcher
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start alert dispatcher: {}", e))?;
    tracing::info!("alert dispatcher started");

    watch_pipeline
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start watch pipeline: {}", e))?;
    tracing::info!("watch pipeline started");

    // Wait for shutdown signal
    tracing::info!("poolwatch-daemon running — modules active");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    // Graceful shutdown: producer first, then consumer
    if let Err(e) = watch_pipeline.stop().await {
        tracing::error!(error = %e, "failed to stop watch pipeline");
    }
    if let Err(e) = dispatcher.stop().await {
        tracing::error!(error = %e, "failed to stop alert dispatcher");
    }

    tracing::info!("poolwatch-daemon shut down");
    Ok(())
}
