//! End-to-end wiring tests.
//!
//! Assembles the watch pipeline and alert dispatcher exactly the way
//! `main.rs` does (shared mpsc alert channel) and verifies that a pool
//! failover appended to the access log flows through to the dispatcher.

use std::io::Write;
use std::time::Duration;

use poolwatch_core::config::PoolwatchConfig;
use poolwatch_core::pipeline::Pipeline;
use poolwatch_notify::AlertDispatcherBuilder;
use poolwatch_pipeline::{PipelineConfig, WatchPipelineBuilder};

fn access_line(pool: &str, status: u16) -> String {
    format!(r#"{{"pool":"{pool}","upstream_status":"","status":{status},"path":"/"}}"#)
}

#[tokio::test]
async fn failover_flows_from_log_file_to_dispatcher() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("access.log");
    std::fs::write(&path, "").unwrap();

    let mut config = PoolwatchConfig::default();
    config.watch.access_log = path.to_str().unwrap().to_owned();
    config.watch.poll_interval_ms = 5;
    config.validate().unwrap();

    let (alert_tx, alert_rx) = tokio::sync::mpsc::channel(16);

    let pipeline_config = PipelineConfig::from_core(&config.watch);
    let (mut watch_pipeline, _) = WatchPipelineBuilder::new()
        .config(pipeline_config)
        .alert_sender(alert_tx)
        .build()
        .unwrap();

    // Webhook unset: alerts are logged and counted as handled
    let mut dispatcher = AlertDispatcherBuilder::new()
        .config(config.notify.clone())
        .alert_receiver(alert_rx)
        .build()
        .unwrap();
    assert!(!dispatcher.delivery_enabled());

    dispatcher.start().await.unwrap();
    watch_pipeline.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    writeln!(file, "{}", access_line("blue", 200)).unwrap();
    writeln!(file, "{}", access_line("green", 200)).unwrap();
    file.flush().unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while dispatcher.delivered_count() < 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("failover alert never reached the dispatcher");

    // Shutdown order mirrors main.rs: producer first
    watch_pipeline.stop().await.unwrap();
    dispatcher.stop().await.unwrap();

    assert_eq!(watch_pipeline.processed_count(), 2);
    assert_eq!(dispatcher.delivered_count(), 1);
    assert_eq!(dispatcher.failed_count(), 0);
}
