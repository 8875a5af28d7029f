//! scenario 3: retention dry-run counts without mutating.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use log_nexus::clock::VirtualClock;
use log_nexus::config::{AppConfig, ConfigHandle};
use log_nexus::dashboard::DashboardAggregator;
use log_nexus::heartbeat::HeartbeatSweeper;
use log_nexus::ingestion::CreateLogRequest;
use log_nexus::realtime::FanOut;
use log_nexus::retention::RetentionRunner;
use log_nexus::store::Store;
use log_nexus::IngestionPipeline;

fn request_at(ts: chrono::DateTime<Utc>, level: u8) -> CreateLogRequest {
    CreateLogRequest {
        timestamp: Some(ts),
        level,
        message: "m".into(),
        job_id: None,
        job_execution_id: None,
        server_name: "S".into(),
        category: None,
        source_context: None,
        correlation_id: None,
        trace_id: None,
        span_id: None,
        parent_span_id: None,
        exception: None,
        properties: None,
        tags: vec![],
        environment: None,
        application_version: None,
    }
}

async fn seed(store: &Arc<Store>, clock: &Arc<VirtualClock>, config: ConfigHandle, now: chrono::DateTime<Utc>) {
    let pipeline = IngestionPipeline::new(store.clone(), clock.clone(), config, Arc::new(FanOut::default()));
    for _ in 0..5 {
        pipeline
        .ingest_single(request_at(now - chrono::Duration::days(10), 0), None)
        .await
        .unwrap();
    }
    for _ in 0..3 {
        pipeline
        .ingest_single(request_at(now - chrono::Duration::days(100), 2), None)
        .await
        .unwrap();
    }
    pipeline.flush_once().await;
}

#[tokio::test]
async fn dry_run_counts_matching_rows_without_deleting_them() {
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let clock = VirtualClock::new(now);
    let store = Store::new(clock.clone());
    seed(&store, &clock, ConfigHandle::new(AppConfig::default()), now).await;
    assert_eq!(store.log_count().await, 8);

    let config = ConfigHandle::new(AppConfig::default());
    let fan_out = Arc::new(FanOut::default());
    let dashboard = DashboardAggregator::new(store.clone(), config.clone(), fan_out.clone());
    let heartbeat = HeartbeatSweeper::new(store.clone(), fan_out.clone());
    let runner = RetentionRunner::new(store.clone(), dashboard, heartbeat);

    let report = runner.run(&config, true, None).await;
    assert_eq!(report.log_counts.trace_debug, 5);
    assert_eq!(report.log_counts.information, 3);
    assert!(report.dry_run);
    assert_eq!(store.log_count().await, 8, "dry-run must not delete rows");
}

#[tokio::test]
async fn non_dry_run_actually_deletes_matching_rows() {
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let clock = VirtualClock::new(now);
    let store = Store::new(clock.clone());
    seed(&store, &clock, ConfigHandle::new(AppConfig::default()), now).await;

    let config = ConfigHandle::new(AppConfig::default());
    let fan_out = Arc::new(FanOut::default());
    let dashboard = DashboardAggregator::new(store.clone(), config.clone(), fan_out.clone());
    let heartbeat = HeartbeatSweeper::new(store.clone(), fan_out.clone());
    let runner = RetentionRunner::new(store.clone(), dashboard, heartbeat);

    let report = runner.run(&config, false, None).await;
    assert_eq!(report.log_counts.trace_debug, 5);
    assert_eq!(report.log_counts.information, 3);
    assert_eq!(store.log_count().await, 0, "both the >7d trace rows and >90d info rows are due");
}
