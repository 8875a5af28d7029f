//! scenario 1: ingest a batch, then search it back out.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use log_nexus::clock::VirtualClock;
use log_nexus::config::{AppConfig, ConfigHandle};
use log_nexus::ingestion::CreateLogRequest;
use log_nexus::realtime::FanOut;
use log_nexus::store::{LogSearchFilter, Store};
use log_nexus::IngestionPipeline;

fn request(level: u8, message: &str, exception_type: Option<&str>) -> CreateLogRequest {
    CreateLogRequest {
        timestamp: None,
        level,
        message: message.to_string(),
        job_id: None,
        job_execution_id: None,
        server_name: "S".into(),
        category: None,
        source_context: None,
        correlation_id: None,
        trace_id: None,
        span_id: None,
        parent_span_id: None,
        exception: exception_type.map(|t| log_nexus::model::ExceptionInfo {
                exception_type: t.to_string(),
                message: "boom".into(),
                stack_trace: None,
                source: None,
        }),
        properties: None,
        tags: vec![],
        environment: None,
        application_version: None,
    }
}

#[tokio::test]
async fn ingest_batch_then_search_returns_matching_entries() {
    let t = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    let clock = VirtualClock::new(t);
    let store = Store::new(clock.clone());
    let config = ConfigHandle::new(AppConfig::default());
    let pipeline = IngestionPipeline::new(store.clone(), clock.clone(), config, Arc::new(FanOut::default()));

    let batch = vec![
        request(2, "A", None),
        request(4, "B", Some("E")),
        request(3, "C", None),
    ];
    let result = pipeline.ingest_batch(batch, None).await;
    assert_eq!(result.accepted_count, 3);
    assert_eq!(result.rejected_count, 0);

    pipeline.flush_once().await;
    assert_eq!(store.log_count().await, 3);

    let filter = LogSearchFilter {
        min_level: Some(log_nexus::model::LogLevel::Warning),
        server_name: Some("S".into()),
        start: Some(t - chrono::Duration::seconds(1)),
        end: Some(t + chrono::Duration::seconds(1)),
        ..Default::default()
    };
    let page = store.search_logs(&filter).await;
    assert_eq!(page.total_count, 2);
    let messages: Vec<&str> = page.items.iter().map(|e| e.message.as_str()).collect();
    assert!(messages.contains(&"B"));
    assert!(messages.contains(&"C"));
}

#[tokio::test]
async fn single_ingest_stamps_received_at_and_assigns_an_id() {
    let clock = VirtualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    let store = Store::new(clock.clone());
    let config = ConfigHandle::new(AppConfig::default());
    let pipeline = IngestionPipeline::new(store.clone(), clock.clone(), config, Arc::new(FanOut::default()));

    let result = pipeline.ingest_single(request(2, "hello", None), Some("10.0.0.1".into())).await.unwrap();
    assert!(result.id > 0);
    assert_eq!(result.received_at, clock.now_utc());

    pipeline.flush_once().await;
    let stored = store.get_log(result.id).await.expect("log committed");
    assert_eq!(stored.client_ip.as_deref(), Some("10.0.0.1"));
}

#[tokio::test]
async fn ingest_autovivifies_unknown_job_and_server() {
    let clock = VirtualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    let store = Store::new(clock.clone());
    let config = ConfigHandle::new(AppConfig::default());
    let pipeline = IngestionPipeline::new(store.clone(), clock.clone(), config, Arc::new(FanOut::default()));

    let mut req = request(2, "hello", None);
    req.job_id = Some("UNKNOWN-JOB".into());
    req.server_name = "UNKNOWN-SERVER".into();
    pipeline.ingest_single(req, None).await.unwrap();
    pipeline.flush_once().await;

    let job = store.get_job("UNKNOWN-JOB").await.expect("autovivified");
    assert_eq!(job.display_name, "UNKNOWN-JOB");
    let server = store.get_server("UNKNOWN-SERVER").await.expect("autovivified");
    assert_eq!(server.status, log_nexus::model::ServerStatus::Online);
}
