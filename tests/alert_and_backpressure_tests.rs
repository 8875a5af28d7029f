//! scenarios 5 and 6: alert throttling and ingestion backpressure.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use log_nexus::alerting::AlertEngine;
use log_nexus::clock::VirtualClock;
use log_nexus::config::{AppConfig, ConfigHandle};
use log_nexus::error::StoreError;
use log_nexus::ingestion::CreateLogRequest;
use log_nexus::model::{AlertCondition, AlertSeverity, ExecutionStatus};
use log_nexus::notify::LoggingNotificationDispatcher;
use log_nexus::realtime::FanOut;
use log_nexus::store::{CompleteExecutionRequest, CreateAlertFields, StartExecutionRequest, Store};
use log_nexus::IngestionPipeline;

#[tokio::test]
async fn two_failures_within_the_throttle_window_only_fire_one_alert_instance() {
    let clock = VirtualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    let store = Store::new(clock.clone());

    for _ in 0..2 {
        let started = store
        .start_execution(StartExecutionRequest {
            job_id: "J1".into(),
            server_name: "S1".into(),
            trigger_type: "Manual".into(),
            triggered_by: None,
            correlation_id: None,
            parameters: None,
        })
        .await
        .unwrap();
        store
        .complete_execution(CompleteExecutionRequest {
            execution_id: started.execution_id,
            status: ExecutionStatus::Failed,
            result_summary: None,
            result_code: None,
            error_message: Some("boom".into()),
            error_category: None,
        })
        .await
        .unwrap();
        clock.advance(chrono::Duration::seconds(10));
    }

    store
    .create_alert(CreateAlertFields {
        name: "job failure".into(),
        description: None,
        condition: AlertCondition::JobFailure {
            consecutive: None,
            window_minutes: None,
        },
        severity: AlertSeverity::High,
        is_active: true,
        throttle_minutes: 15,
        notification_channels: None,
        job_id: Some("J1".into()),
        server_name: None,
    })
    .await;

    let engine = AlertEngine::new(
        store.clone(),
        Arc::new(FanOut::default()),
        Arc::new(LoggingNotificationDispatcher),
    );

    // Evaluate twice, well within the 15-minute throttle window.
    engine.evaluate_once().await;
    clock.advance(chrono::Duration::seconds(30));
    engine.evaluate_once().await;

    let instances = store.list_alert_instances(None).await;
    assert_eq!(instances.len(), 1);
    let alert = store.get_alert(1).await.unwrap();
    assert_eq!(alert.trigger_count, 1);
}

#[tokio::test]
async fn a_full_buffer_returns_overloaded_without_losing_any_accepted_entry() {
    let clock = VirtualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    let store = Store::new(clock.clone());
    let mut config = AppConfig::default();
    config.ingestion.max_queue_size = 10;
    config.ingestion.enqueue_deadline = Duration::from_millis(50);
    let config = ConfigHandle::new(config);
    // No flush worker is spawned, so the buffer never drains: this models
    // scenario 6's "flush paused" setup.
    let pipeline = IngestionPipeline::new(store.clone(), clock.clone(), config, Arc::new(FanOut::default()));

    let make_request = || CreateLogRequest {
        timestamp: None,
        level: 2,
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
    };

    let mut handles = Vec::new();
    for _ in 0..11 {
        let pipeline = pipeline.clone();
        let req = make_request();
        handles.push(tokio::spawn(async move { pipeline.ingest_single(req, None).await }));
    }

    let mut accepted = 0;
    let mut overloaded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(StoreError::Overloaded) => overloaded += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(accepted, 10, "exactly the buffer's capacity should be accepted");
    assert_eq!(overloaded, 1, "the eleventh concurrent request has nowhere to go");
    assert_eq!(pipeline.queued_len(), 10, "every accepted entry is still queued, none lost");
}
