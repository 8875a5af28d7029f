//! scenario 2: start then complete an execution, assert the Job
//! rollup.

use chrono::{TimeZone, Utc};
use log_nexus::clock::VirtualClock;
use log_nexus::model::ExecutionStatus;
use log_nexus::store::{CompleteExecutionRequest, StartExecutionRequest, Store, UpsertJobFields};

#[tokio::test]
async fn start_then_complete_rolls_up_onto_the_job() {
    let clock = VirtualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    let store = Store::new(clock.clone());

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

    let job = store.get_job("J1").await.unwrap();
    assert_eq!(job.total_executions, 1);
    assert_eq!(job.last_status, Some(ExecutionStatus::Running));

    clock.advance(chrono::Duration::seconds(5));

    store
    .complete_execution(CompleteExecutionRequest {
        execution_id: started.execution_id,
        status: ExecutionStatus::Completed,
        result_summary: None,
        result_code: Some(0),
        error_message: None,
        error_category: None,
    })
    .await
    .unwrap();

    let job = store.get_job("J1").await.unwrap();
    assert_eq!(job.success_count, 1);
    assert_eq!(job.failure_count, 0);
    assert_eq!(job.last_duration_ms, Some(5000));
    assert!(job.invariant_holds());
}

#[tokio::test]
async fn completing_a_terminal_execution_is_an_illegal_transition() {
    let clock = VirtualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    let store = Store::new(clock.clone());
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
        status: ExecutionStatus::Completed,
        result_summary: None,
        result_code: None,
        error_message: None,
        error_category: None,
    })
    .await
    .unwrap();

    let err = store
    .complete_execution(CompleteExecutionRequest {
        execution_id: started.execution_id,
        status: ExecutionStatus::Failed,
        result_summary: None,
        result_code: None,
        error_message: None,
        error_category: None,
    })
    .await
    .unwrap_err();

    assert!(matches!(err, log_nexus::error::StoreError::IllegalTransition(_)));
}

#[tokio::test]
async fn overlap_is_rejected_only_when_allow_concurrent_is_false() {
    let clock = VirtualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    let store = Store::new(clock.clone());
    store
    .upsert_job(
        "J1",
        UpsertJobFields {
            allow_concurrent: Some(false),
            ..Default::default()
        },
        None,
    )
    .await;

    store
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

    let err = store
    .start_execution(StartExecutionRequest {
        job_id: "J1".into(),
        server_name: "S1".into(),
        trigger_type: "Manual".into(),
        triggered_by: None,
        correlation_id: None,
        parameters: None,
    })
    .await
    .unwrap_err();
    assert!(matches!(err, log_nexus::error::StoreError::Conflict(_)));
}

#[tokio::test]
async fn cancelled_executions_are_excluded_from_the_average_duration_denominator() {
    let clock = VirtualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    let store = Store::new(clock.clone());

    let first = store
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
    clock.advance(chrono::Duration::seconds(10));
    store.complete_execution(CompleteExecutionRequest {
        execution_id: first.execution_id,
        status: ExecutionStatus::Completed,
        result_summary: None,
        result_code: None,
        error_message: None,
        error_category: None,
    }).await.unwrap();

    let second = store
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
    clock.advance(chrono::Duration::seconds(100));
    store.cancel_execution(second.execution_id, Some("operator abort".into())).await.unwrap();

    let job = store.get_job("J1").await.unwrap();
    assert_eq!(job.completed_executions, 1);
    assert_eq!(job.avg_duration_ms, 10_000);
    assert_eq!(job.total_executions, 2);
}
