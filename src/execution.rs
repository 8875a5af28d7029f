//! Execution-timeout sweep : a periodic worker over
//! `Store::executions_exceeding_max_duration`.

use std::sync::Arc;

use crate::config::ConfigHandle;
use crate::realtime::{topics, FanOut};
use crate::store::{CompleteExecutionRequest, Store};
use crate::task::SupervisedTask;
use crate::model::ExecutionStatus;

pub struct ExecutionTimeoutSweeper {
    store: Arc<Store>,
    fan_out: Arc<FanOut>,
}

impl ExecutionTimeoutSweeper {
    pub fn new(store: Arc<Store>, fan_out: Arc<FanOut>) -> Arc<Self> {
        Arc::new(Self { store, fan_out })
    }

    pub async fn sweep_once(&self) {
        for (execution_id, job) in self.store.executions_exceeding_max_duration().await {
            let result = self
            .store
            .complete_execution(CompleteExecutionRequest {
                execution_id,
                status: ExecutionStatus::Timeout,
                result_summary: None,
                result_code: None,
                error_message: Some("Exceeded maximum duration".to_string()),
                error_category: Some("Timeout".to_string()),
            })
            .await;
            match result {
                Ok(execution) => {
                    tracing::info!(
                        execution_id,
                        job_id = %job.job_id,
                        "execution exceeded max duration, marked Timeout"
                    );
                    let payload = serde_json::to_value(&execution).unwrap_or(serde_json::Value::Null);
                    self.fan_out.publish(topics::EXECUTIONS_RUNNING, payload);
                }
                Err(err) => {
                    tracing::warn!(execution_id, error = %err, "timeout sweep failed to complete execution");
                }
            }
        }
    }

    pub fn spawn(self: &Arc<Self>, config: &ConfigHandle) -> SupervisedTask {
        let sweeper = Arc::clone(self);
        let interval = config.current().execution.timeout_check_interval;
        SupervisedTask::spawn("execution-timeout-sweeper", interval, move || {
                let sweeper = Arc::clone(&sweeper);
                async move { sweeper.sweep_once().await }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VirtualClock;
    use crate::store::{StartExecutionRequest, UpsertJobFields};
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn sweep_times_out_executions_past_max_duration() {
        let clock = VirtualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        let store = Store::new(clock.clone());
        store
        .upsert_job(
            "J1",
            UpsertJobFields {
                max_duration_ms: Some(1000),
                ..Default::default()
            },
            None,
        )
        .await;
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

        clock.advance(chrono::Duration::seconds(5));

        let sweeper = ExecutionTimeoutSweeper::new(store.clone(), Arc::new(FanOut::default()));
        sweeper.sweep_once().await;

        let execution = store.get_execution(started.execution_id).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Timeout);
    }
}
